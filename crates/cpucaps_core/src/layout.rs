//! Numeric capability masks
//! 
//! Each library revision packed the detected capabilities into an integer with its own bit assignment.
//! Callers persist and compare these raw masks, so a row in a table below must never change meaning.
//! The same capability has a different value in each layout.

use cpucaps_macros::{EnumDisplay, EnumFromName};

use crate::capability::{Capability, CapabilitySet};

/// Single flag of a capability mask.
#[derive(Clone, Copy, Debug)]
pub struct LayoutRow {
    /// Name of the flag.
    pub name:     &'static str,
    /// Value of the flag in the mask.
    pub bit:      u64,
    /// Capabilities that all need to be present for the flag to be set.
    pub requires: CapabilitySet,
}

const fn row(name: &'static str, bit: u64, requires: &[Capability]) -> LayoutRow {
    LayoutRow { name, bit, requires: CapabilitySet::from_slice(requires) }
}

use Capability::*;

/// First revision: 16 flags in a 32-bit mask.
const COMPACT_ROWS: &[LayoutRow] = &[
    row("MMX",    0x0000_0001, &[Mmx]),
    row("SSE",    0x0000_0002, &[Sse]),
    row("SSE2",   0x0000_0004, &[Sse2]),
    row("LZCNT",  0x0000_0008, &[Lzcnt]),
    row("SSE3",   0x0000_0010, &[Sse3]),
    row("SSSE3",  0x0000_0020, &[Ssse3]),
    row("SSE4",   0x0000_0040, &[Sse41]),
    row("SSE42",  0x0000_0080, &[Sse42]),
    row("AVX",    0x0000_0100, &[Avx]),
    row("XOP",    0x0000_0200, &[Xop]),
    row("FMA4",   0x0000_0400, &[Fma4]),
    row("FMA3",   0x0000_0800, &[Fma3]),
    row("BMI1",   0x0000_1000, &[Bmi1]),
    row("BMI2",   0x0000_2000, &[Bmi2]),
    row("AVX2",   0x0000_4000, &[Avx2]),
    row("AVX512", 0x0000_8000, &[Avx512F, Avx512Dq, Avx512Cd, Avx512Bw, Avx512Vl]),
];

/// Second revision: one bit per capability in a 64-bit mask, in register layout order.
const WIDE_ROWS: &[LayoutRow] = &[
    row("MMX",         1 << 0,  &[Mmx]),
    row("SSE",         1 << 1,  &[Sse]),
    row("SSE2",        1 << 2,  &[Sse2]),
    row("SSE3",        1 << 3,  &[Sse3]),
    row("SSSE3",       1 << 4,  &[Ssse3]),
    row("FMA3",        1 << 5,  &[Fma3]),
    row("SSE41",       1 << 6,  &[Sse41]),
    row("SSE42",       1 << 7,  &[Sse42]),
    row("POPCNT",      1 << 8,  &[Popcnt]),
    row("AES",         1 << 9,  &[Aes]),
    row("AVX",         1 << 10, &[Avx]),
    row("RDRND",       1 << 11, &[Rdrand]),
    row("BMI1",        1 << 12, &[Bmi1]),
    row("AVX2",        1 << 13, &[Avx2]),
    row("BMI2",        1 << 14, &[Bmi2]),
    row("AVX512_F",    1 << 15, &[Avx512F]),
    row("AVX512_DQ",   1 << 16, &[Avx512Dq]),
    row("RDSEED",      1 << 17, &[Rdseed]),
    row("AVX512_IFMA", 1 << 18, &[Avx512Ifma]),
    row("AVX512_PF",   1 << 19, &[Avx512Pf]),
    row("AVX512_ER",   1 << 20, &[Avx512Er]),
    row("AVX512_CD",   1 << 21, &[Avx512Cd]),
    row("SHA",         1 << 22, &[Sha]),
    row("AVX512_BW",   1 << 23, &[Avx512Bw]),
    row("AVX512_VL",   1 << 24, &[Avx512Vl]),
    row("LZCNT",       1 << 25, &[Lzcnt]),
    row("SSE4a",       1 << 26, &[Sse4a]),
    row("XOP",         1 << 27, &[Xop]),
    row("FMA4",        1 << 28, &[Fma4]),
    row("MMXEXT",      1 << 29, &[MmxExt]),
    row("3DNOWEXT",    1 << 30, &[_3DNowExt]),
    row("3DNOW",       1 << 31, &[_3DNow]),
];

/// Current revision: 32 flags in a 32-bit mask, in alphabetical order.
const PACKED_ROWS: &[LayoutRow] = &[
    row("3DNOW",       0x0000_0001, &[_3DNow]),
    row("3DNOWEXT",    0x0000_0002, &[_3DNowExt]),
    row("AES",         0x0000_0004, &[Aes]),
    row("AVX",         0x0000_0008, &[Avx]),
    row("AVX2",        0x0000_0010, &[Avx2]),
    row("AVX512_BW",   0x0000_0020, &[Avx512Bw]),
    row("AVX512_CD",   0x0000_0040, &[Avx512Cd]),
    row("AVX512_DQ",   0x0000_0080, &[Avx512Dq]),
    row("AVX512_ER",   0x0000_0100, &[Avx512Er]),
    row("AVX512_F",    0x0000_0200, &[Avx512F]),
    row("AVX512_IFMA", 0x0000_0400, &[Avx512Ifma]),
    row("AVX512_PF",   0x0000_0800, &[Avx512Pf]),
    row("AVX512_VL",   0x0000_1000, &[Avx512Vl]),
    row("BMI1",        0x0000_2000, &[Bmi1]),
    row("BMI2",        0x0000_4000, &[Bmi2]),
    row("FMA3",        0x0000_8000, &[Fma3]),
    row("FMA4",        0x0001_0000, &[Fma4]),
    row("LZCNT",       0x0002_0000, &[Lzcnt]),
    row("MMX",         0x0004_0000, &[Mmx]),
    row("MMXEXT",      0x0008_0000, &[MmxExt]),
    row("POPCNT",      0x0010_0000, &[Popcnt]),
    row("RDRND",       0x0020_0000, &[Rdrand]),
    row("RDSEED",      0x0040_0000, &[Rdseed]),
    row("SHA",         0x0080_0000, &[Sha]),
    row("SSE",         0x0100_0000, &[Sse]),
    row("SSE2",        0x0200_0000, &[Sse2]),
    row("SSE3",        0x0400_0000, &[Sse3]),
    row("SSE41",       0x0800_0000, &[Sse41]),
    row("SSE42",       0x1000_0000, &[Sse42]),
    row("SSE4a",       0x2000_0000, &[Sse4a]),
    row("SSSE3",       0x4000_0000, &[Ssse3]),
    row("XOP",         0x8000_0000, &[Xop]),
];

/// Bit assignment of a capability mask.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, EnumDisplay, EnumFromName)]
pub enum MaskLayout {
    /// 16 flags in a 32-bit mask, AVX-512 reported as a single flag.
    #[display("compact (32-bit, 16 flags)")]
    #[parse_name("compact")]
    Compact,
    /// One flag per capability in a 64-bit mask.
    #[display("wide (64-bit)")]
    #[parse_name("wide")]
    Wide,
    /// 32 flags in a 32-bit mask.
    #[default]
    #[display("packed (32-bit, 32 flags)")]
    #[parse_name("packed")]
    Packed,
}

impl MaskLayout {
    /// Table of flags in this layout.
    pub const fn rows(self) -> &'static [LayoutRow] {
        match self {
            MaskLayout::Compact => COMPACT_ROWS,
            MaskLayout::Wide    => WIDE_ROWS,
            MaskLayout::Packed  => PACKED_ROWS,
        }
    }

    /// Width of the mask in bits.
    pub const fn bits(self) -> u32 {
        match self {
            MaskLayout::Compact | MaskLayout::Packed => 32,
            MaskLayout::Wide => 64,
        }
    }

    /// Find the row with the given flag name.
    pub fn find(self, name: &str) -> Option<&'static LayoutRow> {
        self.rows().iter().find(|row| row.name == name)
    }

    /// Pack a set of capabilities into a mask.
    pub fn encode(self, caps: &CapabilitySet) -> u64 {
        self.rows().iter()
            .filter(|row| caps.contains_all(row.requires))
            .fold(0, |mask, row| mask | row.bit)
    }

    /// Unpack a mask into the set of capabilities it implies.
    /// 
    /// Bits without a row are ignored. A flag that stands for multiple capabilities adds all of them.
    pub fn decode(self, mask: u64) -> CapabilitySet {
        self.rows().iter()
            .filter(|row| mask & row.bit != 0)
            .fold(CapabilitySet::empty(), |set, row| set.union(row.requires))
    }

    /// Get the names of the flags set in a mask, in table order.
    pub fn flag_names(self, mask: u64) -> impl Iterator<Item = &'static str> {
        self.rows().iter()
            .filter(move |row| mask & row.bit != 0)
            .map(|row| row.name)
    }
}

#[cfg(test)]
mod test {
    use cpucaps_base::EnumFromNameT;

    use super::*;

    const LAYOUTS: [MaskLayout; 3] = [MaskLayout::Compact, MaskLayout::Wide, MaskLayout::Packed];

    #[test]
    fn rows_are_distinct_single_bits() {
        for layout in LAYOUTS {
            let mut seen = 0u64;
            for row in layout.rows() {
                assert!(row.bit.is_power_of_two(), "{layout}: {}", row.name);
                assert!(row.bit.trailing_zeros() < layout.bits(), "{layout}: {}", row.name);
                assert_eq!(seen & row.bit, 0, "{layout}: {} reuses a bit", row.name);
                assert!(!row.requires.is_empty());
                seen |= row.bit;
            }
        }
    }

    #[test]
    fn wide_and_packed_cover_every_capability() {
        for layout in [MaskLayout::Wide, MaskLayout::Packed] {
            let all = Capability::all().collect::<CapabilitySet>();
            assert_eq!(layout.decode(layout.encode(&all)), all);
            assert_eq!(layout.rows().len(), 32);
        }
    }

    #[test]
    fn wide_follows_declaration_order() {
        for (idx, cap) in Capability::all().enumerate() {
            let row = &WIDE_ROWS[idx];
            assert_eq!(row.bit, 1 << idx);
            assert_eq!(row.requires, CapabilitySet::from_slice(&[cap]));
        }
    }

    #[test]
    fn same_capability_different_values() {
        let avx = CapabilitySet::from_slice(&[Avx]);
        assert_eq!(MaskLayout::Compact.encode(&avx), 0x100);
        assert_eq!(MaskLayout::Wide.encode(&avx), 0x400);
        assert_eq!(MaskLayout::Packed.encode(&avx), 0x8);
    }

    #[test]
    fn compact_avx512_needs_all_parts() {
        let partial = CapabilitySet::from_slice(&[Avx512F, Avx512Dq, Avx512Cd, Avx512Bw]);
        assert_eq!(MaskLayout::Compact.encode(&partial), 0);

        let full = partial.union(CapabilitySet::from_slice(&[Avx512Vl, Avx512Ifma]));
        assert_eq!(MaskLayout::Compact.encode(&full), 0x8000);
        assert_eq!(MaskLayout::Compact.decode(0x8000), CapabilitySet::from_slice(&[Avx512F, Avx512Dq, Avx512Cd, Avx512Bw, Avx512Vl]));
    }

    #[test]
    fn packed_values() {
        assert_eq!(MaskLayout::Packed.find("MMX").map(|row| row.bit), Some(0x0004_0000));
        assert_eq!(MaskLayout::Packed.find("XOP").map(|row| row.bit), Some(0x8000_0000));
        assert_eq!(MaskLayout::Compact.find("SSE4").map(|row| row.bit), Some(0x40));
        assert!(MaskLayout::Compact.find("SHA").is_none());

        let caps = CapabilitySet::from_slice(&[Mmx, Sse, Sse2]);
        let mask = MaskLayout::Packed.encode(&caps);
        assert_eq!(mask, 0x0304_0000);
        assert_eq!(MaskLayout::Packed.flag_names(mask).collect::<Vec<_>>(), ["MMX", "SSE", "SSE2"]);
    }

    #[test]
    fn parse_layout() {
        assert_eq!(MaskLayout::parse("wide"), Some(MaskLayout::Wide));
        assert_eq!(MaskLayout::parse("narrow"), None);
        assert_eq!(MaskLayout::default(), MaskLayout::Packed);
    }
}
