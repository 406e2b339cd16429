//! Instruction set extensions and sets of them

use core::fmt;

use cpucaps_base::{EnumCountT, EnumFromIndexT};
use cpucaps_macros::{EnumCount, EnumDisplay, EnumFromIndex, EnumFromName};
use static_assertions::const_assert;

/// Instruction set extension that can be detected.
/// 
/// Variants are declared in the order the bits are laid out by the processor:
/// `cpuid(eax=1).edx`, `cpuid(eax=1).ecx`, `cpuid(eax=7,ecx=0).ebx`, `cpuid(eax=80000001h).ecx`, and `cpuid(eax=80000001h).edx`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumCount, EnumFromIndex, EnumDisplay, EnumFromName)]
pub enum Capability {
    // cpuid(eax=1).edx
    /// MMX instructions (64-bit SIMD).
    #[display("MMX")]
    #[parse_name("mmx")]
    Mmx,
    /// Streaming SIMD Extensions (128-bit SIMD).
    #[display("SSE")]
    #[parse_name("sse")]
    Sse,
    /// SSE2 instructions.
    #[display("SSE2")]
    #[parse_name("sse2")]
    Sse2,

    // cpuid(eax=1).ecx
    /// SSE3 (Prescott new instructions - PNI).
    #[display("SSE3")]
    #[parse_name("sse3")]
    Sse3,
    /// Supplemental SSE3 instructions.
    #[display("SSSE3")]
    #[parse_name("ssse3")]
    Ssse3,
    /// Fused Multiply-Add, 3 operand form.
    #[display("FMA3")]
    #[parse_name("fma3")]
    Fma3,
    /// SSE 4.1 instructions.
    #[display("SSE4.1")]
    #[parse_name("sse4.1")]
    Sse41,
    /// SSE 4.2 instructions.
    #[display("SSE4.2")]
    #[parse_name("sse4.2")]
    Sse42,
    /// `POPCNT` instruction.
    #[display("POPCNT")]
    #[parse_name("popcnt")]
    Popcnt,
    /// AES instruction set.
    #[display("AES")]
    #[parse_name("aes")]
    Aes,
    /// Advanced Vector Extensions (256-bit SIMD).
    #[display("AVX")]
    #[parse_name("avx")]
    Avx,
    /// `RDRAND` (on-chip random number generator).
    #[display("RDRAND")]
    #[parse_name("rdrand")]
    Rdrand,

    // cpuid(eax=7,ecx=0).ebx
    /// Bit Manipulation Instruction Set 1.
    #[display("BMI1")]
    #[parse_name("bmi1")]
    Bmi1,
    /// Advanced Vector Extensions 2.
    #[display("AVX2")]
    #[parse_name("avx2")]
    Avx2,
    /// Bit Manipulation Instruction Set 2.
    #[display("BMI2")]
    #[parse_name("bmi2")]
    Bmi2,
    /// AVX-512 Foundation.
    #[display("AVX512-F")]
    #[parse_name("avx512f")]
    Avx512F,
    /// AVX-512 Doubleword and Quadword instructions.
    #[display("AVX512-DQ")]
    #[parse_name("avx512dq")]
    Avx512Dq,
    /// `RDSEED` instruction.
    #[display("RDSEED")]
    #[parse_name("rdseed")]
    Rdseed,
    /// AVX-512 Integer Fused Multiply-Add instructions.
    #[display("AVX512-IFMA")]
    #[parse_name("avx512ifma")]
    Avx512Ifma,
    /// AVX-512 Prefetch instructions.
    #[display("AVX512-PF")]
    #[parse_name("avx512pf")]
    Avx512Pf,
    /// AVX-512 Exponential and Reciprocal instructions.
    #[display("AVX512-ER")]
    #[parse_name("avx512er")]
    Avx512Er,
    /// AVX-512 Conflict Detection instructions.
    #[display("AVX512-CD")]
    #[parse_name("avx512cd")]
    Avx512Cd,
    /// SHA-1 and SHA-256 extensions.
    #[display("SHA")]
    #[parse_name("sha")]
    Sha,
    /// AVX-512 Byte and Word instructions.
    #[display("AVX512-BW")]
    #[parse_name("avx512bw")]
    Avx512Bw,
    /// AVX-512 Vector Length extensions.
    #[display("AVX512-VL")]
    #[parse_name("avx512vl")]
    Avx512Vl,

    // cpuid(eax=80000001h).ecx
    /// `LZCNT` (advanced bit manipulation).
    #[display("LZCNT")]
    #[parse_name("lzcnt")]
    Lzcnt,
    /// SSE4a.
    #[display("SSE4a")]
    #[parse_name("sse4a")]
    Sse4a,
    /// eXtended Operations.
    #[display("XOP")]
    #[parse_name("xop")]
    Xop,
    /// Fused Multiply-Add, 4 operand form.
    #[display("FMA4")]
    #[parse_name("fma4")]
    Fma4,

    // cpuid(eax=80000001h).edx
    /// AMD extensions to MMX.
    #[display("MMXEXT")]
    #[parse_name("mmxext")]
    MmxExt,
    /// Extended 3DNow!
    #[display("3DNow!Ext")]
    #[parse_name("3dnowext")]
    _3DNowExt,
    /// 3DNow!
    #[display("3DNow!")]
    #[parse_name("3dnow")]
    _3DNow,
}

const_assert!(<Capability as EnumCountT>::COUNT <= 64);

impl Capability {
    /// Iterate over all capabilities, in declaration order.
    pub fn all() -> impl Iterator<Item = Capability> {
        (0..Self::COUNT).filter_map(Capability::from_idx)
    }

    /// Whether the operating system needs to save the AVX register state for this capability to be usable.
    pub fn requires_avx_state(self) -> bool {
        matches!(self,
            Capability::Avx | Capability::Avx2 | Capability::Fma3 | Capability::Xop | Capability::Fma4 |
            Capability::Avx512F | Capability::Avx512Dq | Capability::Avx512Ifma | Capability::Avx512Pf |
            Capability::Avx512Er | Capability::Avx512Cd | Capability::Avx512Bw | Capability::Avx512Vl
        )
    }

    /// Whether the operating system needs to save the opmask and ZMM register state for this capability to be usable.
    pub fn requires_avx512_state(self) -> bool {
        matches!(self,
            Capability::Avx512F | Capability::Avx512Dq | Capability::Avx512Ifma | Capability::Avx512Pf |
            Capability::Avx512Er | Capability::Avx512Cd | Capability::Avx512Bw | Capability::Avx512Vl
        )
    }

    const fn bit(self) -> u64 {
        1 << self as u64
    }
}

/// Set of capabilities.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct CapabilitySet(u64);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create a set from a list of capabilities.
    pub const fn from_slice(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    pub const fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Check if all capabilities in `other` are also in `self`.
    pub const fn contains_all(&self, other: CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if any capability in `other` is also in `self`.
    pub const fn intersects(&self, other: CapabilitySet) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: CapabilitySet) -> CapabilitySet {
        Self(self.0 | other.0)
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over the capabilities in the set, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::all().filter(|cap| self.contains(*cap))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl Extend<Capability> for CapabilitySet {
    fn extend<I: IntoIterator<Item = Capability>>(&mut self, iter: I) {
        for cap in iter {
            self.insert(cap);
        }
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, cap) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{cap}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use cpucaps_base::{EnumCountT, EnumFromNameT};

    use super::*;

    #[test]
    fn names_round_trip() {
        assert_eq!(Capability::COUNT, 32);
        for cap in Capability::all() {
            assert_eq!(Capability::parse(cap.parse_name()), Some(cap));
        }
        assert_eq!(Capability::parse("avx512bw"), Some(Capability::Avx512Bw));
        assert_eq!(Capability::parse("AVX"), None);
        assert_eq!(Capability::_3DNow.to_string(), "3DNow!");
        assert_eq!(Capability::Sse41.to_string(), "SSE4.1");
    }

    #[test]
    fn set_operations() {
        let mut set = CapabilitySet::empty();
        assert!(set.is_empty());

        set.insert(Capability::Avx2);
        set.insert(Capability::Mmx);
        set.insert(Capability::Mmx);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Capability::Avx2));
        assert!(!set.contains(Capability::Avx));

        let pair = CapabilitySet::from_slice(&[Capability::Mmx, Capability::Avx2]);
        assert_eq!(set, pair);
        assert!(set.contains_all(CapabilitySet::from_slice(&[Capability::Mmx])));
        assert!(!set.contains_all(CapabilitySet::from_slice(&[Capability::Mmx, Capability::Sse])));
        assert!(set.intersects(CapabilitySet::from_slice(&[Capability::Sse, Capability::Mmx])));

        let union = set.union(CapabilitySet::from_slice(&[Capability::Sse]));
        assert_eq!(union.iter().collect::<Vec<_>>(), [Capability::Mmx, Capability::Sse, Capability::Avx2]);
        assert_eq!(union.to_string(), "MMX SSE AVX2");
    }

    #[test]
    fn avx512_implies_avx_state() {
        for cap in Capability::all().filter(|cap| cap.requires_avx512_state()) {
            assert!(cap.requires_avx_state(), "{cap}");
        }
        assert!(!Capability::Bmi1.requires_avx_state());
        assert!(!Capability::Sse42.requires_avx_state());
    }
}
