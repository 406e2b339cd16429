use proptest::prelude::*;

use cpucaps_core::{*, query::*};

const OSXSAVE: u32 = 1 << 27;

/// Register contents of every leaf the capability decoding reads.
#[derive(Clone, Copy, Debug)]
struct Registers {
    max_leaf:          u32,
    leaf1_ecx:         u32,
    leaf1_edx:         u32,
    leaf7_ebx:         u32,
    max_extended_leaf: u32,
    ext_ecx:           u32,
    ext_edx:           u32,
    xcr0:              u64,
}

impl Registers {
    fn to_query(self) -> MockQuery {
        MockQuery::new()
            .with_max_leaf(self.max_leaf)
            .with_leaf(LEAF_FEATURES, CpuidResult::new(0, 0, self.leaf1_ecx, self.leaf1_edx))
            .with_leaf(LEAF_EXTENDED_FEATURES, CpuidResult::new(0, self.leaf7_ebx, 0, 0))
            .with_max_extended_leaf(self.max_extended_leaf)
            .with_leaf(LEAF_EXTENDED_FEATURES_AMD, CpuidResult::new(0, 0, self.ext_ecx, self.ext_edx))
            .with_xcr0(self.xcr0)
    }

    fn capabilities(self) -> CapabilitySet {
        let query = self.to_query();
        Prober::new(&query, MockPlatform::default()).query_capabilities()
    }
}

fn arb_registers() -> impl Strategy<Value = Registers> {
    (
        prop_oneof![Just(0u32), Just(1), Just(6), Just(7), Just(0x20)],
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        prop_oneof![Just(0u32), Just(0x8000_0000), Just(0x8000_0001), Just(0x8000_0008)],
        any::<u32>(),
        any::<u32>(),
        any::<u64>(),
    ).prop_map(|(max_leaf, leaf1_ecx, leaf1_edx, leaf7_ebx, max_extended_leaf, ext_ecx, ext_edx, xcr0)| Registers {
        max_leaf, leaf1_ecx, leaf1_edx, leaf7_ebx, max_extended_leaf, ext_ecx, ext_edx, xcr0,
    })
}

proptest! {
    /// The count is at least 1 for any mask, and the number of set bits otherwise.
    #[test]
    fn logical_count_never_zero(process in any::<u64>(), system in any::<u64>()) {
        let query = MockQuery::new();
        let prober = Prober::new(&query, MockPlatform::new(process, system));

        let system_count = prober.query_logical_processor_count(CountScope::System);
        let shared_count = prober.query_logical_processor_count(CountScope::Shared);
        prop_assert!(system_count >= 1);
        prop_assert!(shared_count >= 1);
        prop_assert_eq!(system_count, system.count_ones().max(1));
        prop_assert!(shared_count <= system_count);
    }

    /// Nothing needing the AVX state is reported when the OS doesn't save it.
    #[test]
    fn no_avx_without_os_support(regs in arb_registers(), disable_osxsave in any::<bool>()) {
        let mut regs = regs;
        if disable_osxsave {
            regs.leaf1_ecx &= !OSXSAVE;
        } else {
            regs.leaf1_ecx |= OSXSAVE;
            regs.xcr0 &= !0x4;
        }

        let caps = regs.capabilities();
        prop_assert!(!caps.iter().any(Capability::requires_avx_state), "{}", caps);
    }

    /// AVX-512 is only reported when the OS saves the opmask and ZMM state.
    #[test]
    fn no_avx512_without_os_support(regs in arb_registers(), cleared in 5u32..8) {
        let mut regs = regs;
        regs.xcr0 &= !(1 << cleared);

        let caps = regs.capabilities();
        prop_assert!(!caps.iter().any(Capability::requires_avx512_state), "{}", caps);
    }

    /// Decoding the same registers twice gives the same capabilities and masks.
    #[test]
    fn mask_is_idempotent(regs in arb_registers()) {
        let query = regs.to_query();
        let prober = Prober::new(&query, MockPlatform::default());

        prop_assert_eq!(prober.query_capabilities(), prober.query_capabilities());
        for layout in [MaskLayout::Compact, MaskLayout::Wide, MaskLayout::Packed] {
            let mask = prober.query_capability_mask(layout);
            prop_assert_eq!(mask, prober.query_capability_mask(layout));
            prop_assert!(layout.bits() == 64 || mask >> layout.bits() == 0);
        }
    }

    /// Setting more register bits never removes a capability.
    #[test]
    fn decoding_is_monotonic(regs in arb_registers(), extra in any::<(u32, u32, u32, u32, u32, u64)>()) {
        let mut more = regs;
        more.leaf1_ecx |= extra.0;
        more.leaf1_edx |= extra.1;
        more.leaf7_ebx |= extra.2;
        more.ext_ecx |= extra.3;
        more.ext_edx |= extra.4;
        more.xcr0 |= extra.5;

        prop_assert!(more.capabilities().contains_all(regs.capabilities()));
    }

    /// The one-flag-per-capability layouts lose nothing.
    #[test]
    fn wide_and_packed_are_lossless(regs in arb_registers()) {
        let caps = regs.capabilities();
        for layout in [MaskLayout::Wide, MaskLayout::Packed] {
            prop_assert_eq!(layout.decode(layout.encode(&caps)), caps);
        }
    }
}
