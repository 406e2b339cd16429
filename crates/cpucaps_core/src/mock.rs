//! Synthetic query and platform providers, for running the prober against known register values.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    platform::{AffinityMasks, PlatformProvider},
    query::*,
};

/// Instruction query provider answering from a fixed leaf table.
/// 
/// Leaves that are not in the table read as zero. Every query is recorded, so callers can check which leaves were issued.
#[derive(Default, Debug)]
pub struct MockQuery {
    leaves:   HashMap<(u32, u32), CpuidResult>,
    xcr0:     u64,
    queried:  Mutex<HashMap<u32, usize>>,
    xgetbv_count: Mutex<usize>,
}

impl MockQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result of sub-leaf 0 of `leaf`.
    pub fn with_leaf(self, leaf: u32, result: CpuidResult) -> Self {
        self.with_sub_leaf(leaf, 0, result)
    }

    pub fn with_sub_leaf(mut self, leaf: u32, sub_leaf: u32, result: CpuidResult) -> Self {
        self.leaves.insert((leaf, sub_leaf), result);
        self
    }

    /// Set the value returned when reading XCR0.
    pub fn with_xcr0(mut self, xcr0: u64) -> Self {
        self.xcr0 = xcr0;
        self
    }

    /// Set the highest standard leaf reported in `cpuid(eax=0).eax`.
    pub fn with_max_leaf(mut self, max_leaf: u32) -> Self {
        self.leaves.entry((LEAF_VENDOR, 0)).or_default().eax = max_leaf;
        self
    }

    /// Set the highest extended leaf reported in `cpuid(eax=0x80000000).eax`.
    pub fn with_max_extended_leaf(mut self, max_leaf: u32) -> Self {
        self.leaves.entry((LEAF_EXTENDED_MAX, 0)).or_default().eax = max_leaf;
        self
    }

    /// Set the vendor ID, split over `ebx`, `edx` and `ecx` the way the processor reports it.
    pub fn with_vendor(mut self, vendor_id: &[u8; 12]) -> Self {
        let word = |idx: usize| u32::from_le_bytes([vendor_id[idx], vendor_id[idx + 1], vendor_id[idx + 2], vendor_id[idx + 3]]);

        let entry = self.leaves.entry((LEAF_VENDOR, 0)).or_default();
        entry.ebx = word(0);
        entry.edx = word(4);
        entry.ecx = word(8);
        self
    }

    /// Set the brand string, padded with zeros up to 48 bytes, over the three brand string leaves.
    /// 
    /// This does not change the highest extended leaf.
    pub fn with_brand(mut self, brand: &str) -> Self {
        let mut bytes = [0u8; 48];
        let len = brand.len().min(bytes.len());
        bytes[..len].copy_from_slice(&brand.as_bytes()[..len]);

        let mut words = bytes.chunks_exact(4).map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        for leaf in LEAF_BRAND_STRING_FIRST..=LEAF_BRAND_STRING_LAST {
            let mut next = || words.next().unwrap_or_default();
            let result = CpuidResult::new(next(), next(), next(), next());
            self.leaves.insert((leaf, 0), result);
        }
        self
    }

    /// Number of times `leaf` was queried, over all sub-leaves.
    pub fn query_count(&self, leaf: u32) -> usize {
        self.queried.lock().get(&leaf).copied().unwrap_or_default()
    }

    /// Total number of leaf queries.
    pub fn total_query_count(&self) -> usize {
        self.queried.lock().values().sum()
    }

    /// Number of times an extended control register was read.
    pub fn xgetbv_count(&self) -> usize {
        *self.xgetbv_count.lock()
    }

    pub fn reset_counts(&self) {
        self.queried.lock().clear();
        *self.xgetbv_count.lock() = 0;
    }
}

impl InstructionQuery for MockQuery {
    fn cpuid_count(&self, leaf: u32, sub_leaf: u32) -> CpuidResult {
        *self.queried.lock().entry(leaf).or_default() += 1;
        self.leaves.get(&(leaf, sub_leaf)).copied().unwrap_or_default()
    }

    fn xgetbv(&self, xcr: u32) -> u64 {
        *self.xgetbv_count.lock() += 1;
        if xcr == 0 { self.xcr0 } else { 0 }
    }
}

/// Platform provider returning fixed values.
#[derive(Clone, Copy, Debug)]
pub struct MockPlatform {
    pub masks:    Result<AffinityMasks, i32>,
    pub is_wow64: Option<bool>,
}

impl MockPlatform {
    pub fn new(process: u64, system: u64) -> Self {
        Self { masks: Ok(AffinityMasks { process, system }), is_wow64: None }
    }

    /// Platform whose affinity mask query fails with `error`.
    pub fn failing(error: i32) -> Self {
        Self { masks: Err(error), is_wow64: None }
    }

    pub fn with_wow64(mut self, is_wow64: Option<bool>) -> Self {
        self.is_wow64 = is_wow64;
        self
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl PlatformProvider for MockPlatform {
    fn affinity_masks(&self) -> Result<AffinityMasks, i32> {
        self.masks
    }

    fn is_wow64_process(&self) -> Option<bool> {
        self.is_wow64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_leaves_are_zero() {
        let query = MockQuery::new().with_max_leaf(1);
        assert_eq!(query.cpuid(LEAF_VENDOR).eax, 1);
        assert_eq!(query.cpuid(LEAF_EXTENDED_FEATURES), CpuidResult::default());
        assert_eq!(query.cpuid_count(LEAF_VENDOR, 1), CpuidResult::default());
        assert_eq!(query.query_count(LEAF_VENDOR), 2);
        assert_eq!(query.query_count(LEAF_EXTENDED_FEATURES), 1);
        assert_eq!(query.total_query_count(), 3);

        query.reset_counts();
        assert_eq!(query.total_query_count(), 0);
    }

    #[test]
    fn vendor_register_order() {
        let query = MockQuery::new().with_vendor(b"GenuineIntel").with_max_leaf(0x16);
        let res = query.cpuid(LEAF_VENDOR);
        assert_eq!(res.eax, 0x16);
        assert_eq!(res.ebx, 0x756E_6547); // "Genu"
        assert_eq!(res.edx, 0x4965_6E69); // "ineI"
        assert_eq!(res.ecx, 0x6C65_746E); // "ntel"
    }

    #[test]
    fn brand_leaves() {
        let query = MockQuery::new().with_brand("AMD Ryzen");
        assert_eq!(query.cpuid(LEAF_BRAND_STRING_FIRST).eax, u32::from_le_bytes(*b"AMD "));
        assert_eq!(query.cpuid(LEAF_BRAND_STRING_FIRST).ecx, u32::from_le_bytes(*b"n\0\0\0"));
        assert_eq!(query.cpuid(LEAF_BRAND_STRING_LAST), CpuidResult::default());
    }

    #[test]
    fn xgetbv_only_knows_xcr0() {
        let query = MockQuery::new().with_xcr0(0xE7);
        assert_eq!(query.xgetbv(0), 0xE7);
        assert_eq!(query.xgetbv(1), 0);
        assert_eq!(query.xgetbv_count(), 2);
    }
}
