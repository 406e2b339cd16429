//! Access to the `cpuid` and `xgetbv` instructions
//! 
//! https://en.wikipedia.org/wiki/CPUID

use core::fmt;

/// Registers returned by a single `cpuid` leaf.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl CpuidResult {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }
}

impl fmt::Display for CpuidResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eax={:08X} ebx={:08X} ecx={:08X} edx={:08X}", self.eax, self.ebx, self.ecx, self.edx)
    }
}

/// Highest standard leaf and vendor ID.
pub const LEAF_VENDOR: u32 = 0;
/// Version information and feature flags.
pub const LEAF_FEATURES: u32 = 1;
/// Structured extended feature flags.
pub const LEAF_EXTENDED_FEATURES: u32 = 7;
/// Highest extended leaf.
pub const LEAF_EXTENDED_MAX: u32 = 0x8000_0000;
/// Extended processor info and feature flags.
pub const LEAF_EXTENDED_FEATURES_AMD: u32 = 0x8000_0001;
/// First of the three processor brand string leaves.
pub const LEAF_BRAND_STRING_FIRST: u32 = 0x8000_0002;
/// Last of the three processor brand string leaves.
pub const LEAF_BRAND_STRING_LAST: u32 = 0x8000_0004;

/// Source of processor query results.
/// 
/// The prober only talks to the processor through this trait, so the decoding can run against synthetic register values.
pub trait InstructionQuery {
    /// Query a leaf, using sub-leaf 0.
    fn cpuid(&self, leaf: u32) -> CpuidResult {
        self.cpuid_count(leaf, 0)
    }

    /// Query a sub-leaf of a leaf.
    fn cpuid_count(&self, leaf: u32, sub_leaf: u32) -> CpuidResult;

    /// Read an extended control register.
    /// 
    /// # Note
    /// 
    /// The instruction only exists when `OSXSAVE` is reported by `cpuid(eax=1).ecx`, callers need to check this first.
    fn xgetbv(&self, xcr: u32) -> u64;
}

impl<T: InstructionQuery + ?Sized> InstructionQuery for &T {
    fn cpuid(&self, leaf: u32) -> CpuidResult {
        (**self).cpuid(leaf)
    }

    fn cpuid_count(&self, leaf: u32, sub_leaf: u32) -> CpuidResult {
        (**self).cpuid_count(leaf, sub_leaf)
    }

    fn xgetbv(&self, xcr: u32) -> u64 {
        (**self).xgetbv(xcr)
    }
}

/// Queries the processor the code is running on.
/// 
/// On non-x86 targets every leaf reads as zero, which every query treats as "not available".
#[derive(Clone, Copy, Default, Debug)]
pub struct NativeQuery;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        use core::arch::x86_64 as arch;
    } else if #[cfg(target_arch = "x86")] {
        use core::arch::x86 as arch;
    }
}

impl InstructionQuery for NativeQuery {
    #[allow(unused_unsafe)]
    fn cpuid_count(&self, leaf: u32, sub_leaf: u32) -> CpuidResult {
        cfg_if::cfg_if! {
            if #[cfg(any(target_arch = "x86_64", target_arch = "x86"))] {
                // SAFETY: `cpuid` is available on every processor able to run this code
                let res = unsafe { arch::__cpuid_count(leaf, sub_leaf) };
                CpuidResult::new(res.eax, res.ebx, res.ecx, res.edx)
            } else {
                let _ = (leaf, sub_leaf);
                CpuidResult::default()
            }
        }
    }

    fn xgetbv(&self, xcr: u32) -> u64 {
        cfg_if::cfg_if! {
            if #[cfg(any(target_arch = "x86_64", target_arch = "x86"))] {
                // SAFETY: Only reached after `OSXSAVE` was reported, which guarantees `xgetbv` exists
                unsafe { arch::_xgetbv(xcr) }
            } else {
                let _ = xcr;
                0
            }
        }
    }
}
