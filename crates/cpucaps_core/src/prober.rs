//! Capability prober
//!
//! Every query is issued fresh on each call, nothing is cached. All results only depend on the query and platform providers.

use cpucaps_logging::{LogCategory, log_debug, log_verbose, log_warning};

use crate::{
    capability::{Capability, CapabilitySet},
    identity::*,
    layout::MaskLayout,
    platform::{ArchitectureMode, CountScope, NativePlatform, PlatformProvider},
    query::*,
    utils::{is_flag_set, null_terminate_slice, write_empty_c_str},
};

const LOG_CAT: LogCategory = LogCategory::new("CPU caps");

/// `cpuid(eax=1).edx`: MMX, gates all further decoding.
const MMX_BIT: u32 = 1 << 23;
/// `cpuid(eax=1).ecx`: the OS uses `xsave`/`xrstor`, `xgetbv` is available.
const OSXSAVE_BIT: u32 = 1 << 27;
/// XCR0: SSE and AVX (YMM) state.
const XCR0_AVX_STATE: u64 = 0x06;
/// XCR0: opmask, ZMM_Hi256 and Hi16_ZMM state.
const XCR0_AVX512_STATE: u64 = 0xE0;

/// Condition that needs to hold, in addition to the feature bit being set, for a capability to be reported.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Requirement {
    None,
    /// The OS saves the SSE and AVX state.
    AvxState,
    /// The OS saves the SSE, AVX and AVX-512 state.
    Avx512State,
    /// Another capability was already decoded.
    Capability(Capability),
}

#[derive(Clone, Copy, Debug)]
struct FeatureBit {
    capability:  Capability,
    bit:         u32,
    requirement: Requirement,
}

const fn feature(capability: Capability, bit: u32, requirement: Requirement) -> FeatureBit {
    FeatureBit { capability, bit, requirement }
}

use Capability::*;
use Requirement::{AvxState, Avx512State};

const LEAF1_EDX_BITS: &[FeatureBit] = &[
    feature(Mmx,  23, Requirement::None),
    feature(Sse,  25, Requirement::None),
    feature(Sse2, 26, Requirement::None),
];

const LEAF1_ECX_BITS: &[FeatureBit] = &[
    feature(Sse3,   0,  Requirement::None),
    feature(Ssse3,  9,  Requirement::None),
    feature(Fma3,   12, AvxState),
    feature(Sse41,  19, Requirement::None),
    feature(Sse42,  20, Requirement::None),
    feature(Popcnt, 23, Requirement::None),
    feature(Aes,    25, Requirement::None),
    feature(Avx,    28, AvxState),
    feature(Rdrand, 30, Requirement::None),
];

const LEAF7_EBX_BITS: &[FeatureBit] = &[
    feature(Bmi1,       3,  Requirement::None),
    feature(Avx2,       5,  AvxState),
    feature(Bmi2,       8,  Requirement::None),
    feature(Avx512F,    16, Avx512State),
    feature(Avx512Dq,   17, Avx512State),
    feature(Rdseed,     18, Requirement::None),
    feature(Avx512Ifma, 21, Avx512State),
    feature(Avx512Pf,   26, Avx512State),
    feature(Avx512Er,   27, Avx512State),
    feature(Avx512Cd,   28, Avx512State),
    feature(Sha,        29, Requirement::None),
    feature(Avx512Bw,   30, Avx512State),
    feature(Avx512Vl,   31, Avx512State),
];

// XOP and FMA4 use the VEX encoded registers, so they are only trusted when AVX was already confirmed
const EXT_ECX_BITS: &[FeatureBit] = &[
    feature(Lzcnt, 5,  Requirement::None),
    feature(Sse4a, 6,  Requirement::None),
    feature(Xop,   11, Requirement::Capability(Avx)),
    feature(Fma4,  16, Requirement::Capability(Avx)),
];

const EXT_EDX_BITS: &[FeatureBit] = &[
    feature(MmxExt,    22, Requirement::None),
    feature(_3DNowExt, 30, Requirement::None),
    feature(_3DNow,    31, Requirement::None),
];

/// Register state the OS saves on a context switch.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
struct XsaveState {
    avx:    bool,
    avx512: bool,
}

impl XsaveState {
    fn from_xcr0(xcr0: u64) -> Self {
        let avx = is_flag_set(xcr0, XCR0_AVX_STATE);
        Self { avx, avx512: avx && is_flag_set(xcr0, XCR0_AVX512_STATE) }
    }
}

/// Decode the set feature bits of a single register into `caps`.
fn decode_register(register: u32, bits: &[FeatureBit], xsave: XsaveState, caps: &mut CapabilitySet) {
    for feature in bits {
        if !is_flag_set(register, 1 << feature.bit) {
            continue;
        }

        let allowed = match feature.requirement {
            Requirement::None => true,
            Requirement::AvxState => xsave.avx,
            Requirement::Avx512State => xsave.avx512,
            Requirement::Capability(cap) => caps.contains(cap),
        };

        if allowed {
            caps.insert(feature.capability);
        } else {
            log_debug!(LOG_CAT, "{} is reported by the processor, but {:?} is not met", feature.capability, feature.requirement);
        }
    }
}

/// Queries processor identity and capabilities.
///
/// The decoding only talks to the processor through `Q` and to the OS through `P`.
#[derive(Clone, Copy, Default, Debug)]
pub struct Prober<Q = NativeQuery, P = NativePlatform> {
    query:    Q,
    platform: P,
}

impl Prober {
    /// Create a prober for the processor and OS the process is running on.
    pub const fn native() -> Self {
        Self { query: NativeQuery, platform: NativePlatform }
    }
}

impl<Q: InstructionQuery, P: PlatformProvider> Prober<Q, P> {
    pub const fn new(query: Q, platform: P) -> Self {
        Self { query, platform }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Highest supported standard leaf.
    pub fn max_standard_leaf(&self) -> u32 {
        self.query.cpuid(LEAF_VENDOR).eax
    }

    /// Highest supported extended leaf.
    pub fn max_extended_leaf(&self) -> u32 {
        self.query.cpuid(LEAF_EXTENDED_MAX).eax
    }

    /// Write the null-terminated vendor ID into `buffer`.
    ///
    /// Fails when `buffer` can't hold 12 characters and a null-terminator, in which case only an empty string is written, if `buffer` isn't empty.
    pub fn query_vendor_id(&self, buffer: &mut [u8]) -> bool {
        if buffer.len() < VENDOR_ID_CAPACITY {
            log_verbose!(LOG_CAT, "Vendor ID buffer is too small ({} bytes, needs {VENDOR_ID_CAPACITY})", buffer.len());
            write_empty_c_str(buffer);
            return false;
        }

        let vendor_id = self.raw_vendor_id();
        buffer[..VENDOR_ID_LEN].copy_from_slice(&vendor_id);
        buffer[VENDOR_ID_LEN] = 0;
        true
    }

    /// Get the vendor ID, `None` if the processor reports an empty vendor ID.
    pub fn vendor_id(&self) -> Option<String> {
        let mut buffer = [0u8; VENDOR_ID_CAPACITY];
        if !self.query_vendor_id(&mut buffer) {
            return None;
        }

        let vendor_id = null_terminate_slice(&buffer);
        (!vendor_id.is_empty()).then(|| String::from_utf8_lossy(vendor_id).into_owned())
    }

    pub fn manufacturer(&self) -> Manufacturer {
        Manufacturer::from_vendor_id(&self.raw_vendor_id())
    }

    /// Vendor ID bytes are stored in `ebx`, `edx`, `ecx`, in that order.
    fn raw_vendor_id(&self) -> [u8; VENDOR_ID_LEN] {
        let res = self.query.cpuid(LEAF_VENDOR);

        let mut vendor_id = [0u8; VENDOR_ID_LEN];
        vendor_id[0..4].copy_from_slice(&res.ebx.to_le_bytes());
        vendor_id[4..8].copy_from_slice(&res.edx.to_le_bytes());
        vendor_id[8..12].copy_from_slice(&res.ecx.to_le_bytes());
        vendor_id
    }

    /// Write the null-terminated brand string into `buffer`.
    ///
    /// The bytes are copied as reported by the processor, including any leading padding.
    ///
    /// Fails when `buffer` is smaller than 48 bytes, or when the processor does not support the brand string leaves.
    /// On failure, only an empty string is written, if `buffer` isn't empty.
    pub fn query_brand_string(&self, buffer: &mut [u8]) -> bool {
        if buffer.len() < BRAND_STRING_CAPACITY {
            log_verbose!(LOG_CAT, "Brand string buffer is too small ({} bytes, needs {BRAND_STRING_CAPACITY})", buffer.len());
            write_empty_c_str(buffer);
            return false;
        }

        if self.max_standard_leaf() < LEAF_FEATURES {
            log_verbose!(LOG_CAT, "No standard leaves are supported, brand string is unavailable");
            write_empty_c_str(buffer);
            return false;
        }

        let max_extended_leaf = self.max_extended_leaf();
        if max_extended_leaf < LEAF_BRAND_STRING_LAST {
            log_verbose!(LOG_CAT, "Highest extended leaf is {max_extended_leaf:#X}, brand string is unavailable");
            write_empty_c_str(buffer);
            return false;
        }

        for (chunk, leaf) in buffer[..BRAND_STRING_CAPACITY].chunks_exact_mut(16).zip(LEAF_BRAND_STRING_FIRST..=LEAF_BRAND_STRING_LAST) {
            let res = self.query.cpuid(leaf);
            for (dst, reg) in chunk.chunks_exact_mut(4).zip([res.eax, res.ebx, res.ecx, res.edx]) {
                dst.copy_from_slice(&reg.to_le_bytes());
            }
        }
        buffer[BRAND_STRING_CAPACITY - 1] = 0;
        true
    }

    /// Get the brand string without padding, `None` if it is not available.
    pub fn brand_string(&self) -> Option<String> {
        let mut buffer = [0u8; BRAND_STRING_CAPACITY];
        if !self.query_brand_string(&mut buffer) {
            return None;
        }

        let brand = String::from_utf8_lossy(null_terminate_slice(&buffer));
        let brand = brand.trim();
        (!brand.is_empty()).then(|| brand.to_string())
    }

    /// Get the raw processor identity fields, `None` if the version information leaf is not supported.
    pub fn query_processor_identity(&self) -> Option<ProcessorIdentity> {
        self.version_info().map(ProcessorIdentity::from_version_info)
    }

    /// Get the processor identity with merged family and model, `None` if the version information leaf is not supported.
    pub fn query_legacy_identity(&self) -> Option<LegacyIdentity> {
        self.version_info().map(LegacyIdentity::from_version_info)
    }

    fn version_info(&self) -> Option<u32> {
        if self.max_standard_leaf() < LEAF_FEATURES {
            log_verbose!(LOG_CAT, "No standard leaves are supported, processor identity is unavailable");
            return None;
        }
        Some(self.query.cpuid(LEAF_FEATURES).eax)
    }

    /// Detect the instruction set extensions the processor supports and the OS has enabled.
    pub fn query_capabilities(&self) -> CapabilitySet {
        let mut caps = CapabilitySet::empty();

        let max_leaf = self.max_standard_leaf();
        if max_leaf < LEAF_FEATURES {
            log_verbose!(LOG_CAT, "No standard leaves are supported, no capabilities are available");
            return caps;
        }

        let features = self.query.cpuid(LEAF_FEATURES);
        if !is_flag_set(features.edx, MMX_BIT) {
            log_verbose!(LOG_CAT, "MMX is not supported, skipping capability detection");
            return caps;
        }

        let xsave = self.xsave_state(features.ecx);
        log_debug!(LOG_CAT, "Highest standard leaf: {max_leaf:#X}, OS register state: {xsave:?}");

        decode_register(features.edx, LEAF1_EDX_BITS, xsave, &mut caps);
        decode_register(features.ecx, LEAF1_ECX_BITS, xsave, &mut caps);

        if max_leaf >= LEAF_EXTENDED_FEATURES {
            let ext_features = self.query.cpuid_count(LEAF_EXTENDED_FEATURES, 0);
            decode_register(ext_features.ebx, LEAF7_EBX_BITS, xsave, &mut caps);
        }

        let max_extended_leaf = self.max_extended_leaf();
        if max_extended_leaf >= LEAF_EXTENDED_FEATURES_AMD {
            let amd_features = self.query.cpuid(LEAF_EXTENDED_FEATURES_AMD);
            decode_register(amd_features.ecx, EXT_ECX_BITS, xsave, &mut caps);
            decode_register(amd_features.edx, EXT_EDX_BITS, xsave, &mut caps);
        } else {
            log_debug!(LOG_CAT, "Highest extended leaf is {max_extended_leaf:#X}, skipping extended features");
        }

        log_debug!(LOG_CAT, "Detected {} capabilities: {caps}", caps.len());
        caps
    }

    /// Get the detected capabilities as a mask in the given layout.
    pub fn query_capability_mask(&self, layout: MaskLayout) -> u64 {
        layout.encode(&self.query_capabilities())
    }

    fn xsave_state(&self, leaf1_ecx: u32) -> XsaveState {
        if !is_flag_set(leaf1_ecx, OSXSAVE_BIT) {
            log_debug!(LOG_CAT, "OSXSAVE is not set, extended register state is unavailable");
            return XsaveState::default();
        }
        XsaveState::from_xcr0(self.query.xgetbv(0))
    }

    /// Get the number of logical processors, never less than 1.
    pub fn query_logical_processor_count(&self, scope: CountScope) -> u32 {
        match self.platform.affinity_masks() {
            Ok(masks) => masks.logical_processor_count(scope),
            Err(err) => {
                log_warning!(LOG_CAT, "Failed to get the process affinity masks (OS error {err}), assuming 1 logical processor");
                1
            },
        }
    }

    /// Get the mode the process runs in.
    ///
    /// 64-bit builds are always [`ArchitectureMode::X64`], 32-bit builds check for WOW64.
    pub fn query_architecture_mode(&self) -> ArchitectureMode {
        if cfg!(target_pointer_width = "64") {
            ArchitectureMode::X64
        } else {
            ArchitectureMode::from_wow64(self.platform.is_wow64_process())
        }
    }
}

#[cfg(test)]
mod test {
    use crate::mock::{MockPlatform, MockQuery};

    use super::*;

    fn all_bits() -> impl Iterator<Item = &'static FeatureBit> {
        LEAF1_EDX_BITS.iter()
            .chain(LEAF1_ECX_BITS)
            .chain(LEAF7_EBX_BITS)
            .chain(EXT_ECX_BITS)
            .chain(EXT_EDX_BITS)
    }

    #[test]
    fn tables_cover_every_capability_once() {
        let mut seen = CapabilitySet::empty();
        for feature in all_bits() {
            assert!(!seen.contains(feature.capability), "{} is decoded twice", feature.capability);
            seen.insert(feature.capability);
        }
        assert_eq!(seen.len(), Capability::all().count());
    }

    #[test]
    fn tables_are_in_declaration_order() {
        let decoded = all_bits().map(|feature| feature.capability).collect::<Vec<_>>();
        let declared = Capability::all().collect::<Vec<_>>();
        assert_eq!(decoded, declared);
    }

    #[test]
    fn requirements_match_capabilities() {
        for feature in all_bits() {
            let cap = feature.capability;
            match feature.requirement {
                Requirement::None => assert!(!cap.requires_avx_state(), "{cap} is missing an OS state requirement"),
                Requirement::AvxState => assert!(cap.requires_avx_state() && !cap.requires_avx512_state()),
                Requirement::Avx512State => assert!(cap.requires_avx512_state()),
                Requirement::Capability(req) => assert!(req.requires_avx_state() && cap.requires_avx_state()),
            }
        }
    }

    #[test]
    fn xsave_state() {
        assert_eq!(XsaveState::from_xcr0(0x07), XsaveState { avx: true, avx512: false });
        assert_eq!(XsaveState::from_xcr0(0xE7), XsaveState { avx: true, avx512: true });
        assert_eq!(XsaveState::from_xcr0(0xE3), XsaveState { avx: false, avx512: false });
        assert_eq!(XsaveState::from_xcr0(0x67), XsaveState { avx: true, avx512: false });
    }

    #[test]
    fn decode_requires_capability() {
        let mut caps = CapabilitySet::empty();
        decode_register(1 << 11 | 1 << 16 | 1 << 5, EXT_ECX_BITS, XsaveState { avx: true, avx512: true }, &mut caps);
        assert_eq!(caps, CapabilitySet::from_slice(&[Lzcnt]));

        caps.insert(Avx);
        decode_register(1 << 11 | 1 << 16, EXT_ECX_BITS, XsaveState::default(), &mut caps);
        assert!(caps.contains_all(CapabilitySet::from_slice(&[Xop, Fma4])));
    }

    #[test]
    fn leaf7_uses_sub_leaf_0() {
        let query = MockQuery::new()
            .with_max_leaf(7)
            .with_leaf(LEAF_FEATURES, CpuidResult::new(0, 0, 0, MMX_BIT))
            .with_sub_leaf(LEAF_EXTENDED_FEATURES, 1, CpuidResult::new(0, 1 << 3, 0, 0));
        let prober = Prober::new(&query, MockPlatform::default());
        assert_eq!(prober.query_capabilities(), CapabilitySet::from_slice(&[Mmx]));
        assert_eq!(query.query_count(LEAF_EXTENDED_FEATURES), 1);
    }

    #[test]
    fn vendor_of_native_prober() {
        let prober = Prober::native();
        let mut buffer = [0xFFu8; VENDOR_ID_CAPACITY];
        assert!(prober.query_vendor_id(&mut buffer));
        assert_eq!(buffer[VENDOR_ID_LEN], 0);
    }
}
