//! Detection of x86/x64 processor identity and instruction set extensions.
//!
//! All detection goes through a [`Prober`], which issues `cpuid`/`xgetbv` through an [`InstructionQuery`]
//! and reads process state through a [`PlatformProvider`], so the decoding can be run against synthetic values.
//!
//! The crate also builds as a dynamic library, exposing the C ABI in [`exports`].

pub mod utils;
pub mod fmt;

pub mod query;
pub mod capability;
pub mod layout;
pub mod identity;
pub mod platform;
pub mod prober;
pub mod mock;
pub mod exports;

mod os;

pub use query::{CpuidResult, InstructionQuery, NativeQuery};
pub use capability::{Capability, CapabilitySet};
pub use layout::{LayoutRow, MaskLayout};
pub use identity::{Manufacturer, ProcessorType, ProcessorIdentity, LegacyIdentity, VENDOR_ID_CAPACITY, BRAND_STRING_CAPACITY};
pub use platform::{AffinityMasks, ArchitectureMode, CountScope, NativePlatform, PlatformProvider};
pub use prober::Prober;
pub use mock::{MockQuery, MockPlatform};
