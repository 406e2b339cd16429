//! Process state the prober needs from the operating system.

use cpucaps_macros::{EnumDisplay, EnumFromName, EnumFromIndex};

use crate::os;

/// Affinity masks of the current process and of the system.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct AffinityMasks {
    /// Processors the process is allowed to run on.
    pub process: u64,
    /// Processors configured on the system.
    pub system:  u64,
}

impl AffinityMasks {
    /// Number of logical processors in the mask selected by `scope`, never less than 1.
    pub fn logical_processor_count(&self, scope: CountScope) -> u32 {
        let mask = match scope {
            CountScope::System => self.system,
            CountScope::Shared => self.process & self.system,
        };
        mask.count_ones().max(1)
    }
}

/// Which affinity mask is used to count the logical processors.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, EnumDisplay, EnumFromName)]
pub enum CountScope {
    /// Every processor in the system mask.
    #[default]
    #[display("system")]
    #[parse_name("system")]
    System,
    /// Processors in both the process and the system mask.
    #[display("shared")]
    #[parse_name("shared")]
    Shared,
}

/// Mode the process is running in.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumDisplay, EnumFromIndex)]
pub enum ArchitectureMode {
    /// 32-bit process on a 32-bit OS
    #[display("x86")]
    X86 = 1,
    /// 64-bit process, or a 32-bit process running under WOW64
    #[display("x64")]
    X64 = 2,
}

impl ArchitectureMode {
    /// Architecture mode of a 32-bit process, a failed or unavailable WOW64 check counts as 32-bit.
    pub fn from_wow64(is_wow64: Option<bool>) -> Self {
        match is_wow64 {
            Some(true) => ArchitectureMode::X64,
            _ => ArchitectureMode::X86,
        }
    }
}

/// Source of OS process state.
pub trait PlatformProvider {
    /// Get the affinity masks of the current process.
    /// 
    /// # Errors
    /// 
    /// Returns the OS error code when the masks could not be retrieved.
    fn affinity_masks(&self) -> Result<AffinityMasks, i32>;

    /// Check if the process is a 32-bit process running on a 64-bit OS.
    /// 
    /// Returns `None` when the check is not available.
    fn is_wow64_process(&self) -> Option<bool>;
}

impl<T: PlatformProvider + ?Sized> PlatformProvider for &T {
    fn affinity_masks(&self) -> Result<AffinityMasks, i32> {
        (**self).affinity_masks()
    }

    fn is_wow64_process(&self) -> Option<bool> {
        (**self).is_wow64_process()
    }
}

/// Platform provider querying the OS the process is running on.
#[derive(Clone, Copy, Default, Debug)]
pub struct NativePlatform;

impl PlatformProvider for NativePlatform {
    fn affinity_masks(&self) -> Result<AffinityMasks, i32> {
        os::affinity_masks()
    }

    fn is_wow64_process(&self) -> Option<bool> {
        os::is_wow64_process()
    }
}

#[cfg(test)]
mod test {
    use cpucaps_base::{EnumFromIndexT, EnumFromNameT};

    use super::*;

    #[test]
    fn count_scopes() {
        let masks = AffinityMasks { process: 0b0011, system: 0b1111 };
        assert_eq!(masks.logical_processor_count(CountScope::System), 4);
        assert_eq!(masks.logical_processor_count(CountScope::Shared), 2);
    }

    #[test]
    fn count_is_floored() {
        let masks = AffinityMasks { process: 0b1100, system: 0b0011 };
        assert_eq!(masks.logical_processor_count(CountScope::Shared), 1);
        assert_eq!(AffinityMasks::default().logical_processor_count(CountScope::System), 1);
    }

    #[test]
    fn architecture_mode() {
        assert_eq!(ArchitectureMode::from_wow64(Some(true)), ArchitectureMode::X64);
        assert_eq!(ArchitectureMode::from_wow64(Some(false)), ArchitectureMode::X86);
        assert_eq!(ArchitectureMode::from_wow64(None), ArchitectureMode::X86);
        assert_eq!(ArchitectureMode::X64 as u32, 2);
        assert_eq!(ArchitectureMode::from_idx(1), Some(ArchitectureMode::X86));
        assert_eq!(ArchitectureMode::from_idx(0), None);
    }

    #[test]
    fn parse_scope() {
        assert_eq!(CountScope::parse("shared"), Some(CountScope::Shared));
        assert_eq!(CountScope::parse("everything"), None);
        assert_eq!(CountScope::default().parse_name(), "system");
    }

    #[test]
    fn native_masks() {
        if let Ok(masks) = NativePlatform.affinity_masks() {
            assert!(masks.logical_processor_count(CountScope::System) >= 1);
            assert_eq!(masks.process & !masks.system, 0);
        }
    }
}
