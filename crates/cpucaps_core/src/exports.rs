//! C ABI entry points of the dynamic library.
//!
//! Every entry point is exported with an `X86` or `X64` suffix, depending on the pointer width of the build,
//! so a 32-bit and a 64-bit build can be loaded side by side by the same host.
//! Within Rust, the unsuffixed name is an alias of the function exported by the current build.
#![allow(non_snake_case)]

use core::slice;

use crate::{
    identity::ProcessorIdentity,
    layout::MaskLayout,
    platform::CountScope,
    prober::Prober,
};

pub const LIBRARY_VERSION_MAJOR: u16 = 2;
pub const LIBRARY_VERSION_MINOR: u16 = 0;

/// C `BOOL`
pub type Bool = i32;
pub const TRUE: Bool = 1;
pub const FALSE: Bool = 0;

/// Library version, packed as `(major << 16) | minor`.
pub const fn packed_library_version() -> u32 {
    ((LIBRARY_VERSION_MAJOR as u32) << 16) | LIBRARY_VERSION_MINOR as u32
}

/// Split a packed library version into `(major, minor)`.
pub const fn unpack_library_version(packed: u32) -> (u16, u16) {
    ((packed >> 16) as u16, packed as u16)
}

pub const fn library_version() -> (u16, u16) {
    unpack_library_version(packed_library_version())
}

/// Get a mutable slice from a C buffer, `None` if the buffer is null.
///
/// # Safety
///
/// When not null, `buffer` needs to be valid for writes of `size` bytes.
unsafe fn buffer_from_raw<'a>(buffer: *mut u8, size: u32) -> Option<&'a mut [u8]> {
    if buffer.is_null() {
        None
    } else {
        Some(slice::from_raw_parts_mut(buffer, size as usize))
    }
}

/// Define an exported function for each architecture, only the one matching the build's pointer width is compiled.
macro_rules! define_exports {
    ($(
        $(#[$attr:meta])*
        fn $name:ident => $x86:ident, $x64:ident ($($arg:ident : $arg_ty:ty),*) -> $ret:ty $body:block
    )*) => {
        $(
            $(#[$attr])*
            #[cfg(not(target_pointer_width = "64"))]
            #[no_mangle]
            pub unsafe extern "C" fn $x86($($arg: $arg_ty),*) -> $ret $body

            $(#[$attr])*
            #[cfg(target_pointer_width = "64")]
            #[no_mangle]
            pub unsafe extern "C" fn $x64($($arg: $arg_ty),*) -> $ret $body

            #[cfg(not(target_pointer_width = "64"))]
            pub use self::$x86 as $name;
            #[cfg(target_pointer_width = "64")]
            pub use self::$x64 as $name;
        )*
    };
}

define_exports!{
    /// Get the library version, packed as `(major << 16) | minor`.
    fn GetCPULibraryVersion => GetCPULibraryVersionX86, GetCPULibraryVersionX64() -> u32 {
        packed_library_version()
    }

    /// Get the architecture mode: 1 for x86, 2 for x64.
    fn GetCPUArchitecture => GetCPUArchitectureX86, GetCPUArchitectureX64() -> u32 {
        Prober::native().query_architecture_mode() as u32
    }

    /// Get the number of logical processors in the system affinity mask, at least 1.
    fn GetCPUCount => GetCPUCountX86, GetCPUCountX64() -> u32 {
        Prober::native().query_logical_processor_count(CountScope::System)
    }

    /// Write the null-terminated vendor ID into `buffer`, which needs to hold at least 13 bytes.
    ///
    /// # Safety
    ///
    /// `buffer` needs to be null or valid for writes of `size` bytes.
    fn GetCPUVendorString => GetCPUVendorStringX86, GetCPUVendorStringX64(buffer: *mut u8, size: u32) -> i32 {
        match buffer_from_raw(buffer, size) {
            Some(buffer) => Prober::native().query_vendor_id(buffer) as Bool,
            None => FALSE,
        }
    }

    /// Get the raw processor identity fields, all fields are 0 on failure.
    ///
    /// # Safety
    ///
    /// Every pointer needs to be null or valid for a single byte write. Nothing is written when any of them is null.
    fn GetCPUInformation => GetCPUInformationX86, GetCPUInformationX64(
        processor_type: *mut u8,
        family_ext: *mut u8,
        family: *mut u8,
        model_ext: *mut u8,
        model: *mut u8,
        stepping: *mut u8
    ) -> i32 {
        let outputs = [processor_type, family_ext, family, model_ext, model, stepping];
        if outputs.iter().any(|ptr| ptr.is_null()) {
            return FALSE;
        }

        // The default identity has every field set to 0
        let (ident, res) = match Prober::native().query_processor_identity() {
            Some(ident) => (ident, TRUE),
            None => (ProcessorIdentity::default(), FALSE),
        };
        let values = [
            ident.processor_type as u8,
            ident.extended_family,
            ident.family,
            ident.extended_model,
            ident.model,
            ident.stepping,
        ];
        for (ptr, value) in outputs.into_iter().zip(values) {
            *ptr = value;
        }
        res
    }

    /// Get the capability mask in the 32-bit packed layout.
    fn GetCPUCapabilities => GetCPUCapabilitiesX86, GetCPUCapabilitiesX64() -> u32 {
        Prober::native().query_capability_mask(MaskLayout::Packed) as u32
    }

    /// Get the capability mask in the 64-bit wide layout.
    fn GetCPUCapabilitiesWide => GetCPUCapabilitiesWideX86, GetCPUCapabilitiesWideX64() -> u64 {
        Prober::native().query_capability_mask(MaskLayout::Wide)
    }

    /// Write the null-terminated brand string into `buffer`, which needs to hold at least 48 bytes.
    ///
    /// # Safety
    ///
    /// `buffer` needs to be null or valid for writes of `size` bytes.
    fn GetCPUBrandString => GetCPUBrandStringX86, GetCPUBrandStringX64(buffer: *mut u8, size: u32) -> i32 {
        match buffer_from_raw(buffer, size) {
            Some(buffer) => Prober::native().query_brand_string(buffer) as Bool,
            None => FALSE,
        }
    }
}

#[cfg(test)]
mod test {
    use core::ptr;

    use crate::{identity::VENDOR_ID_LEN, platform::ArchitectureMode};

    use super::*;

    #[test]
    fn version() {
        assert_eq!(packed_library_version(), 0x0002_0000);
        assert_eq!(library_version(), (2, 0));
        assert_eq!(unpack_library_version(0x0001_0003), (1, 3));
        assert_eq!(unsafe { GetCPULibraryVersion() }, 0x0002_0000);
    }

    #[test]
    fn null_buffers_fail() {
        unsafe {
            assert_eq!(GetCPUVendorString(ptr::null_mut(), 13), FALSE);
            assert_eq!(GetCPUBrandString(ptr::null_mut(), 48), FALSE);
        }
    }

    #[test]
    fn vendor_string() {
        let mut buffer = [0xFFu8; 16];
        unsafe {
            assert_eq!(GetCPUVendorString(buffer.as_mut_ptr(), 12), FALSE);
            assert_eq!(buffer[0], 0);
            assert_eq!(buffer[1], 0xFF);

            assert_eq!(GetCPUVendorString(buffer.as_mut_ptr(), 13), TRUE);
            assert_eq!(buffer[VENDOR_ID_LEN], 0);
            assert_eq!(buffer[VENDOR_ID_LEN + 1], 0xFF);
        }
    }

    #[test]
    fn brand_string_stays_in_bounds() {
        let mut buffer = [0xFFu8; 64];
        unsafe {
            assert_eq!(GetCPUBrandString(buffer.as_mut_ptr(), 47), FALSE);
            assert_eq!(buffer[0], 0);

            GetCPUBrandString(buffer.as_mut_ptr(), 48);
        }
        assert!(buffer[48..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn information_with_null_output() {
        let mut value = 0xFFu8;
        let out: *mut u8 = &mut value;
        let res = unsafe { GetCPUInformation(out, out, out, out, ptr::null_mut(), out) };
        assert_eq!(res, FALSE);
        assert_eq!(value, 0xFF);
    }

    #[test]
    fn information_writes_single_bytes() {
        const GUARD: u8 = 0xAA;
        const STRIDE: usize = 4;

        // Each output byte is followed by guard bytes that have to stay untouched
        let mut slots = [GUARD; 6 * STRIDE];
        let base = slots.as_mut_ptr();
        let res = unsafe {
            GetCPUInformation(base, base.add(STRIDE), base.add(2 * STRIDE), base.add(3 * STRIDE), base.add(4 * STRIDE), base.add(5 * STRIDE))
        };

        let expected = match Prober::native().query_processor_identity() {
            Some(ident) => {
                assert_eq!(res, TRUE);
                [ident.processor_type as u8, ident.extended_family, ident.family, ident.extended_model, ident.model, ident.stepping]
            },
            None => {
                assert_eq!(res, FALSE);
                [0; 6]
            },
        };

        for (idx, slot) in slots.chunks(STRIDE).enumerate() {
            assert_eq!(slot[0], expected[idx], "output {idx}");
            assert!(slot[1..].iter().all(|&b| b == GUARD), "guard bytes after output {idx}: {slot:02X?}");
        }
    }

    #[test]
    fn architecture_and_count() {
        let arch = unsafe { GetCPUArchitecture() };
        if cfg!(target_pointer_width = "64") {
            assert_eq!(arch, ArchitectureMode::X64 as u32);
        } else {
            assert!(arch == ArchitectureMode::X86 as u32 || arch == ArchitectureMode::X64 as u32);
        }
        assert!(unsafe { GetCPUCount() } >= 1);
    }

    #[test]
    fn capability_masks_agree() {
        let packed = unsafe { GetCPUCapabilities() } as u64;
        let wide = unsafe { GetCPUCapabilitiesWide() };
        assert_eq!(MaskLayout::Packed.decode(packed), MaskLayout::Wide.decode(wide));
    }
}
