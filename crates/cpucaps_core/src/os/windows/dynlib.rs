use windows::{
    core::PCSTR,
    Win32::{
        Foundation::{HMODULE, FARPROC},
        System::LibraryLoader::{GetModuleHandleA, GetProcAddress},
    },
};

/// Handle to a dynamic library that is already mapped into the process.
/// 
/// The library is not loaded by this handle, so there is nothing to free.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DynLibHandle(HMODULE);

/// Get a handle to a dynamic library that is already loaded by the process.
/// 
/// `name` needs to be null-terminated.
pub fn get_loaded(name: PCSTR) -> Result<DynLibHandle, i32> {
    unsafe { GetModuleHandleA(name) }
        .map(DynLibHandle)
        .map_err(|err| err.code().0)
}

/// `proc_name` needs to be null-terminated.
pub fn get_proc_address(handle: DynLibHandle, proc_name: PCSTR) -> FARPROC {
    unsafe { GetProcAddress(handle.0, proc_name) }
}
