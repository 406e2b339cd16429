use windows::{
    core::s,
    Win32::{
        Foundation::{BOOL, HANDLE},
        System::Threading::{GetCurrentProcess, GetProcessAffinityMask},
    },
};

use crate::platform::AffinityMasks;

mod dynlib;

/// `IsWow64Process` is not available on every version of kernel32, so it is resolved at runtime.
type IsWow64ProcessFn = unsafe extern "system" fn(HANDLE, *mut BOOL) -> BOOL;

pub(crate) fn affinity_masks() -> Result<AffinityMasks, i32> {
    let mut process = 0usize;
    let mut system = 0usize;
    unsafe { GetProcessAffinityMask(GetCurrentProcess(), &mut process, &mut system) }
        .map_err(|err| err.code().0)?;

    Ok(AffinityMasks { process: process as u64, system: system as u64 })
}

pub(crate) fn is_wow64_process() -> Option<bool> {
    let kernel32 = dynlib::get_loaded(s!("kernel32.dll")).ok()?;
    let proc = dynlib::get_proc_address(kernel32, s!("IsWow64Process"))?;

    // SAFETY: `IsWow64Process` has this signature on every Windows version exporting it
    let is_wow64_process: IsWow64ProcessFn = unsafe { core::mem::transmute(proc) };

    let mut is_wow64 = BOOL(0);
    let res = unsafe { is_wow64_process(GetCurrentProcess(), &mut is_wow64) };
    res.as_bool().then(|| is_wow64.as_bool())
}
