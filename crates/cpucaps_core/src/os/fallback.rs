use std::thread;

use crate::platform::AffinityMasks;

/// There is no portable way to get the affinity masks, so build them from the available parallelism.
/// 
/// Both masks are the same, with the lowest `n` bits set.
pub(crate) fn affinity_masks() -> Result<AffinityMasks, i32> {
    let count = thread::available_parallelism()
        .map_err(|err| err.raw_os_error().unwrap_or(0))?
        .get();

    let mask = if count >= u64::BITS as usize { u64::MAX } else { (1u64 << count) - 1 };
    Ok(AffinityMasks { process: mask, system: mask })
}

/// WOW64 only exists on Windows.
pub(crate) fn is_wow64_process() -> Option<bool> {
    None
}
