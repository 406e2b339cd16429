use core::ops;

/// If the array contains `0`, return the sub-slice until that point, otherwise return the full slice.
pub fn null_terminate_slice(slice: &[u8]) -> &[u8] {
    let len = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    &slice[..len]
}

/// Check if a flag is set
pub fn is_flag_set<T>(val: T, flag: T) -> bool
where
    T : Copy + PartialEq + ops::BitAnd<Output = T>
{
    val & flag == flag
}

/// Write an empty C string into `buffer`, if it has room for the terminator.
pub(crate) fn write_empty_c_str(buffer: &mut [u8]) {
    if let Some(first) = buffer.first_mut() {
        *first = 0;
    }
}
