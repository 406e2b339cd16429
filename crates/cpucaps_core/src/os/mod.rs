//! OS specific process state queries.
//! 
//! Only accessible through [`crate::platform::NativePlatform`].

use cfg_if::cfg_if;

cfg_if!{
    if #[cfg(windows)] {
        mod windows;
        pub(crate) use self::windows::*;
    } else {
        mod fallback;
        pub(crate) use self::fallback::*;
    }
}
