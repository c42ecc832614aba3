//! Unrecoverable failures
//!
//! Some conditions mean the process is running against data or code it
//! cannot trust: a persisted version tag outside the supported range (build
//! skew) or a superblock whose magic does not match (corruption). These are
//! never returned as values. They are logged and the process stops.

/// Abort on a failed consistency check
///
/// Logs at `error` level and panics. Used for structural corruption such as
/// a bad superblock magic.
#[cold]
#[track_caller]
pub fn consistency_failure(what: &str) -> ! {
    let location = std::panic::Location::caller();
    tracing::error!(%location, "consistency check failed: {}", what);
    panic!("consistency check failed: {}", what);
}

/// Abort on a format version outside the supported range
#[cold]
#[track_caller]
pub fn version_out_of_range(tag: i64) -> ! {
    let location = std::panic::Location::caller();
    tracing::error!(%location, tag, "format version outside supported range");
    panic!("format version tag {} outside supported range", tag);
}

/// Check a consistency condition, aborting if it does not hold
#[macro_export]
macro_rules! guarantee {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::fatal::consistency_failure(&format!($($arg)+));
        }
    };
}
