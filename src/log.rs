//! Internal logging vocabulary.
//!
//! Wraps the `log` crate's macros so the rest of the crate can write `warn!`/`info!`/`debug!`
//! regardless of whether the `log` feature is enabled. With the feature off, calls compile down
//! to a no-op `format_args!` so argument expressions still get type-checked. Only the three
//! levels this crate actually reaches for are wired up; add more here if a caller needs them.

#[cfg(feature = "log")]
macro_rules! warn {
    ($($t:tt)*) => {{ log::warn!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! info {
    ($($t:tt)*) => {{ log::info!($($t)*); }};
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => {{ log::debug!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($t:tt)*) => {{ format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($t:tt)*) => {{ format_args!($($t)*); }};
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => {{ format_args!($($t)*); }};
}
