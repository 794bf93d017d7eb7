//! Logging macros
//!
//! On the firmware these forward to `defmt`. Host builds keep the arguments
//! type-checked but emit nothing, so format strings must stay within the
//! subset both sides understand (`{}` and `{:?}`).

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::debug!($($arg)*);

        #[cfg(not(feature = "embedded"))]
        {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::info!($($arg)*);

        #[cfg(not(feature = "embedded"))]
        {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

/// Log a warning
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::warn!($($arg)*);

        #[cfg(not(feature = "embedded"))]
        {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

/// Log an error
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "embedded")]
        ::defmt::error!($($arg)*);

        #[cfg(not(feature = "embedded"))]
        {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}
