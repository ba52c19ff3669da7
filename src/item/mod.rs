#[cfg(feature = "logger")]
/// This module provides a logging handler, useful for dry runs.
pub mod logger;

/// This module provides the delimiter-separated reader, writer and format.
pub mod csv;
