//! Error handling foundation for huddle.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own error enums in its own error module; the
//! session layer wraps them and the binary reports them as a `Report`.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
