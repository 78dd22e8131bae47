//! Demanglers for [`DebugInfoConfig::demangler`](crate::config::DebugInfoConfig::demangler).
//!
//! The core never picks a mangling scheme on its own: the default is
//! [`identity`], and callers opt in to [`rust_demangle`] (or their own
//! function) through the configuration.

use rustc_demangle::try_demangle;

/// Returns the name unchanged.
pub fn identity(name: &str) -> String
{
    name.to_owned()
}

/// Demangle legacy (`_ZN...E`) and v0 (`_R...`) Rust symbols.
///
/// Names that are not Rust symbols are returned unchanged. The trailing
/// hash of legacy symbols is dropped.
///
/// ## Example
///
/// ```rust
/// use erst_core::symbols::demangle::rust_demangle;
///
/// assert_eq!(rust_demangle("_ZN4core3ptr13drop_in_place17h0123456789abcdefE"), "core::ptr::drop_in_place");
/// assert_eq!(rust_demangle("add"), "add");
/// ```
pub fn rust_demangle(name: &str) -> String
{
    match try_demangle(name) {
        Ok(demangled) => format!("{demangled:#}"),
        Err(_) => name.to_owned(),
    }
}
