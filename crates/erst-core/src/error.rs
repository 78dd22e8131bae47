//! # Error Types
//!
//! Errors returned by module loading and debug-information queries.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for debug-information operations
///
/// ## Error Categories
///
/// 1. **Construction errors**: `InvalidBinary`, `NoDebugInfo`, `InvalidConfig`
/// 2. **Query errors**: `NoLocalVars`, `NotFound`
///
/// Construction errors mean the module carries no usable symbols. Callers are
/// expected to keep going without variable-level detail rather than abort.
/// Query errors distinguish "nothing covers this address" from a valid but
/// empty answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErstError
{
    /// The buffer is too short, carries no recognized magic, or the native
    /// container reader rejected it
    ///
    /// This happens when:
    /// - The buffer is shorter than 4 bytes
    /// - The magic is not WASM, ELF, Mach-O (64-bit) or PE
    /// - An ELF/Mach-O/PE header is corrupt
    #[error("Invalid binary: {0}")]
    InvalidBinary(String),

    /// The module has no `.debug_info`/`.debug_abbrev` sections, or no debug
    /// entry could be decoded from them
    #[error("No DWARF debug information found")]
    NoDebugInfo,

    /// A subprogram covers the address but none of its variables is live there
    #[error("No local variables found at address 0x{address:x}")]
    NoLocalVars
    {
        /// The queried instruction address
        address: u64,
    },

    /// Nothing in the debug information covers the address
    ///
    /// `what` names the kind of record that was looked for, e.g.
    /// `"subprogram"` or `"source location"`.
    #[error("No {what} found at address 0x{address:x}")]
    NotFound
    {
        /// Kind of record that was searched for
        what: &'static str,
        /// The queried instruction address
        address: u64,
    },

    /// A `DebugInfoConfig` field is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ErstError
{
    /// `true` for the errors a caller should treat as "this module has no
    /// usable symbols" rather than as a hard failure.
    pub fn is_degraded(&self) -> bool
    {
        matches!(self, ErstError::NoDebugInfo)
    }
}

/// Convenience type alias for `Result<T, ErstError>`
///
/// ```rust
/// use erst_core::error::ErstResult;
/// fn foo() -> ErstResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type ErstResult<T> = std::result::Result<T, ErstError>;
