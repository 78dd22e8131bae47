//! Frame description returned by `DebugInfo::explain`.

use super::symbols::{LocalVariable, SourceLocation};

/// Everything known about one instruction address.
///
/// `return_address` and `frame_pointer` come from the caller's execution
/// engine and are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame
{
    pub address: u64,
    /// Display name of the containing function.
    pub function: String,
    pub source_location: Option<SourceLocation>,
    /// Variables live at `address`; empty when none are.
    pub local_variables: Vec<LocalVariable>,
    pub return_address: u64,
    pub frame_pointer: u64,
}
