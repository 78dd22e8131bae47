//! # Types
//!
//! Query results derived from the decoded debug entries.
//!
//! These are plain owned values: once returned they do not borrow from the
//! module buffer, so callers can keep them after dropping the `DebugInfo`.

pub mod frame;
pub mod range;
pub mod symbols;

// Re-export all public types
pub use frame::Frame;
pub use range::PcRange;
pub use symbols::{LocalVariable, SourceLocation, Subprogram, VariableKind};
