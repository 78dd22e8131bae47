//! Common module for library exports

pub use crate::config::{DebugInfoConfig, Demangler};
pub use crate::container::{Format, SectionSet};
pub use crate::error::{ErstError, ErstResult};
pub use crate::symbols::demangle::{identity, rust_demangle};
pub use crate::symbols::DebugInfo;
pub use crate::types::{Frame, LocalVariable, PcRange, SourceLocation, Subprogram, VariableKind};
