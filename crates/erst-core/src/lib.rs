//! # erst-core
//!
//! Debug-information extraction for compiled smart-contract modules.
//!
//! Given the raw bytes of a module, this crate recovers the function
//! boundaries, local variables and source positions recorded in its DWARF
//! sections, so that a trap address can be explained in source terms.
//!
//! ## Pipeline
//!
//! - [`container`]: sniff WASM / ELF / Mach-O / PE and locate `.debug_*` sections
//! - [`dwarf`]: decode abbreviation tables, debug entries and line programs
//! - [`symbols`]: the immutable [`DebugInfo`] model and its queries
//! - [`types`]: owned query results ([`Subprogram`], [`LocalVariable`], [`Frame`], ...)
//!
//! ## Input Handling
//!
//! Module bytes are untrusted. Every length read from the input is checked
//! against the bytes that remain, and a record that does not fit is skipped
//! rather than read out of bounds. Construction only fails when nothing at
//! all could be recovered.
//!
//! This crate does no I/O: callers read the module and pass the bytes in.

pub mod config;
pub mod container;
pub mod dwarf;
pub mod error;
pub mod prelude;
pub mod symbols;
pub mod types;

pub use config::DebugInfoConfig;
pub use container::{detect_format, extract_sections, Format, SectionSet};
pub use dwarf::location::decode_location;
// Re-export commonly used types
pub use error::{ErstError, ErstResult};
pub use symbols::DebugInfo;
pub use types::{Frame, LocalVariable, PcRange, SourceLocation, Subprogram, VariableKind};
