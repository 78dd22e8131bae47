//! Function, variable and source location types.

use std::fmt;

use super::PcRange;

/// A function recovered from a `DW_TAG_subprogram` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subprogram
{
    /// `.debug_info` offset of the entry.
    pub offset: u64,
    pub name: String,
    /// `DW_AT_linkage_name` (or `DW_AT_MIPS_linkage_name`), if present.
    pub linkage_name: Option<String>,
    /// Output of the configured demangler; equals the raw name by default.
    pub demangled_name: String,
    /// First address of the function.
    pub low_pc: u64,
    /// One past the last address, always absolute.
    pub high_pc: u64,
    pub decl_file: Option<String>,
    pub decl_line: Option<u64>,
    /// Variables and parameters declared directly inside the function.
    pub local_variables: Vec<LocalVariable>,
}

impl Subprogram
{
    pub fn range(&self) -> PcRange
    {
        PcRange::new(self.low_pc, self.high_pc)
    }

    pub fn contains(&self, address: u64) -> bool
    {
        self.range().contains(address)
    }

    /// Demangled name, or the raw name when demangling produced nothing.
    pub fn display_name(&self) -> &str
    {
        if self.demangled_name.is_empty() {
            &self.name
        } else {
            &self.demangled_name
        }
    }
}

/// Whether a variable is a local or a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind
{
    Local,
    Parameter,
}

impl fmt::Display for VariableKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            VariableKind::Local => "local",
            VariableKind::Parameter => "param",
        };
        write!(f, "{label}")
    }
}

/// A variable or formal parameter owned by a subprogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable
{
    /// `.debug_info` offset of the entry.
    pub offset: u64,
    pub name: String,
    pub demangled_name: String,
    /// Resolved type name, `"unknown"` when it cannot be resolved.
    pub type_name: String,
    /// Decoded leading opcode of the location expression; empty if none.
    pub location: String,
    pub kind: VariableKind,
    /// Source line of the declaration. Informational only.
    pub decl_line: Option<u64>,
    /// Address ranges over which the variable's location is meaningful.
    pub validity: Vec<PcRange>,
}

impl LocalVariable
{
    /// Whether the variable is live at `address`.
    pub fn is_live_at(&self, address: u64) -> bool
    {
        self.validity.iter().any(|range| range.contains(address))
    }
}

/// Source position of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    /// Path as recorded in the line table, joined with its directory.
    pub file: String,
    /// 1-based line.
    pub line: u64,
    /// 1-based column; 0 when the producer did not record one.
    pub column: u64,
}

impl fmt::Display for SourceLocation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.file, self.line)?;
        if self.column != 0 {
            write!(f, ":{}", self.column)?;
        }
        Ok(())
    }
}
