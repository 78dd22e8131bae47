//! # Symbols
//!
//! [`DebugInfo`] is the decoded, immutable model of one module's debug
//! information and the entry point for every query.
//!
//! ## Lifecycle
//!
//! 1. Sniff the container and collect its `.debug_*` sections
//! 2. Decode every compilation unit into one node arena, indexed by offset
//! 3. Replay each unit's line-number program
//!
//! After construction nothing is mutated except the lazily derived
//! subprogram list, which is computed once behind a `OnceCell`. `DebugInfo`
//! is `Send + Sync`, so queries may run from several threads at once.
//!
//! ## Example
//!
//! ```rust,no_run
//! use erst_core::symbols::DebugInfo;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("contract.wasm")?;
//! let info = DebugInfo::parse(bytes)?;
//! for function in info.list_subprograms() {
//!     println!("{} [{:#x}, {:#x})", function.display_name(), function.low_pc, function.high_pc);
//! }
//! let frame = info.explain(0x2a, 0, 0)?;
//! println!("{}", frame.function);
//! # Ok(())
//! # }
//! ```

pub mod demangle;
mod lookup;
mod subprograms;
mod type_name;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::config::DebugInfoConfig;
use crate::container::{detect_format, extract_sections, Format, SectionSet};
use crate::dwarf::entry::{CompileUnit, EntryArena, Node};
use crate::dwarf::{self, DwarfSections};
use crate::error::{ErstError, ErstResult};
use crate::types::Subprogram;

/// Decoded debug information of one module.
pub struct DebugInfo
{
    data: Arc<[u8]>,
    format: Format,
    sections: SectionSet,
    units: Vec<CompileUnit>,
    nodes: Vec<Node>,
    /// Node offset to its position in `nodes`.
    index: HashMap<u64, usize>,
    config: DebugInfoConfig,
    subprograms: OnceCell<Vec<Subprogram>>,
}

impl DebugInfo
{
    /// Load a module with the default configuration.
    ///
    /// ## Errors
    ///
    /// - [`ErstError::InvalidBinary`] if the container is not recognized
    /// - [`ErstError::NoDebugInfo`] if `.debug_info`/`.debug_abbrev` are
    ///   missing or no entry decodes
    pub fn parse(data: impl Into<Arc<[u8]>>) -> ErstResult<Self>
    {
        Self::parse_with_config(data, DebugInfoConfig::default())
    }

    pub fn parse_with_config(data: impl Into<Arc<[u8]>>, config: DebugInfoConfig) -> ErstResult<Self>
    {
        config.validate()?;
        let data = data.into();

        let format = detect_format(&data)?;
        let sections = extract_sections(&data, format)?;
        debug!(%format, sections = sections.len(), "extracted debug sections");
        if !sections.has_required_debug_sections() {
            return Err(ErstError::NoDebugInfo);
        }

        let EntryArena { units, nodes, index } = {
            let view = DwarfSections::new(&data, &sections);
            dwarf::decode(&view, config.max_nesting_depth, config.line_tables)
        };
        if nodes.is_empty() {
            return Err(ErstError::NoDebugInfo);
        }

        info!(%format, units = units.len(), nodes = nodes.len(), "loaded debug information");
        Ok(Self {
            data,
            format,
            sections,
            units,
            nodes,
            index,
            config,
            subprograms: OnceCell::new(),
        })
    }

    /// Always `true` for a constructed model; construction fails with
    /// `NoDebugInfo` otherwise.
    pub fn has_debug_info(&self) -> bool
    {
        !self.nodes.is_empty()
    }

    pub fn binary_type(&self) -> Format
    {
        self.format
    }

    pub fn sections(&self) -> &SectionSet
    {
        &self.sections
    }

    pub fn units(&self) -> &[CompileUnit]
    {
        &self.units
    }

    pub fn config(&self) -> &DebugInfoConfig
    {
        &self.config
    }

    /// Entry starting at `.debug_info` offset `offset`.
    pub fn node(&self, offset: u64) -> Option<&Node>
    {
        self.index.get(&offset).map(|&idx| &self.nodes[idx])
    }

    /// All decoded entries in stream order.
    pub fn nodes(&self) -> &[Node]
    {
        &self.nodes
    }

    /// Direct children of the entry at `offset`, in stream order.
    pub fn children(&self, offset: u64) -> impl Iterator<Item = &Node>
    {
        self.node(offset)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&child| self.node(child))
    }

    /// Every function in entry order. Computed on first use.
    pub fn list_subprograms(&self) -> &[Subprogram]
    {
        self.subprograms.get_or_init(|| self.collect_subprograms())
    }

    fn section_view(&self) -> DwarfSections<'_>
    {
        DwarfSections::new(&self.data, &self.sections)
    }

    fn unit_of(&self, node: &Node) -> &CompileUnit
    {
        &self.units[node.unit]
    }
}

impl std::fmt::Debug for DebugInfo
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DebugInfo")
            .field("format", &self.format)
            .field("sections", &self.sections.len())
            .field("units", &self.units.len())
            .field("nodes", &self.nodes.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
