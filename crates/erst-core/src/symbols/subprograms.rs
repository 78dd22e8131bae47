//! Subprogram and local-variable views over the node arena.

use gimli::constants::{self, DwAt};
use tracing::debug;

use super::DebugInfo;
use crate::dwarf::entry::{Node, Tag};
use crate::dwarf::form::AttrValue;
use crate::dwarf::location::{decode_location, parse_location_list, ListRef};
use crate::dwarf::{resolve_address, resolve_string};
use crate::types::{LocalVariable, PcRange, Subprogram, VariableKind};

impl DebugInfo
{
    pub(super) fn collect_subprograms(&self) -> Vec<Subprogram>
    {
        let subprograms: Vec<_> = self
            .nodes
            .iter()
            .filter(|node| node.tag == Tag::Subprogram)
            .map(|node| self.build_subprogram(node))
            .collect();
        debug!(count = subprograms.len(), "collected subprograms");
        subprograms
    }

    fn build_subprogram(&self, node: &Node) -> Subprogram
    {
        let name = self.attr_string(node, constants::DW_AT_name).unwrap_or_default();
        let linkage_name = self
            .attr_string(node, constants::DW_AT_linkage_name)
            .or_else(|| self.attr_string(node, constants::DW_AT_MIPS_linkage_name));
        let demangled_name = self.config.demangle(linkage_name.as_deref().unwrap_or(&name));

        let (low_pc, high_pc) = self.pc_bounds(node);
        let decl_file = self.decl_file(node);
        let decl_line = self
            .inherited_attr(node, constants::DW_AT_decl_line)
            .and_then(|(_, value)| value.as_u64());

        let range = PcRange::new(low_pc, high_pc);
        let local_variables = self
            .children(node.offset)
            .filter(|child| matches!(child.tag, Tag::Variable | Tag::FormalParameter))
            .filter_map(|child| self.build_variable(child, range))
            .collect();

        Subprogram {
            offset: node.offset,
            name,
            linkage_name,
            demangled_name,
            low_pc,
            high_pc,
            decl_file,
            decl_line,
            local_variables,
        }
    }

    /// `[low_pc, high_pc)` with a constant-class `high_pc` treated as a length.
    fn pc_bounds(&self, node: &Node) -> (u64, u64)
    {
        let unit = self.unit_of(node);
        let view = self.section_view();
        let low_pc = node
            .attr(constants::DW_AT_low_pc)
            .and_then(|value| resolve_address(&view, unit, value))
            .unwrap_or(0);
        let high_pc = match node.attr(constants::DW_AT_high_pc) {
            Some(value) if value.is_constant() => low_pc.wrapping_add(value.as_u64().unwrap_or(0)),
            Some(value) => resolve_address(&view, unit, value).unwrap_or(low_pc),
            None => low_pc,
        };
        (low_pc, high_pc)
    }

    fn decl_file(&self, node: &Node) -> Option<String>
    {
        let (owner, value) = self.inherited_attr(node, constants::DW_AT_decl_file)?;
        match value {
            AttrValue::String(path) => Some(path.clone()),
            value => {
                let index = value.as_u64()?;
                let table = self.unit_of(owner).line_table()?;
                table.file_name(index).map(str::to_owned)
            }
        }
    }

    fn build_variable(&self, node: &Node, scope: PcRange) -> Option<LocalVariable>
    {
        let name = self.attr_string(node, constants::DW_AT_name).filter(|name| !name.is_empty())?;
        let demangled_name = self.config.demangle(&name);

        let type_name = self
            .inherited_attr(node, constants::DW_AT_type)
            .and_then(|(_, value)| value.as_reference())
            .map_or_else(|| "unknown".to_string(), |offset| self.resolve_type_name(offset));

        let (location, validity) = match node.attr(constants::DW_AT_location) {
            Some(AttrValue::Block(expr)) => (decode_location(expr), vec![scope]),
            Some(AttrValue::SectionOffset(offset)) => self.location_list(node, ListRef::Offset(*offset)),
            Some(AttrValue::Udata(value)) if self.unit_of(node).version >= 5 => {
                self.location_list(node, ListRef::Index(*value))
            }
            Some(AttrValue::Udata(offset)) => self.location_list(node, ListRef::Offset(*offset)),
            _ => (String::new(), vec![scope]),
        };

        let kind = if node.tag == Tag::FormalParameter {
            VariableKind::Parameter
        } else {
            VariableKind::Local
        };

        Some(LocalVariable {
            offset: node.offset,
            name,
            demangled_name,
            type_name,
            location,
            kind,
            decl_line: node.attr(constants::DW_AT_decl_line).and_then(AttrValue::as_u64),
            validity,
        })
    }

    /// Location string and validity ranges of a location-list variable.
    ///
    /// A list that cannot be decoded leaves the variable with no validity.
    fn location_list(&self, node: &Node, list: ListRef) -> (String, Vec<PcRange>)
    {
        let unit = self.unit_of(node);
        match parse_location_list(&self.section_view(), list, &unit.list_context()) {
            Ok(entries) => {
                let location = entries.first().map(|entry| decode_location(&entry.expr)).unwrap_or_default();
                (location, entries.into_iter().map(|entry| entry.range).collect())
            }
            Err(err) => {
                debug!(offset = node.offset, %err, "unreadable location list");
                (String::new(), Vec::new())
            }
        }
    }

    /// Attribute of `node`, or of the declaration / abstract instance it
    /// points at. Returns the node that actually carries the attribute.
    pub(super) fn inherited_attr<'a>(&'a self, node: &'a Node, name: DwAt) -> Option<(&'a Node, &'a AttrValue)>
    {
        let limit = self.config.max_type_depth.min(self.nodes().len());
        let mut current = node;
        for _ in 0..=limit {
            if let Some(value) = current.attr(name) {
                return Some((current, value));
            }
            let next = current
                .attr(constants::DW_AT_specification)
                .or_else(|| current.attr(constants::DW_AT_abstract_origin))
                .and_then(AttrValue::as_reference)?;
            current = self.node(next)?;
        }
        None
    }

    /// String attribute, following specification / abstract-origin links
    /// and resolving `strx` indices.
    pub(super) fn attr_string(&self, node: &Node, name: DwAt) -> Option<String>
    {
        let (owner, value) = self.inherited_attr(node, name)?;
        resolve_string(&self.section_view(), self.unit_of(owner), value)
    }
}
