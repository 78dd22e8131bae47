//! # DWARF Decoding
//!
//! A self-contained reader for the parts of DWARF the query layer needs:
//!
//! - [`abbrev`]: per-unit abbreviation tables
//! - [`form`]: attribute values for every DWARF 2-5 form
//! - [`entry`]: unit headers and the flat entry stream, rebuilt into a tree
//! - [`line`]: line-number program replay
//! - [`location`]: location expressions and location lists
//!
//! `gimli` supplies the constant tables and the endianness abstraction; the
//! decoding itself lives here so that malformed input can be skipped record
//! by record instead of failing a whole section.

pub mod abbrev;
pub mod entry;
pub mod form;
pub mod line;
pub mod location;
pub(crate) mod reader;

use gimli::constants;
use gimli::RunTimeEndian;
use tracing::debug;

use crate::container::SectionSet;
use entry::{CompileUnit, EntryArena};
use form::AttrValue;
use line::LineTable;
use location::{resolve_addrx, ListContext};
use reader::{string_at, DecodeResult, Reader};

/// Borrowed view of every debug section the decoder reads.
///
/// Missing sections are empty slices.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DwarfSections<'a>
{
    pub info: &'a [u8],
    pub abbrev: &'a [u8],
    pub str: &'a [u8],
    pub line_str: &'a [u8],
    pub line: &'a [u8],
    pub loc: &'a [u8],
    pub loclists: &'a [u8],
    pub addr: &'a [u8],
    pub str_offsets: &'a [u8],
    pub endian: RunTimeEndian,
}

impl<'a> DwarfSections<'a>
{
    pub fn new(data: &'a [u8], sections: &SectionSet) -> Self
    {
        let get = |name| sections.slice(data, name).unwrap_or_default();
        Self {
            info: get(".debug_info"),
            abbrev: get(".debug_abbrev"),
            str: get(".debug_str"),
            line_str: get(".debug_line_str"),
            line: get(".debug_line"),
            loc: get(".debug_loc"),
            loclists: get(".debug_loclists"),
            addr: get(".debug_addr"),
            str_offsets: get(".debug_str_offsets"),
            endian: sections.endian(),
        }
    }
}

/// Decode every unit, then fill in the per-unit bases and line tables that
/// hang off each unit's root entry.
pub(crate) fn decode(sections: &DwarfSections<'_>, max_nesting_depth: usize, line_tables: bool) -> EntryArena
{
    let mut arena = entry::decode_units(sections, max_nesting_depth);
    for idx in 0..arena.units.len() {
        attach_unit_attributes(sections, &mut arena, idx, line_tables);
    }
    arena
}

fn attach_unit_attributes(sections: &DwarfSections<'_>, arena: &mut EntryArena, idx: usize, line_tables: bool)
{
    let Some(root) = arena.units[idx].root.and_then(|offset| arena.node(offset)).cloned() else {
        return;
    };
    let base_of = |name| root.attr(name).and_then(AttrValue::as_u64);

    let unit = &mut arena.units[idx];
    unit.addr_base = base_of(constants::DW_AT_addr_base).or_else(|| base_of(constants::DW_AT_GNU_addr_base));
    unit.str_offsets_base = base_of(constants::DW_AT_str_offsets_base);
    unit.loclists_base = base_of(constants::DW_AT_loclists_base);

    let comp_dir = root
        .attr(constants::DW_AT_comp_dir)
        .and_then(|value| resolve_string(sections, unit, value));
    let base_address = root
        .attr(constants::DW_AT_low_pc)
        .and_then(|value| resolve_address(sections, unit, value))
        .unwrap_or(0);
    unit.comp_dir = comp_dir;
    unit.base_address = base_address;

    if !line_tables {
        return;
    }
    if let Some(offset) = root.attr(constants::DW_AT_stmt_list).and_then(AttrValue::as_u64) {
        match LineTable::parse(sections, offset, unit.address_size, unit.comp_dir.as_deref()) {
            Ok(table) => unit.line_table = Some(table),
            Err(err) => debug!(unit_offset = unit.offset, %err, "skipping unreadable line table"),
        }
    }
}

impl CompileUnit
{
    pub(crate) fn list_context(&self) -> ListContext
    {
        ListContext {
            version: self.version,
            address_size: self.address_size,
            offset_size: self.offset_size,
            base_address: self.base_address,
            addr_base: self.addr_base,
            loclists_base: self.loclists_base,
        }
    }
}

/// Entry `index` of the unit's `.debug_str_offsets` contribution.
fn resolve_strx(sections: &DwarfSections<'_>, unit: &CompileUnit, index: u64) -> DecodeResult<String>
{
    // Without an explicit base, skip the DWARF 5 contribution header.
    let base = unit.str_offsets_base.unwrap_or(if unit.version >= 5 { 8 } else { 0 });
    let slot = base.wrapping_add(index.wrapping_mul(u64::from(unit.offset_size)));
    let mut reader = Reader::at(sections.str_offsets, usize::try_from(slot).unwrap_or(usize::MAX), sections.endian)?;
    let offset = reader.read_offset(unit.offset_size)?;
    string_at(sections.str, offset)
}

/// String value of an attribute, resolving `strx` indices.
pub(crate) fn resolve_string(sections: &DwarfSections<'_>, unit: &CompileUnit, value: &AttrValue) -> Option<String>
{
    match value {
        AttrValue::String(s) => Some(s.clone()),
        AttrValue::StringIndex(index) => resolve_strx(sections, unit, *index).ok(),
        _ => None,
    }
}

/// Address value of an attribute, resolving `addrx` indices.
pub(crate) fn resolve_address(sections: &DwarfSections<'_>, unit: &CompileUnit, value: &AttrValue) -> Option<u64>
{
    match *value {
        AttrValue::Address(addr) => Some(addr),
        AttrValue::AddressIndex(index) => resolve_addrx(sections, &unit.list_context(), index).ok(),
        _ => None,
    }
}
