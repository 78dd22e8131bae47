//! Debug entries and the `.debug_info` decoder.
//!
//! Entries are stored in one arena in stream order. The tree structure is
//! recorded explicitly: every node carries its parent's offset and the
//! offsets of its children, both taken from the nesting of the stream.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use gimli::constants::{self, DwAt, DwTag};
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::abbrev::AbbreviationTable;
use super::form::{read_value, AttrValue, FormContext};
use super::line::LineTable;
use super::reader::{DecodeResult, MalformedEntry, Reader};
use super::DwarfSections;

/// Kind of a debug entry, reduced to the tags the query layer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag
{
    CompileUnit,
    Subprogram,
    Variable,
    FormalParameter,
    BaseType,
    PointerType,
    Typedef,
    StructType,
    UnionType,
    EnumerationType,
    Other(DwTag),
}

impl From<DwTag> for Tag
{
    fn from(tag: DwTag) -> Self
    {
        match tag {
            constants::DW_TAG_compile_unit => Tag::CompileUnit,
            constants::DW_TAG_subprogram => Tag::Subprogram,
            constants::DW_TAG_variable => Tag::Variable,
            constants::DW_TAG_formal_parameter => Tag::FormalParameter,
            constants::DW_TAG_base_type => Tag::BaseType,
            constants::DW_TAG_pointer_type => Tag::PointerType,
            constants::DW_TAG_typedef => Tag::Typedef,
            constants::DW_TAG_structure_type => Tag::StructType,
            constants::DW_TAG_union_type => Tag::UnionType,
            constants::DW_TAG_enumeration_type => Tag::EnumerationType,
            other => Tag::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute
{
    pub name: DwAt,
    pub value: AttrValue,
}

/// One decoded debug entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node
{
    /// `.debug_info` offset where the entry starts. Unique and stable.
    pub offset: u64,
    /// Index of the owning unit in `DebugInfo::units`.
    pub unit: usize,
    pub tag: Tag,
    pub attributes: SmallVec<[Attribute; 8]>,
    pub parent: Option<u64>,
    pub children: Vec<u64>,
}

impl Node
{
    pub fn attr(&self, name: DwAt) -> Option<&AttrValue>
    {
        self.attributes.iter().find(|attr| attr.name == name).map(|attr| &attr.value)
    }

    pub fn has_attr(&self, name: DwAt) -> bool
    {
        self.attr(name).is_some()
    }
}

/// Header fields and per-unit bases of one compilation unit.
#[derive(Debug, Clone)]
pub struct CompileUnit
{
    /// `.debug_info` offset of the unit header.
    pub offset: u64,
    pub version: u16,
    pub address_size: u8,
    /// 4 for 32-bit DWARF, 8 for 64-bit DWARF.
    pub offset_size: u8,
    /// Offset of the unit's first entry, if it decoded.
    pub root: Option<u64>,
    pub(crate) base_address: u64,
    pub(crate) addr_base: Option<u64>,
    pub(crate) str_offsets_base: Option<u64>,
    pub(crate) loclists_base: Option<u64>,
    pub(crate) comp_dir: Option<String>,
    pub(crate) line_table: Option<LineTable>,
}

impl CompileUnit
{
    pub fn line_table(&self) -> Option<&LineTable>
    {
        self.line_table.as_ref()
    }

    pub fn comp_dir(&self) -> Option<&str>
    {
        self.comp_dir.as_deref()
    }
}

/// The decoded node arena plus its offset index.
#[derive(Debug, Default)]
pub(crate) struct EntryArena
{
    pub units: Vec<CompileUnit>,
    pub nodes: Vec<Node>,
    pub index: HashMap<u64, usize>,
}

impl EntryArena
{
    pub fn node(&self, offset: u64) -> Option<&Node>
    {
        self.index.get(&offset).map(|&idx| &self.nodes[idx])
    }

    fn insert(&mut self, node: Node)
    {
        if let Some(parent) = node.parent.and_then(|p| self.index.get(&p).copied()) {
            self.nodes[parent].children.push(node.offset);
        }
        self.index.insert(node.offset, self.nodes.len());
        self.nodes.push(node);
    }
}

struct UnitHeader
{
    version: u16,
    address_size: u8,
    abbrev_offset: u64,
}

/// Split the next unit off `reader`: returns its offset size and a reader
/// over the unit body (everything after the length field).
pub(crate) fn next_unit<'a>(reader: &mut Reader<'a>) -> DecodeResult<(u8, Reader<'a>)>
{
    let (length, offset_size) = match reader.read_u32()? {
        0xffff_ffff => (reader.read_u64()?, 8),
        0xffff_fff0..=0xffff_fffe => return Err(reader.malformed("reserved unit length")),
        length => (u64::from(length), 4),
    };
    let length = usize::try_from(length).map_err(|_| reader.malformed("unit length exceeds address space"))?;
    let body = reader.split(length)?;
    Ok((offset_size, body))
}

fn parse_unit_header(body: &mut Reader<'_>, offset_size: u8) -> DecodeResult<UnitHeader>
{
    let version = body.read_u16()?;
    if !(2..=5).contains(&version) {
        return Err(body.malformed("unsupported DWARF version"));
    }

    let (address_size, abbrev_offset) = if version >= 5 {
        let unit_type = gimli::DwUt(body.read_u8()?);
        let address_size = body.read_u8()?;
        let abbrev_offset = body.read_offset(offset_size)?;
        match unit_type {
            constants::DW_UT_compile | constants::DW_UT_partial => {}
            constants::DW_UT_skeleton | constants::DW_UT_split_compile => {
                body.skip(8)?;
            }
            constants::DW_UT_type | constants::DW_UT_split_type => {
                body.skip(8)?;
                body.read_offset(offset_size)?;
            }
            _ => return Err(body.malformed("unsupported unit type")),
        }
        (address_size, abbrev_offset)
    } else {
        let abbrev_offset = body.read_offset(offset_size)?;
        (body.read_u8()?, abbrev_offset)
    };

    if !matches!(address_size, 1 | 2 | 4 | 8) {
        return Err(body.malformed("unsupported address size"));
    }

    Ok(UnitHeader {
        version,
        address_size,
        abbrev_offset,
    })
}

/// Decode every unit in `.debug_info`.
///
/// A unit whose header or abbreviation table is unreadable is skipped. A unit
/// whose entry stream breaks keeps the nodes decoded so far; decoding resumes
/// at the next unit, whose position is known from the length field.
pub(crate) fn decode_units(sections: &DwarfSections<'_>, max_depth: usize) -> EntryArena
{
    let mut arena = EntryArena::default();
    // Units commonly share one table; parse each offset once.
    let mut abbrev_tables: HashMap<u64, AbbreviationTable> = HashMap::new();
    let mut reader = Reader::new(sections.info, sections.endian);

    while !reader.is_empty() {
        let unit_offset = reader.section_offset() as u64;
        let (offset_size, mut body) = match next_unit(&mut reader) {
            Ok(unit) => unit,
            Err(err) => {
                warn!(unit_offset, %err, "stopping .debug_info scan at unreadable unit length");
                break;
            }
        };

        let header = match parse_unit_header(&mut body, offset_size) {
            Ok(header) => header,
            Err(err) => {
                debug!(unit_offset, %err, "skipping unit with unsupported header");
                continue;
            }
        };

        let abbrevs = match abbrev_tables.entry(header.abbrev_offset) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                match usize::try_from(header.abbrev_offset)
                    .map_err(|_| body.malformed("abbreviation offset out of range"))
                    .and_then(|offset| Reader::at(sections.abbrev, offset, sections.endian))
                    .and_then(|mut abbrev_reader| AbbreviationTable::parse(&mut abbrev_reader))
                {
                    Ok(table) => entry.insert(table),
                    Err(err) => {
                        warn!(unit_offset, %err, "skipping unit with unreadable abbreviation table");
                        continue;
                    }
                }
            }
        };

        let ctx = FormContext {
            version: header.version,
            address_size: header.address_size,
            offset_size,
            unit_offset,
            debug_str: sections.str,
            debug_line_str: sections.line_str,
        };

        let unit_index = arena.units.len();
        arena.units.push(CompileUnit {
            offset: unit_offset,
            version: header.version,
            address_size: header.address_size,
            offset_size,
            root: None,
            base_address: 0,
            addr_base: None,
            str_offsets_base: None,
            loclists_base: None,
            comp_dir: None,
            line_table: None,
        });

        let before = arena.nodes.len();
        if let Err(err) = decode_entries(&mut body, unit_index, abbrevs, &ctx, max_depth, &mut arena) {
            warn!(unit_offset, %err, "abandoning remainder of malformed unit");
        }
        debug!(
            unit_offset,
            version = header.version,
            nodes = arena.nodes.len() - before,
            "decoded compilation unit"
        );
    }

    arena
}

fn decode_entries(
    body: &mut Reader<'_>,
    unit_index: usize,
    abbrevs: &AbbreviationTable,
    ctx: &FormContext<'_>,
    max_depth: usize,
    arena: &mut EntryArena,
) -> DecodeResult<()>
{
    // Open parents; `None` marks an entry that was skipped, whose children
    // attach to the nearest decoded ancestor instead.
    let mut stack: Vec<Option<u64>> = Vec::new();
    let mut first = true;

    while !body.is_empty() {
        let offset = body.section_offset() as u64;
        let code = body.read_uleb128()?;
        if code == 0 {
            stack.pop();
            continue;
        }

        let abbrev = abbrevs
            .get(code)
            .ok_or_else(|| body.malformed("unknown abbreviation code"))?;

        let mut attributes = SmallVec::new();
        let mut skipped: Option<MalformedEntry> = None;
        for spec in &abbrev.attributes {
            match read_value(body, spec.form, spec.implicit_const, ctx) {
                Ok(value) => attributes.push(Attribute { name: spec.name, value }),
                Err(err) if err.resumable => {
                    skipped.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }

        let parent = stack.iter().rev().flatten().next().copied();
        let decoded = match skipped {
            Some(err) => {
                debug!(offset, %err, "skipping malformed debug entry");
                None
            }
            None => {
                if first {
                    arena.units[unit_index].root = Some(offset);
                }
                arena.insert(Node {
                    offset,
                    unit: unit_index,
                    tag: Tag::from(abbrev.tag),
                    attributes,
                    parent,
                    children: Vec::new(),
                });
                Some(offset)
            }
        };
        first = false;

        if abbrev.has_children {
            if stack.len() >= max_depth {
                return Err(body.malformed("entry nesting exceeds configured depth"));
            }
            stack.push(decoded);
        }
    }
    Ok(())
}
