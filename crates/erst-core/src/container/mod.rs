//! # Container Formats
//!
//! Sniffs the container format of a module and maps debug section names to
//! byte ranges of the original buffer.
//!
//! ## Supported Containers
//!
//! - **WASM**: debug sections travel as custom sections named `.debug_*`
//! - **ELF / Mach-O / PE**: section tables are walked with the `object` crate
//!
//! Ranges always point into the caller's buffer; nothing is copied.

mod native;
mod wasm;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use gimli::RunTimeEndian;

use crate::error::{ErstError, ErstResult};

/// Container format of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format
{
    Wasm,
    Elf,
    MachO,
    Pe,
}

impl fmt::Display for Format
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            Format::Wasm => "wasm",
            Format::Elf => "elf",
            Format::MachO => "macho",
            Format::Pe => "pe",
        };
        f.write_str(name)
    }
}

const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];
const MACHO_MAGIC_64: u32 = 0xfeed_facf;
const PE_MAGIC: u16 = 0x5a4d;

/// Identify the container from its leading magic bytes.
///
/// Checked in order: WASM, ELF, 64-bit Mach-O (either byte order), PE.
pub fn detect_format(data: &[u8]) -> ErstResult<Format>
{
    let Some(magic) = data.first_chunk::<4>() else {
        return Err(ErstError::InvalidBinary(format!(
            "buffer of {} bytes is too short to carry a magic number",
            data.len()
        )));
    };

    if *magic == WASM_MAGIC {
        return Ok(Format::Wasm);
    }
    if *magic == ELF_MAGIC {
        return Ok(Format::Elf);
    }
    if u32::from_be_bytes(*magic) == MACHO_MAGIC_64 || u32::from_le_bytes(*magic) == MACHO_MAGIC_64 {
        return Ok(Format::MachO);
    }
    if u16::from_le_bytes([magic[0], magic[1]]) == PE_MAGIC {
        return Ok(Format::Pe);
    }

    Err(ErstError::InvalidBinary(format!(
        "unrecognized magic {:02x} {:02x} {:02x} {:02x}",
        magic[0], magic[1], magic[2], magic[3]
    )))
}

/// Debug section names mapped to byte ranges of the module buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSet
{
    endian: RunTimeEndian,
    ranges: BTreeMap<String, Range<usize>>,
}

impl SectionSet
{
    pub(crate) fn new(endian: RunTimeEndian) -> Self
    {
        Self {
            endian,
            ranges: BTreeMap::new(),
        }
    }

    /// Record a section; a later section with the same name replaces it.
    pub(crate) fn insert(&mut self, name: impl Into<String>, range: Range<usize>)
    {
        self.ranges.insert(name.into(), range);
    }

    pub fn get(&self, name: &str) -> Option<Range<usize>>
    {
        self.ranges.get(name).cloned()
    }

    /// Bytes of section `name` within `data`, the buffer the set was built from.
    pub fn slice<'a>(&self, data: &'a [u8], name: &str) -> Option<&'a [u8]>
    {
        self.ranges.get(name).and_then(|range| data.get(range.clone()))
    }

    pub fn contains(&self, name: &str) -> bool
    {
        self.ranges.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str>
    {
        self.ranges.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize
    {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.ranges.is_empty()
    }

    /// Byte order of the container; WASM is always little-endian.
    pub fn endian(&self) -> RunTimeEndian
    {
        self.endian
    }

    /// Whether the sections the entry decoder cannot work without are present.
    pub fn has_required_debug_sections(&self) -> bool
    {
        self.contains(".debug_info") && self.contains(".debug_abbrev")
    }
}

/// Collect the debug sections of `data`, which must be in `format`.
pub fn extract_sections(data: &[u8], format: Format) -> ErstResult<SectionSet>
{
    match format {
        Format::Wasm => Ok(wasm::extract(data)),
        Format::Elf | Format::MachO | Format::Pe => native::extract(data),
    }
}
