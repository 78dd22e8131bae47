//! Line-number programs (`.debug_line`).
//!
//! ## Layout
//!
//! Each compilation unit points at one program through `DW_AT_stmt_list`. The
//! program header declares the special-opcode parameters and the file table;
//! the opcode stream that follows is replayed here into address-ordered rows.
//!
//! ## Failure Handling
//!
//! An unreadable header rejects the whole table. An opcode stream that breaks
//! part way keeps every row emitted so far.

use gimli::constants::{self, DwForm, DwLnct, DwLne, DwLns};
use tracing::debug;

use super::entry::next_unit;
use super::form::{read_value, AttrValue, FormContext};
use super::reader::{DecodeResult, Reader};
use super::DwarfSections;

/// One emitted row of the line-number matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRow
{
    pub address: u64,
    /// File register as encoded; see [`LineTable::file_name`].
    pub file: u64,
    pub line: u64,
    pub column: u64,
    pub is_stmt: bool,
}

/// Rows up to (not including) one end-of-sequence marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSequence
{
    pub rows: Vec<LineRow>,
    /// Address of the end-of-sequence marker; `None` if the program stopped
    /// before terminating this sequence.
    pub end_address: Option<u64>,
}

impl LineSequence
{
    /// Statement row with the greatest address not above `address`.
    pub fn lookup(&self, address: u64) -> Option<&LineRow>
    {
        if self.end_address.is_some_and(|end| address >= end) {
            return None;
        }
        self.rows
            .iter()
            .filter(|row| row.is_stmt && row.address <= address)
            .max_by_key(|row| row.address)
    }
}

/// Decoded line table of one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable
{
    pub version: u16,
    /// Resolved file paths in declaration order.
    files: Vec<String>,
    /// DWARF 2-4 include directories, kept for `DW_LNE_define_file`.
    include_directories: Vec<String>,
    /// File register value of `files[0]`: 1 before DWARF 5, 0 from DWARF 5.
    file_base: u64,
    sequences: Vec<LineSequence>,
}

impl LineTable
{
    pub fn sequences(&self) -> &[LineSequence]
    {
        &self.sequences
    }

    pub fn files(&self) -> &[String]
    {
        &self.files
    }

    /// Path for a file register / `DW_AT_decl_file` value.
    pub fn file_name(&self, index: u64) -> Option<&str>
    {
        let slot = index.checked_sub(self.file_base)?;
        self.files.get(usize::try_from(slot).ok()?).map(String::as_str)
    }

    /// First sequence row covering `address`.
    pub fn lookup(&self, address: u64) -> Option<&LineRow>
    {
        self.sequences.iter().find_map(|seq| seq.lookup(address))
    }

    /// Decode the program at `offset` in `.debug_line`.
    pub(crate) fn parse(
        sections: &DwarfSections<'_>,
        offset: u64,
        address_size: u8,
        comp_dir: Option<&str>,
    ) -> DecodeResult<Self>
    {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let mut reader = Reader::at(sections.line, offset, sections.endian)?;
        let (offset_size, mut unit) = next_unit(&mut reader)?;

        let version = unit.read_u16()?;
        if !(2..=5).contains(&version) {
            return Err(unit.malformed("unsupported line table version"));
        }
        let address_size = if version >= 5 {
            let size = unit.read_u8()?;
            unit.read_u8()?; // segment selector size
            size
        } else {
            address_size
        };

        let header_length = unit.read_offset(offset_size)?;
        let header_length =
            usize::try_from(header_length).map_err(|_| unit.malformed("header length exceeds address space"))?;
        let mut header = unit.split(header_length)?;
        let program = unit;

        let minimum_instruction_length = header.read_u8()?;
        let maximum_operations_per_instruction = if version >= 4 { header.read_u8()?.max(1) } else { 1 };
        let default_is_stmt = header.read_u8()? != 0;
        let line_base = header.read_i8()?;
        let line_range = header.read_u8()?;
        if line_range == 0 {
            return Err(header.malformed("line_range of zero"));
        }
        let opcode_base = header.read_u8()?;
        let standard_opcode_lengths = header.read_bytes(usize::from(opcode_base.saturating_sub(1)))?.to_vec();

        let ctx = FormContext {
            version,
            address_size,
            offset_size,
            unit_offset: 0,
            debug_str: sections.str,
            debug_line_str: sections.line_str,
        };

        let (files, include_directories, file_base) = if version >= 5 {
            (parse_v5_file_table(&mut header, &ctx, comp_dir)?, Vec::new(), 0)
        } else {
            let (files, directories) = parse_legacy_file_table(&mut header, comp_dir)?;
            (files, directories, 1)
        };

        let mut table = LineTable {
            version,
            files,
            include_directories,
            file_base,
            sequences: Vec::new(),
        };
        let params = ProgramParams {
            address_size,
            minimum_instruction_length,
            maximum_operations_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
        };
        if let Err(err) = table.run(program, &params, comp_dir) {
            debug!(offset, %err, "line program ended early, keeping rows decoded so far");
        }
        Ok(table)
    }

    fn run(&mut self, mut program: Reader<'_>, params: &ProgramParams, comp_dir: Option<&str>) -> DecodeResult<()>
    {
        let mut sequence = LineSequence::default();
        let result = self.replay(&mut program, params, comp_dir, &mut sequence);
        if !sequence.rows.is_empty() {
            self.sequences.push(sequence);
        }
        result
    }

    fn replay(
        &mut self,
        program: &mut Reader<'_>,
        params: &ProgramParams,
        comp_dir: Option<&str>,
        sequence: &mut LineSequence,
    ) -> DecodeResult<()>
    {
        let mut state = LineState::new(params.default_is_stmt);

        while !program.is_empty() {
            let opcode = program.read_u8()?;
            if opcode >= params.opcode_base {
                let adjusted = opcode - params.opcode_base;
                state.advance(u64::from(adjusted / params.line_range), params);
                let delta = i64::from(params.line_base) + i64::from(adjusted % params.line_range);
                state.line = state.line.wrapping_add_signed(delta);
                sequence.rows.push(state.row());
            } else if opcode == 0 {
                let len = program.read_uleb_len()?;
                let mut ext = program.split(len)?;
                match DwLne(ext.read_u8()?) {
                    constants::DW_LNE_end_sequence => {
                        sequence.end_address = Some(state.address);
                        self.sequences.push(std::mem::take(sequence));
                        state = LineState::new(params.default_is_stmt);
                    }
                    constants::DW_LNE_set_address => {
                        let width = u8::try_from(ext.remaining_len()).unwrap_or(params.address_size);
                        state.address = ext.read_uint(width)?;
                        state.op_index = 0;
                    }
                    constants::DW_LNE_define_file => {
                        let name = String::from_utf8_lossy(ext.read_cstr()?).into_owned();
                        let dir = ext.read_uleb128()?;
                        let path = join_path(&[comp_dir, legacy_directory(&self.include_directories, dir)], &name);
                        self.files.push(path);
                    }
                    // set_discriminator and vendor extensions carry nothing we keep.
                    _ => {}
                }
            } else {
                match DwLns(opcode) {
                    constants::DW_LNS_copy => sequence.rows.push(state.row()),
                    constants::DW_LNS_advance_pc => {
                        let adv = program.read_uleb128()?;
                        state.advance(adv, params);
                    }
                    constants::DW_LNS_advance_line => {
                        let delta = program.read_sleb128()?;
                        state.line = state.line.wrapping_add_signed(delta);
                    }
                    constants::DW_LNS_set_file => state.file = program.read_uleb128()?,
                    constants::DW_LNS_set_column => state.column = program.read_uleb128()?,
                    constants::DW_LNS_negate_stmt => state.is_stmt = !state.is_stmt,
                    constants::DW_LNS_set_basic_block
                    | constants::DW_LNS_set_prologue_end
                    | constants::DW_LNS_set_epilogue_begin => {}
                    constants::DW_LNS_const_add_pc => {
                        let adjusted = 255 - params.opcode_base;
                        state.advance(u64::from(adjusted / params.line_range), params);
                    }
                    constants::DW_LNS_fixed_advance_pc => {
                        state.address = state.address.wrapping_add(u64::from(program.read_u16()?));
                        state.op_index = 0;
                    }
                    constants::DW_LNS_set_isa => {
                        program.read_uleb128()?;
                    }
                    _ => {
                        let operands = params.standard_opcode_lengths[usize::from(opcode - 1)];
                        for _ in 0..operands {
                            program.read_uleb128()?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

struct ProgramParams
{
    address_size: u8,
    minimum_instruction_length: u8,
    maximum_operations_per_instruction: u8,
    default_is_stmt: bool,
    line_base: i8,
    line_range: u8,
    opcode_base: u8,
    standard_opcode_lengths: Vec<u8>,
}

/// State-machine registers.
struct LineState
{
    address: u64,
    op_index: u64,
    file: u64,
    line: u64,
    column: u64,
    is_stmt: bool,
}

impl LineState
{
    fn new(default_is_stmt: bool) -> Self
    {
        Self {
            address: 0,
            op_index: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
        }
    }

    fn advance(&mut self, operation_advance: u64, params: &ProgramParams)
    {
        let min_len = u64::from(params.minimum_instruction_length);
        let max_ops = u64::from(params.maximum_operations_per_instruction);
        if max_ops == 1 {
            self.address = self.address.wrapping_add(min_len.wrapping_mul(operation_advance));
        } else {
            let ops = self.op_index.wrapping_add(operation_advance);
            self.address = self.address.wrapping_add(min_len.wrapping_mul(ops / max_ops));
            self.op_index = ops % max_ops;
        }
    }

    fn row(&self) -> LineRow
    {
        LineRow {
            address: self.address,
            file: self.file,
            line: self.line,
            column: self.column,
            is_stmt: self.is_stmt,
        }
    }
}

/// `include_directories` and `file_names` of a DWARF 2-4 header.
fn parse_legacy_file_table(
    header: &mut Reader<'_>,
    comp_dir: Option<&str>,
) -> DecodeResult<(Vec<String>, Vec<String>)>
{
    let mut directories = Vec::new();
    loop {
        let dir = header.read_cstr()?;
        if dir.is_empty() {
            break;
        }
        directories.push(String::from_utf8_lossy(dir).into_owned());
    }

    let mut files = Vec::new();
    loop {
        let name = header.read_cstr()?;
        if name.is_empty() {
            break;
        }
        let name = String::from_utf8_lossy(name).into_owned();
        let dir_index = header.read_uleb128()?;
        header.read_uleb128()?; // modification time
        header.read_uleb128()?; // length
        files.push(join_path(&[comp_dir, legacy_directory(&directories, dir_index)], &name));
    }
    Ok((files, directories))
}

/// Directory index 0 is the compilation directory itself.
fn legacy_directory(directories: &[String], index: u64) -> Option<&str>
{
    let slot = usize::try_from(index).ok()?.checked_sub(1)?;
    directories.get(slot).map(String::as_str)
}

/// Entry-format driven directory and file tables of a DWARF 5 header.
fn parse_v5_file_table(
    header: &mut Reader<'_>,
    ctx: &FormContext<'_>,
    comp_dir: Option<&str>,
) -> DecodeResult<Vec<String>>
{
    let directories = parse_v5_entries(header, ctx)?
        .into_iter()
        .map(|(path, _)| path)
        .collect::<Vec<_>>();

    let files = parse_v5_entries(header, ctx)?
        .into_iter()
        .map(|(name, dir_index)| {
            let dir = usize::try_from(dir_index)
                .ok()
                .and_then(|idx| directories.get(idx))
                .map(String::as_str);
            join_path(&[comp_dir, dir], &name)
        })
        .collect();
    Ok(files)
}

fn parse_v5_entries(header: &mut Reader<'_>, ctx: &FormContext<'_>) -> DecodeResult<Vec<(String, u64)>>
{
    let format_count = header.read_u8()?;
    let mut format = Vec::with_capacity(usize::from(format_count));
    for _ in 0..format_count {
        let content = u16::try_from(header.read_uleb128()?).map_err(|_| header.malformed("content type out of range"))?;
        let form = u16::try_from(header.read_uleb128()?).map_err(|_| header.malformed("form out of range"))?;
        format.push((DwLnct(content), DwForm(form)));
    }

    // Every entry occupies at least one header byte.
    let count = header.read_uleb128()?;
    if count > header.remaining_len() as u64 {
        return Err(header.malformed("entry count exceeds header length"));
    }
    let mut entries = Vec::new();
    for _ in 0..count {
        let before = header.remaining_len();
        let mut path = String::new();
        let mut dir_index = 0;
        for &(content, form) in &format {
            let value = read_value(header, form, None, ctx)?;
            match (content, value) {
                (constants::DW_LNCT_path, AttrValue::String(s)) => path = s,
                (constants::DW_LNCT_directory_index, value) => dir_index = value.as_u64().unwrap_or(0),
                _ => {}
            }
        }
        if header.remaining_len() == before {
            return Err(header.malformed("zero-width file entry"));
        }
        entries.push((path, dir_index));
    }
    Ok(entries)
}

/// Join path components, restarting at any absolute component.
pub(crate) fn join_path(dirs: &[Option<&str>], name: &str) -> String
{
    if name.starts_with('/') {
        return name.to_owned();
    }
    let mut path = String::new();
    for dir in dirs.iter().flatten().filter(|d| !d.is_empty()) {
        if dir.starts_with('/') {
            path.clear();
        }
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(dir);
    }
    if !path.is_empty() && !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(name);
    path
}
