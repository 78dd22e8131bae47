//! Hand-assembled DWARF fixtures shared by the integration tests.
//!
//! Units default to DWARF 4, 32-bit, with 4-byte addresses. `InfoBuilder::v5`
//! and `InfoBuilder::dwarf64` switch the header layout; `InfoBuilder::offset`
//! accounts for whichever header `build` will emit.

#![allow(dead_code)]

use gimli::constants::{self, DwAt, DwForm, DwTag, DwUt};

pub fn uleb(mut value: u64, out: &mut Vec<u8>)
{
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn sleb(mut value: i64, out: &mut Vec<u8>)
{
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// WASM module made of custom sections only.
pub fn wasm_module(sections: &[(&str, &[u8])]) -> Vec<u8>
{
    let mut out = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
    for (name, payload) in sections {
        let mut body = Vec::new();
        uleb(name.len() as u64, &mut body);
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(payload);
        out.push(0);
        uleb(body.len() as u64, &mut out);
        out.extend(body);
    }
    out
}

#[derive(Default)]
pub struct AbbrevBuilder
{
    buf: Vec<u8>,
}

impl AbbrevBuilder
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn entry(mut self, code: u64, tag: DwTag, children: bool, attrs: &[(DwAt, DwForm)]) -> Self
    {
        uleb(code, &mut self.buf);
        uleb(u64::from(tag.0), &mut self.buf);
        self.buf.push(u8::from(children));
        for (name, form) in attrs {
            uleb(u64::from(name.0), &mut self.buf);
            uleb(u64::from(form.0), &mut self.buf);
        }
        self.buf.extend_from_slice(&[0, 0]);
        self
    }

    pub fn build(mut self) -> Vec<u8>
    {
        self.buf.push(0);
        self.buf
    }
}

/// Entry stream of one unit; `build` prepends the header.
pub struct InfoBuilder
{
    base: u64,
    abbrev_offset: u64,
    version: u16,
    dwarf64: bool,
    unit_type: DwUt,
    body: Vec<u8>,
}

impl InfoBuilder
{
    pub fn new() -> Self
    {
        Self::at(0, 0)
    }

    /// Unit starting at section offset `base`, using the abbreviation table
    /// at `abbrev_offset`.
    pub fn at(base: u64, abbrev_offset: u32) -> Self
    {
        Self {
            base,
            abbrev_offset: u64::from(abbrev_offset),
            version: 4,
            dwarf64: false,
            unit_type: constants::DW_UT_compile,
            body: Vec::new(),
        }
    }

    /// DWARF 5 compile unit.
    pub fn v5(base: u64, abbrev_offset: u32) -> Self
    {
        Self {
            version: 5,
            ..Self::at(base, abbrev_offset)
        }
    }

    /// Use the 64-bit format: `0xffffffff` escape and 8-byte offsets.
    pub fn dwarf64(mut self) -> Self
    {
        self.dwarf64 = true;
        self
    }

    /// DWARF 5 unit type. Skeleton and type units get zeroed extra fields.
    pub fn unit_type(mut self, unit_type: DwUt) -> Self
    {
        self.unit_type = unit_type;
        self
    }

    fn offset_size(&self) -> u64
    {
        if self.dwarf64 { 8 } else { 4 }
    }

    fn initial_length_size(&self) -> u64
    {
        if self.dwarf64 { 12 } else { 4 }
    }

    /// Bytes between the unit start and its first entry.
    pub fn header_len(&self) -> u64
    {
        let mut len = self.initial_length_size() + 2 + self.offset_size() + 1;
        if self.version >= 5 {
            len += 1 + self.extra_header_len();
        }
        len
    }

    fn extra_header_len(&self) -> u64
    {
        match self.unit_type {
            constants::DW_UT_skeleton | constants::DW_UT_split_compile => 8,
            constants::DW_UT_type | constants::DW_UT_split_type => 8 + self.offset_size(),
            _ => 0,
        }
    }

    /// Section offset of the next entry written.
    pub fn offset(&self) -> u64
    {
        self.base + self.header_len() + self.body.len() as u64
    }

    pub fn code(&mut self, code: u64) -> &mut Self
    {
        uleb(code, &mut self.body);
        self
    }

    pub fn null(&mut self) -> &mut Self
    {
        self.body.push(0);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self
    {
        self.body.extend_from_slice(value.as_bytes());
        self.body.push(0);
        self
    }

    pub fn data1(&mut self, value: u8) -> &mut Self
    {
        self.body.push(value);
        self
    }

    pub fn data4(&mut self, value: u32) -> &mut Self
    {
        self.body.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn addr(&mut self, value: u32) -> &mut Self
    {
        self.data4(value)
    }

    /// `DW_FORM_ref4` to the entry at section offset `target`.
    pub fn ref4(&mut self, target: u64) -> &mut Self
    {
        self.data4((target - self.base) as u32)
    }

    pub fn exprloc(&mut self, expr: &[u8]) -> &mut Self
    {
        uleb(expr.len() as u64, &mut self.body);
        self.body.extend_from_slice(expr);
        self
    }

    /// ULEB128 value, as `DW_FORM_udata`, `DW_FORM_strx` or `DW_FORM_loclistx`.
    pub fn udata(&mut self, value: u64) -> &mut Self
    {
        uleb(value, &mut self.body);
        self
    }

    /// Offset-sized value, as `DW_FORM_sec_offset` or `DW_FORM_strp`.
    pub fn sec_offset(&mut self, value: u64) -> &mut Self
    {
        if self.dwarf64 {
            self.body.extend_from_slice(&value.to_le_bytes());
        } else {
            self.body.extend_from_slice(&(value as u32).to_le_bytes());
        }
        self
    }

    /// `DW_FORM_ref_addr` to the entry at section offset `target`.
    pub fn ref_addr(&mut self, target: u64) -> &mut Self
    {
        self.sec_offset(target)
    }

    pub fn build(&self) -> Vec<u8>
    {
        let mut out = Vec::new();
        let unit_length = self.header_len() - self.initial_length_size() + self.body.len() as u64;
        if self.dwarf64 {
            out.extend_from_slice(&0xffff_ffffu32.to_le_bytes());
            out.extend_from_slice(&unit_length.to_le_bytes());
        } else {
            out.extend_from_slice(&(unit_length as u32).to_le_bytes());
        }
        out.extend_from_slice(&self.version.to_le_bytes());
        if self.version >= 5 {
            out.push(self.unit_type.0);
            out.push(4);
        }
        if self.dwarf64 {
            out.extend_from_slice(&self.abbrev_offset.to_le_bytes());
        } else {
            out.extend_from_slice(&(self.abbrev_offset as u32).to_le_bytes());
        }
        if self.version < 5 {
            out.push(4);
        }
        out.resize(out.len() + self.extra_header_len() as usize, 0);
        out.extend_from_slice(&self.body);
        out
    }
}

/// Line-number program opcodes for a v4 header with the standard
/// parameters below.
#[derive(Default)]
pub struct LineOps
{
    buf: Vec<u8>,
}

impl LineOps
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn set_address(mut self, address: u32) -> Self
    {
        self.buf.extend_from_slice(&[0, 5, constants::DW_LNE_set_address.0]);
        self.buf.extend_from_slice(&address.to_le_bytes());
        self
    }

    pub fn advance_line(mut self, delta: i64) -> Self
    {
        self.buf.push(constants::DW_LNS_advance_line.0);
        sleb(delta, &mut self.buf);
        self
    }

    pub fn advance_pc(mut self, delta: u64) -> Self
    {
        self.buf.push(constants::DW_LNS_advance_pc.0);
        uleb(delta, &mut self.buf);
        self
    }

    pub fn copy(mut self) -> Self
    {
        self.buf.push(constants::DW_LNS_copy.0);
        self
    }

    pub fn set_file(mut self, file: u64) -> Self
    {
        self.buf.push(constants::DW_LNS_set_file.0);
        uleb(file, &mut self.buf);
        self
    }

    pub fn negate_stmt(mut self) -> Self
    {
        self.buf.push(constants::DW_LNS_negate_stmt.0);
        self
    }

    pub fn end_sequence(mut self) -> Self
    {
        self.buf.extend_from_slice(&[0, 1, constants::DW_LNE_end_sequence.0]);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self
    {
        self.buf.extend_from_slice(bytes);
        self
    }
}

/// v4 line table: `line_base -5`, `line_range 14`, `opcode_base 13`.
pub fn line_program(dirs: &[&str], files: &[(&str, u64)], ops: LineOps) -> Vec<u8>
{
    let mut header = vec![1, 1, 1, (-5i8) as u8, 14, 13];
    header.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
    for dir in dirs {
        header.extend_from_slice(dir.as_bytes());
        header.push(0);
    }
    header.push(0);
    for (name, dir) in files {
        header.extend_from_slice(name.as_bytes());
        header.push(0);
        uleb(*dir, &mut header);
        header.extend_from_slice(&[0, 0]);
    }
    header.push(0);

    let mut unit = Vec::new();
    unit.extend_from_slice(&4u16.to_le_bytes());
    unit.extend_from_slice(&(header.len() as u32).to_le_bytes());
    unit.extend(header);
    unit.extend(ops.buf);

    let mut out = (unit.len() as u32).to_le_bytes().to_vec();
    out.extend(unit);
    out
}

/// v5 line table with the same parameters as [`line_program`]. Paths are
/// `DW_FORM_string` and directory indices `DW_FORM_udata`; file indices in
/// the program start at 0.
pub fn line_program_v5(dirs: &[&str], files: &[(&str, u64)], ops: LineOps) -> Vec<u8>
{
    use constants::*;

    let mut header = vec![1, 1, 1, (-5i8) as u8, 14, 13];
    header.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);

    header.push(1);
    uleb(u64::from(DW_LNCT_path.0), &mut header);
    uleb(u64::from(DW_FORM_string.0), &mut header);
    uleb(dirs.len() as u64, &mut header);
    for dir in dirs {
        header.extend_from_slice(dir.as_bytes());
        header.push(0);
    }

    header.push(2);
    uleb(u64::from(DW_LNCT_path.0), &mut header);
    uleb(u64::from(DW_FORM_string.0), &mut header);
    uleb(u64::from(DW_LNCT_directory_index.0), &mut header);
    uleb(u64::from(DW_FORM_udata.0), &mut header);
    uleb(files.len() as u64, &mut header);
    for (name, dir) in files {
        header.extend_from_slice(name.as_bytes());
        header.push(0);
        uleb(*dir, &mut header);
    }

    let mut unit = Vec::new();
    unit.extend_from_slice(&5u16.to_le_bytes());
    unit.extend_from_slice(&[4, 0]);
    unit.extend_from_slice(&(header.len() as u32).to_le_bytes());
    unit.extend(header);
    unit.extend(ops.buf);

    let mut out = (unit.len() as u32).to_le_bytes().to_vec();
    out.extend(unit);
    out
}

/// `.debug_loc` list of `(begin, end, expr)` entries with 4-byte addresses.
pub fn debug_loc(entries: &[(u32, u32, &[u8])]) -> Vec<u8>
{
    let mut out = Vec::new();
    for (begin, end, expr) in entries {
        out.extend_from_slice(&begin.to_le_bytes());
        out.extend_from_slice(&end.to_le_bytes());
        out.extend_from_slice(&(expr.len() as u16).to_le_bytes());
        out.extend_from_slice(expr);
    }
    out.extend_from_slice(&[0; 8]);
    out
}

/// Debug sections of the shared fixture, by name.
pub struct Fixture
{
    pub sections: Vec<(&'static str, Vec<u8>)>,
    pub offsets: Offsets,
}

/// Entry offsets inside the shared fixture.
#[derive(Debug, Clone, Copy)]
pub struct Offsets
{
    pub unit: u64,
    pub int: u64,
    pub int_ptr: u64,
    pub env: u64,
    pub address: u64,
    pub void_ptr: u64,
    pub int_ptr_ptr: u64,
    pub add: u64,
    pub x: u64,
    pub env_param: u64,
    pub empty: u64,
}

impl Fixture
{
    pub fn section_refs(&self) -> Vec<(&str, &[u8])>
    {
        self.sections.iter().map(|(name, data)| (*name, data.as_slice())).collect()
    }

    pub fn wasm(&self) -> Vec<u8>
    {
        wasm_module(&self.section_refs())
    }
}

pub const ABBREV_CU: u64 = 1;
pub const ABBREV_BASE_TYPE: u64 = 2;
pub const ABBREV_POINTER: u64 = 3;
pub const ABBREV_SUBPROGRAM: u64 = 4;
pub const ABBREV_VARIABLE: u64 = 5;
pub const ABBREV_PARAMETER: u64 = 6;
pub const ABBREV_STRUCT: u64 = 7;
pub const ABBREV_TYPEDEF: u64 = 8;
pub const ABBREV_VOID_POINTER: u64 = 9;

pub fn fixture_abbrevs() -> Vec<u8>
{
    use constants::*;
    AbbrevBuilder::new()
        .entry(
            ABBREV_CU,
            DW_TAG_compile_unit,
            true,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_stmt_list, DW_FORM_sec_offset),
                (DW_AT_low_pc, DW_FORM_addr),
            ],
        )
        .entry(
            ABBREV_BASE_TYPE,
            DW_TAG_base_type,
            false,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_encoding, DW_FORM_data1),
                (DW_AT_byte_size, DW_FORM_data1),
            ],
        )
        .entry(ABBREV_POINTER, DW_TAG_pointer_type, false, &[(DW_AT_type, DW_FORM_ref4)])
        .entry(
            ABBREV_SUBPROGRAM,
            DW_TAG_subprogram,
            true,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_low_pc, DW_FORM_addr),
                (DW_AT_high_pc, DW_FORM_data4),
                (DW_AT_decl_file, DW_FORM_data1),
                (DW_AT_decl_line, DW_FORM_data1),
            ],
        )
        .entry(
            ABBREV_VARIABLE,
            DW_TAG_variable,
            false,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_type, DW_FORM_ref4),
                (DW_AT_location, DW_FORM_exprloc),
                (DW_AT_decl_line, DW_FORM_data1),
            ],
        )
        .entry(
            ABBREV_PARAMETER,
            DW_TAG_formal_parameter,
            false,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_type, DW_FORM_ref4),
                (DW_AT_location, DW_FORM_sec_offset),
            ],
        )
        .entry(
            ABBREV_STRUCT,
            DW_TAG_structure_type,
            false,
            &[(DW_AT_name, DW_FORM_string), (DW_AT_byte_size, DW_FORM_data1)],
        )
        .entry(
            ABBREV_TYPEDEF,
            DW_TAG_typedef,
            false,
            &[(DW_AT_name, DW_FORM_string), (DW_AT_type, DW_FORM_ref4)],
        )
        .entry(ABBREV_VOID_POINTER, DW_TAG_pointer_type, false, &[])
        .build()
}

/// A unit with type entries and two functions:
///
/// - `add` at `[0x10, 0x30)` declared at `src/lib.rs:3`, with a local `x`
///   (expression location, declared on line 200) and a parameter `env`
///   whose location list covers `[0x10, 0x18)`
/// - `empty` at `[0x40, 0x48)` with no variables
///
/// Line rows: 0x10 → line 5, 0x14 → line 6 (sequence ends at 0x30), and
/// 0x40 → line 10 (sequence ends at 0x48).
pub fn fixture() -> Fixture
{
    let mut info = InfoBuilder::new();

    let unit = info.offset();
    info.code(ABBREV_CU).string("lib.rs").data4(0).addr(0);

    let int = info.offset();
    info.code(ABBREV_BASE_TYPE).string("i32").data1(0x05).data1(4);
    let int_ptr = info.offset();
    info.code(ABBREV_POINTER).ref4(int);
    let env = info.offset();
    info.code(ABBREV_STRUCT).string("Env").data1(16);
    let address = info.offset();
    info.code(ABBREV_TYPEDEF).string("Address").ref4(env);
    let void_ptr = info.offset();
    info.code(ABBREV_VOID_POINTER);
    let int_ptr_ptr = info.offset();
    info.code(ABBREV_POINTER).ref4(int_ptr);

    let add = info.offset();
    info.code(ABBREV_SUBPROGRAM).string("add").addr(0x10).data4(0x20).data1(1).data1(3);
    let x = info.offset();
    info.code(ABBREV_VARIABLE).string("x").ref4(int).exprloc(&[0x9f]).data1(200);
    let env_param = info.offset();
    info.code(ABBREV_PARAMETER).string("env").ref4(address).data4(0);
    info.null();

    let empty = info.offset();
    info.code(ABBREV_SUBPROGRAM).string("empty").addr(0x40).data4(0x08).data1(1).data1(9);
    info.null();

    info.null();

    let line = line_program(
        &["src"],
        &[("lib.rs", 1)],
        LineOps::new()
            .set_address(0x10)
            .advance_line(4)
            .copy()
            .advance_pc(4)
            .advance_line(1)
            .copy()
            .advance_pc(0x1c)
            .end_sequence()
            .set_address(0x40)
            .advance_line(9)
            .copy()
            .advance_pc(8)
            .end_sequence(),
    );

    Fixture {
        sections: vec![
            (".debug_info", info.build()),
            (".debug_abbrev", fixture_abbrevs()),
            (".debug_line", line),
            (".debug_loc", debug_loc(&[(0x10, 0x18, &[0x91, 0x08][..])])),
        ],
        offsets: Offsets {
            unit,
            int,
            int_ptr,
            env,
            address,
            void_ptr,
            int_ptr_ptr,
            add,
            x,
            env_param,
            empty,
        },
    }
}

/// The smallest useful module: one function at `[0x10, 0x30)` with one
/// variable `x`, and `high_pc` encoded as a length.
pub fn minimal_wasm() -> Vec<u8>
{
    use constants::*;
    let abbrev = AbbrevBuilder::new()
        .entry(1, DW_TAG_compile_unit, true, &[(DW_AT_name, DW_FORM_string)])
        .entry(
            2,
            DW_TAG_subprogram,
            true,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_low_pc, DW_FORM_addr),
                (DW_AT_high_pc, DW_FORM_data4),
            ],
        )
        .entry(3, DW_TAG_variable, false, &[(DW_AT_name, DW_FORM_string)])
        .build();

    let mut info = InfoBuilder::new();
    info.code(1).string("main.rs");
    info.code(2).string("run").addr(0x10).data4(0x20);
    info.code(3).string("x");
    info.null();
    info.null();

    let info = info.build();
    wasm_module(&[(".debug_info", info.as_slice()), (".debug_abbrev", abbrev.as_slice())])
}

/// DWARF 5 unit using indexed strings, addresses and location lists:
///
/// - unit `lib.rs` with `comp_dir` `/work` and base address `0x1000`
///   (`.debug_addr` index 0)
/// - `transfer` at `[0x1100, 0x1140)` (`.debug_addr` index 1), declared in
///   file 0 on line 7
/// - local `amount` through `DW_FORM_loclistx` index 0, live on
///   `[0x1100, 0x1110)`
/// - parameter `env` with an expression location
///
/// Line rows: 0x1100 → line 7, 0x1108 → line 8, sequence ends at 0x1110.
/// File 0 is `/work/src/lib.rs`, file 1 is `/work/main.rs`.
pub fn dwarf5_module() -> Vec<u8>
{
    use constants::*;

    let abbrev = AbbrevBuilder::new()
        .entry(
            1,
            DW_TAG_compile_unit,
            true,
            &[
                (DW_AT_name, DW_FORM_strx1),
                (DW_AT_str_offsets_base, DW_FORM_sec_offset),
                (DW_AT_addr_base, DW_FORM_sec_offset),
                (DW_AT_loclists_base, DW_FORM_sec_offset),
                (DW_AT_stmt_list, DW_FORM_sec_offset),
                (DW_AT_comp_dir, DW_FORM_string),
                (DW_AT_low_pc, DW_FORM_addrx1),
            ],
        )
        .entry(
            2,
            DW_TAG_subprogram,
            true,
            &[
                (DW_AT_name, DW_FORM_strx1),
                (DW_AT_low_pc, DW_FORM_addrx1),
                (DW_AT_high_pc, DW_FORM_data4),
                (DW_AT_decl_file, DW_FORM_data1),
                (DW_AT_decl_line, DW_FORM_data1),
            ],
        )
        .entry(
            3,
            DW_TAG_variable,
            false,
            &[(DW_AT_name, DW_FORM_string), (DW_AT_location, DW_FORM_loclistx)],
        )
        .entry(
            4,
            DW_TAG_formal_parameter,
            false,
            &[(DW_AT_name, DW_FORM_string), (DW_AT_location, DW_FORM_exprloc)],
        )
        .build();

    let mut info = InfoBuilder::v5(0, 0);
    info.code(1)
        .data1(0)
        .sec_offset(8)
        .sec_offset(8)
        .sec_offset(12)
        .sec_offset(0)
        .string("/work")
        .data1(0);
    info.code(2).data1(1).data1(1).data4(0x40).data1(0).data1(7);
    info.code(3).string("amount").udata(0);
    info.code(4).string("env").exprloc(&[0x91, 0x08]);
    info.null();
    info.null();

    let strings = b"\0lib.rs\0transfer\0";

    let mut str_offsets = contribution_header(8 + 8);
    str_offsets.extend_from_slice(&1u32.to_le_bytes());
    str_offsets.extend_from_slice(&8u32.to_le_bytes());

    let mut addr = contribution_header(8 + 8);
    addr.extend_from_slice(&0x1000u32.to_le_bytes());
    addr.extend_from_slice(&0x1100u32.to_le_bytes());

    // Header with one offset, then the list the offset points at.
    let list = [
        DW_LLE_offset_pair.0,
        0x80,
        0x02,
        0x90,
        0x02,
        1,
        DW_OP_stack_value.0,
        DW_LLE_end_of_list.0,
    ];
    let mut loclists = ((12 + 4 + list.len()) as u32 - 4).to_le_bytes().to_vec();
    loclists.extend_from_slice(&5u16.to_le_bytes());
    loclists.extend_from_slice(&[4, 0]);
    loclists.extend_from_slice(&1u32.to_le_bytes());
    loclists.extend_from_slice(&4u32.to_le_bytes());
    loclists.extend_from_slice(&list);

    let line = line_program_v5(
        &["/work", "src"],
        &[("lib.rs", 1), ("main.rs", 0)],
        LineOps::new()
            .set_file(0)
            .set_address(0x1100)
            .advance_line(6)
            .copy()
            .advance_pc(8)
            .advance_line(1)
            .copy()
            .advance_pc(8)
            .end_sequence(),
    );

    let info = info.build();
    wasm_module(&[
        (".debug_info", info.as_slice()),
        (".debug_abbrev", abbrev.as_slice()),
        (".debug_str", &strings[..]),
        (".debug_str_offsets", str_offsets.as_slice()),
        (".debug_addr", addr.as_slice()),
        (".debug_loclists", loclists.as_slice()),
        (".debug_line", line.as_slice()),
    ])
}

/// 8-byte DWARF 5 contribution header for a table of `len` bytes in total.
fn contribution_header(len: u32) -> Vec<u8>
{
    let mut out = (len - 4).to_le_bytes().to_vec();
    out.extend_from_slice(&5u16.to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    out
}
