//! Attribute values and form decoding.

use gimli::constants::{self, DwForm};

use super::reader::{string_at, DecodeResult, Reader};

/// Typed value of a decoded attribute.
///
/// Values whose meaning depends on per-unit bases (`strx`, `addrx`) are kept
/// as indices and resolved by the query layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue
{
    /// Target address (`DW_FORM_addr`).
    Address(u64),
    /// Index into `.debug_addr` (`DW_FORM_addrx*`).
    AddressIndex(u64),
    /// Unsigned constant (`data1/2/4/8`, `udata`, list indices).
    Udata(u64),
    /// Signed constant (`sdata`, `implicit_const`).
    Sdata(i64),
    /// Inline byte block (`block*`, `exprloc`, `data16`).
    Block(Vec<u8>),
    Flag(bool),
    String(String),
    /// Index into `.debug_str_offsets` (`DW_FORM_strx*`).
    StringIndex(u64),
    /// Offset of another entry in `.debug_info`.
    Reference(u64),
    /// Offset into some other debug section (`sec_offset`, supplementary forms).
    SectionOffset(u64),
    /// Type-unit signature (`DW_FORM_ref_sig8`).
    Signature(u64),
}

impl AttrValue
{
    /// Numeric view of constants, addresses and section offsets.
    pub fn as_u64(&self) -> Option<u64>
    {
        match *self {
            AttrValue::Address(v) | AttrValue::Udata(v) | AttrValue::SectionOffset(v) => Some(v),
            AttrValue::Sdata(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str>
    {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&[u8]>
    {
        match self {
            AttrValue::Block(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<u64>
    {
        match *self {
            AttrValue::Reference(offset) => Some(offset),
            _ => None,
        }
    }

    /// Constant class (used to tell a `DW_AT_high_pc` length from an address).
    pub fn is_constant(&self) -> bool
    {
        matches!(self, AttrValue::Udata(_) | AttrValue::Sdata(_))
    }
}

/// Unit properties that decide how wide each form is.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FormContext<'a>
{
    pub version: u16,
    pub address_size: u8,
    pub offset_size: u8,
    /// `.debug_info` offset of the unit header; unit-relative references are
    /// rebased onto it.
    pub unit_offset: u64,
    pub debug_str: &'a [u8],
    pub debug_line_str: &'a [u8],
}

/// Decode one attribute value of the given form.
pub(crate) fn read_value(
    reader: &mut Reader<'_>,
    form: DwForm,
    implicit_const: Option<i64>,
    ctx: &FormContext<'_>,
) -> DecodeResult<AttrValue>
{
    let value = match form {
        constants::DW_FORM_addr => AttrValue::Address(reader.read_uint(ctx.address_size)?),
        constants::DW_FORM_addrx | constants::DW_FORM_GNU_addr_index => AttrValue::AddressIndex(reader.read_uleb128()?),
        constants::DW_FORM_addrx1 => AttrValue::AddressIndex(reader.read_uint(1)?),
        constants::DW_FORM_addrx2 => AttrValue::AddressIndex(reader.read_uint(2)?),
        constants::DW_FORM_addrx3 => AttrValue::AddressIndex(reader.read_uint(3)?),
        constants::DW_FORM_addrx4 => AttrValue::AddressIndex(reader.read_uint(4)?),

        constants::DW_FORM_data1 => AttrValue::Udata(reader.read_uint(1)?),
        constants::DW_FORM_data2 => AttrValue::Udata(reader.read_uint(2)?),
        constants::DW_FORM_data4 => AttrValue::Udata(reader.read_uint(4)?),
        constants::DW_FORM_data8 => AttrValue::Udata(reader.read_uint(8)?),
        constants::DW_FORM_data16 => AttrValue::Block(reader.read_bytes(16)?.to_vec()),
        constants::DW_FORM_udata => AttrValue::Udata(reader.read_uleb128()?),
        constants::DW_FORM_sdata => AttrValue::Sdata(reader.read_sleb128()?),
        constants::DW_FORM_implicit_const => {
            AttrValue::Sdata(implicit_const.ok_or_else(|| reader.malformed("implicit_const without value"))?)
        }

        constants::DW_FORM_string => AttrValue::String(String::from_utf8_lossy(reader.read_cstr()?).into_owned()),
        constants::DW_FORM_strp => {
            let offset = reader.read_offset(ctx.offset_size)?;
            AttrValue::String(string_at(ctx.debug_str, offset)?)
        }
        constants::DW_FORM_line_strp => {
            let offset = reader.read_offset(ctx.offset_size)?;
            AttrValue::String(string_at(ctx.debug_line_str, offset)?)
        }
        constants::DW_FORM_strx | constants::DW_FORM_GNU_str_index => AttrValue::StringIndex(reader.read_uleb128()?),
        constants::DW_FORM_strx1 => AttrValue::StringIndex(reader.read_uint(1)?),
        constants::DW_FORM_strx2 => AttrValue::StringIndex(reader.read_uint(2)?),
        constants::DW_FORM_strx3 => AttrValue::StringIndex(reader.read_uint(3)?),
        constants::DW_FORM_strx4 => AttrValue::StringIndex(reader.read_uint(4)?),
        constants::DW_FORM_strp_sup | constants::DW_FORM_GNU_strp_alt | constants::DW_FORM_GNU_ref_alt => {
            AttrValue::SectionOffset(reader.read_offset(ctx.offset_size)?)
        }

        constants::DW_FORM_block1 => {
            let len = reader.read_u8()?;
            AttrValue::Block(reader.read_bytes(usize::from(len))?.to_vec())
        }
        constants::DW_FORM_block2 => {
            let len = reader.read_u16()?;
            AttrValue::Block(reader.read_bytes(usize::from(len))?.to_vec())
        }
        constants::DW_FORM_block4 => {
            let len = reader.read_u32()?;
            let len = usize::try_from(len).map_err(|_| reader.malformed("block too large"))?;
            AttrValue::Block(reader.read_bytes(len)?.to_vec())
        }
        constants::DW_FORM_block | constants::DW_FORM_exprloc => {
            let len = reader.read_uleb_len()?;
            AttrValue::Block(reader.read_bytes(len)?.to_vec())
        }

        constants::DW_FORM_flag => AttrValue::Flag(reader.read_u8()? != 0),
        constants::DW_FORM_flag_present => AttrValue::Flag(true),

        constants::DW_FORM_ref1 => AttrValue::Reference(ctx.unit_offset + reader.read_uint(1)?),
        constants::DW_FORM_ref2 => AttrValue::Reference(ctx.unit_offset + reader.read_uint(2)?),
        constants::DW_FORM_ref4 => AttrValue::Reference(ctx.unit_offset + reader.read_uint(4)?),
        constants::DW_FORM_ref8 => AttrValue::Reference(ctx.unit_offset.wrapping_add(reader.read_uint(8)?)),
        constants::DW_FORM_ref_udata => AttrValue::Reference(ctx.unit_offset.wrapping_add(reader.read_uleb128()?)),
        constants::DW_FORM_ref_addr => {
            // DWARF 2 sized this like an address; later versions like an offset.
            let size = if ctx.version <= 2 { ctx.address_size } else { ctx.offset_size };
            AttrValue::Reference(reader.read_uint(size)?)
        }
        constants::DW_FORM_ref_sig8 => AttrValue::Signature(reader.read_u64()?),
        constants::DW_FORM_ref_sup4 => AttrValue::SectionOffset(reader.read_uint(4)?),
        constants::DW_FORM_ref_sup8 => AttrValue::SectionOffset(reader.read_uint(8)?),

        constants::DW_FORM_sec_offset => AttrValue::SectionOffset(reader.read_offset(ctx.offset_size)?),
        constants::DW_FORM_loclistx | constants::DW_FORM_rnglistx => AttrValue::Udata(reader.read_uleb128()?),

        constants::DW_FORM_indirect => {
            let actual = u16::try_from(reader.read_uleb128()?).map_err(|_| reader.malformed("form out of range"))?;
            let actual = DwForm(actual);
            if actual == constants::DW_FORM_indirect {
                return Err(reader.malformed("nested DW_FORM_indirect"));
            }
            return read_value(reader, actual, implicit_const, ctx);
        }

        _ => return Err(reader.malformed("unsupported attribute form")),
    };
    Ok(value)
}
