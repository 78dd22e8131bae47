//! Location descriptions.
//!
//! Only the leading opcode of an expression is interpreted; evaluating
//! register or stack arithmetic is left to whatever consumes the string.
//! Location lists are decoded far enough to recover the address ranges over
//! which each expression applies.

use gimli::constants::{self, DwLle, DwOp};

use super::reader::{DecodeResult, Reader};
use super::DwarfSections;
use crate::types::PcRange;

/// Render the leading opcode of a location expression.
///
/// - `DW_OP_stack_value` → `"immediate"`
/// - `DW_OP_addr` with an 8-byte little-endian operand → the address in hex
/// - a zero byte → `"end"`
/// - anything else → `"location[0xHH]"`
pub fn decode_location(expr: &[u8]) -> String
{
    let Some(&opcode) = expr.first() else {
        return String::new();
    };

    match DwOp(opcode) {
        constants::DW_OP_stack_value => "immediate".to_string(),
        constants::DW_OP_addr if expr.len() >= 9 => {
            let mut operand = [0u8; 8];
            operand.copy_from_slice(&expr[1..9]);
            format!("{:#x}", u64::from_le_bytes(operand))
        }
        _ if opcode == 0 => "end".to_string(),
        _ => format!("location[{opcode:#04x}]"),
    }
}

/// One entry of a location list: an expression and the PC range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocationListEntry
{
    pub range: PcRange,
    pub expr: Vec<u8>,
}

/// Per-unit values needed to walk a location list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListContext
{
    pub version: u16,
    pub address_size: u8,
    pub offset_size: u8,
    pub base_address: u64,
    pub addr_base: Option<u64>,
    pub loclists_base: Option<u64>,
}

/// How a `DW_AT_location` attribute referred to its list.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ListRef
{
    /// Section offset (`sec_offset`, or a constant before DWARF 4).
    Offset(u64),
    /// `DW_FORM_loclistx` index, relative to `DW_AT_loclists_base`.
    Index(u64),
}

pub(crate) fn parse_location_list(
    sections: &DwarfSections<'_>,
    list: ListRef,
    ctx: &ListContext,
) -> DecodeResult<Vec<LocationListEntry>>
{
    if ctx.version >= 5 {
        parse_loclists(sections, list, ctx)
    } else {
        let ListRef::Offset(offset) = list else {
            return Ok(Vec::new());
        };
        parse_loc(sections, offset, ctx)
    }
}

fn section_reader<'a>(sections: &DwarfSections<'a>, section: &'a [u8], offset: u64) -> DecodeResult<Reader<'a>>
{
    Reader::at(section, usize::try_from(offset).unwrap_or(usize::MAX), sections.endian)
}

/// DWARF 2-4 `.debug_loc`: `(begin, end)` pairs relative to the base address.
fn parse_loc(sections: &DwarfSections<'_>, offset: u64, ctx: &ListContext) -> DecodeResult<Vec<LocationListEntry>>
{
    let mut reader = section_reader(sections, sections.loc, offset)?;
    let max_address = max_address(ctx.address_size);
    let mut base = ctx.base_address;
    let mut entries = Vec::new();

    loop {
        let begin = reader.read_uint(ctx.address_size)?;
        let end = reader.read_uint(ctx.address_size)?;
        if begin == 0 && end == 0 {
            break;
        }
        if begin == max_address {
            base = end;
            continue;
        }
        let len = reader.read_u16()?;
        let expr = reader.read_bytes(usize::from(len))?.to_vec();
        entries.push(LocationListEntry {
            range: PcRange::new(base.wrapping_add(begin), base.wrapping_add(end)),
            expr,
        });
    }
    Ok(entries)
}

/// DWARF 5 `.debug_loclists`.
fn parse_loclists(
    sections: &DwarfSections<'_>,
    list: ListRef,
    ctx: &ListContext,
) -> DecodeResult<Vec<LocationListEntry>>
{
    let offset = match list {
        ListRef::Offset(offset) => offset,
        ListRef::Index(index) => {
            // The offsets array sits at loclists_base; entries are relative to it.
            let base = ctx.loclists_base.unwrap_or(0);
            let slot = base.wrapping_add(index.wrapping_mul(u64::from(ctx.offset_size)));
            let relative = section_reader(sections, sections.loclists, slot)?.read_offset(ctx.offset_size)?;
            base.wrapping_add(relative)
        }
    };

    let mut reader = section_reader(sections, sections.loclists, offset)?;
    let mut base = ctx.base_address;
    let mut entries = Vec::new();

    loop {
        let kind = DwLle(reader.read_u8()?);
        let range = match kind {
            constants::DW_LLE_end_of_list => break,
            constants::DW_LLE_base_addressx => {
                base = resolve_addrx(sections, ctx, reader.read_uleb128()?)?;
                continue;
            }
            constants::DW_LLE_base_address => {
                base = reader.read_uint(ctx.address_size)?;
                continue;
            }
            constants::DW_LLE_startx_endx => {
                let start = resolve_addrx(sections, ctx, reader.read_uleb128()?)?;
                let end = resolve_addrx(sections, ctx, reader.read_uleb128()?)?;
                Some(PcRange::new(start, end))
            }
            constants::DW_LLE_startx_length => {
                let start = resolve_addrx(sections, ctx, reader.read_uleb128()?)?;
                let len = reader.read_uleb128()?;
                Some(PcRange::new(start, start.wrapping_add(len)))
            }
            constants::DW_LLE_offset_pair => {
                let start = reader.read_uleb128()?;
                let end = reader.read_uleb128()?;
                Some(PcRange::new(base.wrapping_add(start), base.wrapping_add(end)))
            }
            constants::DW_LLE_start_end => {
                let start = reader.read_uint(ctx.address_size)?;
                let end = reader.read_uint(ctx.address_size)?;
                Some(PcRange::new(start, end))
            }
            constants::DW_LLE_start_length => {
                let start = reader.read_uint(ctx.address_size)?;
                let len = reader.read_uleb128()?;
                Some(PcRange::new(start, start.wrapping_add(len)))
            }
            // Applies wherever nothing else does; it contributes no range.
            constants::DW_LLE_default_location => None,
            _ => return Err(reader.malformed("unknown location list entry kind")),
        };

        let len = reader.read_uleb_len()?;
        let expr = reader.read_bytes(len)?.to_vec();
        if let Some(range) = range {
            entries.push(LocationListEntry { range, expr });
        }
    }
    Ok(entries)
}

/// Entry `index` of the unit's `.debug_addr` contribution.
pub(crate) fn resolve_addrx(sections: &DwarfSections<'_>, ctx: &ListContext, index: u64) -> DecodeResult<u64>
{
    // Pre-standard split DWARF has no addr_base attribute; the table then
    // starts after the 8-byte DWARF 5 header.
    let base = ctx.addr_base.unwrap_or(8);
    let offset = base.wrapping_add(index.wrapping_mul(u64::from(ctx.address_size)));
    section_reader(sections, sections.addr, offset)?.read_uint(ctx.address_size)
}

fn max_address(address_size: u8) -> u64
{
    match address_size {
        8 => u64::MAX,
        size => (1u64 << (u32::from(size) * 8)) - 1,
    }
}

#[cfg(test)]
mod tests
{
    use gimli::RunTimeEndian;

    use super::*;

    #[test]
    fn test_decode_location()
    {
        assert_eq!(decode_location(&[0x9f]), "immediate");
        let mut addr = vec![0x03];
        addr.extend_from_slice(&0x1234u64.to_le_bytes());
        assert_eq!(decode_location(&addr), "0x1234");
        assert_eq!(decode_location(&[0x00]), "end");
        assert_eq!(decode_location(&[0x42]), "location[0x42]");
        assert_eq!(decode_location(&[0x05]), "location[0x05]");
        assert_eq!(decode_location(&[]), "");
    }

    #[test]
    fn test_short_addr_operand_falls_back()
    {
        assert_eq!(decode_location(&[0x03, 0x34, 0x12]), "location[0x03]");
    }

    fn v4_ctx() -> ListContext
    {
        ListContext {
            version: 4,
            address_size: 4,
            offset_size: 4,
            base_address: 0x1000,
            addr_base: None,
            loclists_base: None,
        }
    }

    #[test]
    fn test_debug_loc_with_base_selection()
    {
        let mut loc = Vec::new();
        loc.extend_from_slice(&0x10u32.to_le_bytes());
        loc.extend_from_slice(&0x20u32.to_le_bytes());
        loc.extend_from_slice(&[1, 0, 0x9f]);
        loc.extend_from_slice(&u32::MAX.to_le_bytes()); // base selection
        loc.extend_from_slice(&0x2000u32.to_le_bytes());
        loc.extend_from_slice(&0x04u32.to_le_bytes());
        loc.extend_from_slice(&0x08u32.to_le_bytes());
        loc.extend_from_slice(&[1, 0, 0x50]);
        loc.extend_from_slice(&[0; 8]);

        let sections = DwarfSections {
            loc: &loc,
            endian: RunTimeEndian::Little,
            ..DwarfSections::default()
        };
        let entries = parse_location_list(&sections, ListRef::Offset(0), &v4_ctx()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].range, PcRange::new(0x1010, 0x1020));
        assert_eq!(entries[0].expr, vec![0x9f]);
        assert_eq!(entries[1].range, PcRange::new(0x2004, 0x2008));
    }

    #[test]
    fn test_debug_loclists_offset_pair_and_start_length()
    {
        let loclists = [
            0x04, 0x10, 0x20, 0x01, 0x9f, // offset_pair
            0x08, 0x00, 0x30, 0, 0, 0x04, 0x01, 0x50, // start_length
            0x00,
        ];
        let sections = DwarfSections {
            loclists: &loclists,
            endian: RunTimeEndian::Little,
            ..DwarfSections::default()
        };
        let ctx = ListContext { version: 5, ..v4_ctx() };
        let entries = parse_location_list(&sections, ListRef::Offset(0), &ctx).unwrap();
        assert_eq!(entries[0].range, PcRange::new(0x1010, 0x1020));
        assert_eq!(entries[1].range, PcRange::new(0x3000, 0x3004));
    }

    #[test]
    fn test_truncated_list_is_error()
    {
        let loc = [0x10, 0, 0, 0];
        let sections = DwarfSections {
            loc: &loc,
            endian: RunTimeEndian::Little,
            ..DwarfSections::default()
        };
        assert!(parse_location_list(&sections, ListRef::Offset(0), &v4_ctx()).is_err());
    }
}
