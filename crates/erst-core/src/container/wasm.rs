//! WASM custom-section scan.
//!
//! A module is an 8-byte header followed by `id: u8, size: varuint32,
//! payload[size]` records. Custom sections (id 0) open their payload with a
//! `varuint32` name length and the UTF-8 name.

use gimli::RunTimeEndian;
use tracing::debug;

use super::SectionSet;
use crate::dwarf::reader::{DecodeResult, Reader};

const HEADER_LEN: usize = 8;
const CUSTOM_SECTION_ID: u8 = 0;
const DEBUG_PREFIX: &str = ".debug_";

pub(super) fn extract(data: &[u8]) -> SectionSet
{
    let mut sections = SectionSet::new(RunTimeEndian::Little);
    let Ok(mut reader) = Reader::at(data, HEADER_LEN, RunTimeEndian::Little) else {
        return sections;
    };

    while !reader.is_empty() {
        let start = reader.section_offset();
        let (id, size) = match read_section_header(&mut reader) {
            Ok(header) => header,
            Err(err) => {
                debug!(offset = start, %err, "stopping WASM section scan at truncated header");
                break;
            }
        };

        let payload = match reader.split(size as usize) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(offset = start, size, %err, "stopping WASM section scan at oversized section");
                break;
            }
        };

        if id == CUSTOM_SECTION_ID {
            read_custom_section(payload, &mut sections);
        }
    }

    sections
}

fn read_section_header(reader: &mut Reader<'_>) -> DecodeResult<(u8, u32)>
{
    let id = reader.read_u8()?;
    let size = reader.read_var_u32()?;
    Ok((id, size))
}

fn read_custom_section(mut payload: Reader<'_>, sections: &mut SectionSet)
{
    let name = payload
        .read_var_u32()
        .and_then(|len| payload.read_bytes(len as usize));
    let name = match name {
        Ok(name) => name,
        Err(err) => {
            debug!(%err, "skipping custom section with truncated name");
            return;
        }
    };

    let Ok(name) = std::str::from_utf8(name) else {
        debug!("skipping custom section with non-UTF-8 name");
        return;
    };
    if !name.starts_with(DEBUG_PREFIX) {
        return;
    }

    let start = payload.section_offset();
    let end = start + payload.remaining_len();
    debug!(section = name, len = end - start, "found debug custom section");
    sections.insert(name, start..end);
}
