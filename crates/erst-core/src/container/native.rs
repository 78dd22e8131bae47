//! ELF, Mach-O and PE section tables, read through `object`.

use gimli::RunTimeEndian;
use object::{CompressionFormat, Object, ObjectSection};
use tracing::debug;

use super::SectionSet;
use crate::error::{ErstError, ErstResult};

pub(super) fn extract(data: &[u8]) -> ErstResult<SectionSet>
{
    let file = object::File::parse(data)
        .map_err(|err| ErstError::InvalidBinary(format!("failed to parse section table: {err}")))?;

    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    let mut sections = SectionSet::new(endian);

    for section in file.sections() {
        let Ok(raw_name) = section.name() else {
            continue;
        };
        let Some(name) = canonical_debug_name(raw_name) else {
            continue;
        };

        // Compressed sections have no uncompressed range in the buffer.
        match section.compressed_file_range() {
            Ok(range) if range.format != CompressionFormat::None => {
                debug!(section = %name, "skipping compressed debug section");
                continue;
            }
            Err(err) => {
                debug!(section = %name, %err, "skipping unreadable debug section");
                continue;
            }
            Ok(_) => {}
        }

        let Some((offset, size)) = section.file_range() else {
            debug!(section = %name, "skipping debug section without file data");
            continue;
        };
        let range = usize::try_from(offset)
            .ok()
            .zip(usize::try_from(size).ok())
            .and_then(|(start, len)| Some(start..start.checked_add(len)?))
            .filter(|range| range.end <= data.len());
        match range {
            Some(range) => sections.insert(name, range),
            None => debug!(section = %name, offset, size, "skipping debug section outside the buffer"),
        }
    }

    Ok(sections)
}

/// `.debug_*` names as-is; Mach-O `__debug_*` names mapped onto them.
fn canonical_debug_name(name: &str) -> Option<String>
{
    if name.starts_with(".debug_") {
        Some(name.to_owned())
    } else {
        name.strip_prefix("__debug_").map(|rest| format!(".debug_{rest}"))
    }
}
