//! Abbreviation tables (`.debug_abbrev`).

use std::collections::HashMap;

use gimli::constants::{self, DwAt, DwForm, DwTag};

use super::reader::{DecodeResult, Reader};

/// One `(attribute, form)` pair declared by an abbreviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec
{
    pub name: DwAt,
    pub form: DwForm,
    /// Value carried inline by `DW_FORM_implicit_const`.
    pub implicit_const: Option<i64>,
}

/// Layout shared by every debug entry that uses the same abbreviation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation
{
    pub code: u64,
    pub tag: DwTag,
    pub has_children: bool,
    pub attributes: Vec<AttributeSpec>,
}

/// Abbreviation code to layout, for one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable
{
    entries: HashMap<u64, Abbreviation>,
}

impl AbbreviationTable
{
    /// Decode the table under `reader` (positioned at the unit's abbreviation offset).
    ///
    /// Running off the end of the section where a new code is expected ends
    /// the table; running off the end inside a record is an error.
    pub(crate) fn parse(reader: &mut Reader<'_>) -> DecodeResult<Self>
    {
        let mut entries = HashMap::new();
        while !reader.is_empty() {
            let code = reader.read_uleb128()?;
            if code == 0 {
                break;
            }
            let tag = u16::try_from(reader.read_uleb128()?).map_err(|_| reader.malformed("tag out of range"))?;
            let has_children = reader.read_u8()? == constants::DW_CHILDREN_yes.0;

            let mut attributes = Vec::new();
            loop {
                let name = reader.read_uleb128()?;
                let form = reader.read_uleb128()?;
                if name == 0 && form == 0 {
                    break;
                }
                let name = u16::try_from(name).map_err(|_| reader.malformed("attribute out of range"))?;
                let form = u16::try_from(form).map_err(|_| reader.malformed("form out of range"))?;
                let form = DwForm(form);
                let implicit_const = if form == constants::DW_FORM_implicit_const {
                    Some(reader.read_sleb128()?)
                } else {
                    None
                };
                attributes.push(AttributeSpec {
                    name: DwAt(name),
                    form,
                    implicit_const,
                });
            }

            entries.entry(code).or_insert(Abbreviation {
                code,
                tag: DwTag(tag),
                has_children,
                attributes,
            });
        }
        Ok(Self { entries })
    }

    pub fn get(&self, code: u64) -> Option<&Abbreviation>
    {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}
