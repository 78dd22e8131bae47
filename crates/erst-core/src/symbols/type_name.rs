//! Type-name resolution.

use gimli::constants;

use super::DebugInfo;
use crate::dwarf::entry::Tag;
use crate::dwarf::form::AttrValue;

const UNKNOWN: &str = "unknown";

impl DebugInfo
{
    /// Name of the type entry at `offset`.
    ///
    /// Named types (typedef, base, struct, union, enum) return their name;
    /// pointers return `"*"` followed by the pointee's name (`"*void"` when
    /// there is no pointee). Anything else, including chains longer than
    /// `max_type_depth`, is `"unknown"`.
    pub fn resolve_type_name(&self, offset: u64) -> String
    {
        // An acyclic chain visits each entry at most once.
        let limit = self.config.max_type_depth.min(self.nodes().len().saturating_add(1));
        let mut current = offset;
        let mut stars = 0;

        for _ in 0..limit {
            let Some(node) = self.node(current) else {
                return pointer_to(stars, UNKNOWN);
            };
            match node.tag {
                Tag::Typedef | Tag::BaseType | Tag::StructType | Tag::UnionType | Tag::EnumerationType => {
                    let name = self.attr_string(node, constants::DW_AT_name);
                    return pointer_to(stars, name.as_deref().unwrap_or(UNKNOWN));
                }
                Tag::PointerType => match node.attr(constants::DW_AT_type).and_then(AttrValue::as_reference) {
                    Some(pointee) => {
                        stars += 1;
                        current = pointee;
                    }
                    None => return pointer_to(stars + 1, "void"),
                },
                _ => return pointer_to(stars, UNKNOWN),
            }
        }
        UNKNOWN.to_string()
    }
}

fn pointer_to(stars: usize, name: &str) -> String
{
    let mut out = "*".repeat(stars);
    out.push_str(name);
    out
}
