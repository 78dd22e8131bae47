//! Half-open program-counter ranges.

use std::fmt;

/// Address interval `[start, end)`.
///
/// An inverted range (`end < start`) is empty rather than an error, so
/// malformed `high_pc` values simply never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PcRange
{
    pub start: u64,
    pub end: u64,
}

impl PcRange
{
    pub const fn new(start: u64, end: u64) -> Self
    {
        Self { start, end }
    }

    pub const fn contains(&self, address: u64) -> bool
    {
        self.start <= address && address < self.end
    }

    pub const fn is_empty(&self) -> bool
    {
        self.end <= self.start
    }

    pub const fn len(&self) -> u64
    {
        self.end.saturating_sub(self.start)
    }
}

impl fmt::Display for PcRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}
