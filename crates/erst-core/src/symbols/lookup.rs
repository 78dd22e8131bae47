//! Address queries and the frame façade.

use tracing::debug;

use super::DebugInfo;
use crate::error::{ErstError, ErstResult};
use crate::types::{Frame, LocalVariable, SourceLocation, Subprogram};

impl DebugInfo
{
    /// First subprogram, in entry order, whose `[low_pc, high_pc)` contains
    /// `address`.
    pub fn find_subprogram_at(&self, address: u64) -> ErstResult<&Subprogram>
    {
        self.list_subprograms()
            .iter()
            .find(|subprogram| subprogram.contains(address))
            .ok_or(ErstError::NotFound {
                what: "subprogram",
                address,
            })
    }

    /// Variables of the containing subprogram that are live at `address`.
    ///
    /// ## Errors
    ///
    /// - [`ErstError::NotFound`] if no subprogram covers `address`
    /// - [`ErstError::NoLocalVars`] if none of its variables is live there,
    ///   including when it has no variables at all
    pub fn find_local_vars_at(&self, address: u64) -> ErstResult<Vec<LocalVariable>>
    {
        let subprogram = self.find_subprogram_at(address)?;
        let live: Vec<_> = subprogram
            .local_variables
            .iter()
            .filter(|var| var.is_live_at(address))
            .cloned()
            .collect();
        if live.is_empty() {
            return Err(ErstError::NoLocalVars { address });
        }
        Ok(live)
    }

    /// Source position of `address`: the first unit whose line table has a
    /// statement row at or below it within a sequence that covers it.
    pub fn source_location(&self, address: u64) -> ErstResult<SourceLocation>
    {
        self.units
            .iter()
            .filter_map(|unit| unit.line_table())
            .find_map(|table| {
                let row = table.lookup(address)?;
                Some(SourceLocation {
                    file: table.file_name(row.file).unwrap_or_default().to_owned(),
                    line: row.line,
                    column: row.column,
                })
            })
            .ok_or(ErstError::NotFound {
                what: "source location",
                address,
            })
    }

    /// Everything known about `address`.
    ///
    /// `return_address` and `frame_pointer` are passed through. A missing
    /// source location becomes `None` and no live variables become an empty
    /// list; only a missing subprogram is an error.
    pub fn explain(&self, address: u64, return_address: u64, frame_pointer: u64) -> ErstResult<Frame>
    {
        let subprogram = self.find_subprogram_at(address)?;

        let source_location = match self.source_location(address) {
            Ok(location) => Some(location),
            Err(err) => {
                debug!(%err, "explaining frame without source location");
                None
            }
        };
        let local_variables = match self.find_local_vars_at(address) {
            Ok(vars) => vars,
            Err(ErstError::NoLocalVars { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };

        Ok(Frame {
            address,
            function: subprogram.display_name().to_owned(),
            source_location,
            local_variables,
            return_address,
            frame_pointer,
        })
    }
}
