//! # Configuration
//!
//! Construction-time options for [`DebugInfo`](crate::symbols::DebugInfo).
//!
//! ## Example
//!
//! ```rust
//! use erst_core::config::DebugInfoConfig;
//! use erst_core::symbols::demangle::rust_demangle;
//!
//! let config = DebugInfoConfig {
//!     max_type_depth: 8,
//!     ..DebugInfoConfig::default()
//! }
//! .with_demangler(rust_demangle);
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{ErstError, ErstResult};

/// Pluggable name demangler.
pub type Demangler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options fixed when a module is loaded.
#[derive(Clone)]
pub struct DebugInfoConfig
{
    /// Applied to each function's linkage name (or plain name) and to each
    /// variable name. Defaults to the identity function.
    pub demangler: Demangler,
    /// Deepest entry nesting accepted inside one unit. Default: 256.
    pub max_nesting_depth: usize,
    /// Longest pointer / specification chain followed when resolving names.
    /// Default: 32.
    pub max_type_depth: usize,
    /// Replay line-number programs. When `false`, source lookups always
    /// report `NotFound`. Default: `true`.
    pub line_tables: bool,
}

impl DebugInfoConfig
{
    pub fn with_demangler<F>(mut self, demangler: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.demangler = Arc::new(demangler);
        self
    }

    /// Reject values that would make decoding impossible.
    pub fn validate(&self) -> ErstResult<()>
    {
        if self.max_nesting_depth == 0 {
            return Err(ErstError::InvalidConfig("max_nesting_depth must be at least 1".into()));
        }
        if self.max_type_depth == 0 {
            return Err(ErstError::InvalidConfig("max_type_depth must be at least 1".into()));
        }
        Ok(())
    }

    pub(crate) fn demangle(&self, name: &str) -> String
    {
        (self.demangler)(name)
    }
}

impl Default for DebugInfoConfig
{
    fn default() -> Self
    {
        Self {
            demangler: Arc::new(str::to_owned),
            max_nesting_depth: 256,
            max_type_depth: 32,
            line_tables: true,
        }
    }
}

impl fmt::Debug for DebugInfoConfig
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DebugInfoConfig")
            .field("demangler", &"<fn>")
            .field("max_nesting_depth", &self.max_nesting_depth)
            .field("max_type_depth", &self.max_type_depth)
            .field("line_tables", &self.line_tables)
            .finish()
    }
}
