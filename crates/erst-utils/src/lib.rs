//! # erst Utilities
//!
//! Logging infrastructure shared by the erst binaries.
//!
//! The core library only emits `tracing` events; installing a subscriber is
//! left to whichever binary embeds it, through [`init_logging`].

pub mod logging;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
