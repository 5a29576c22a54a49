//! Database record structures.
//!
//! - [`metrics`]: tenant-defined metric configuration rows
//! - [`logs`]: the message-log row subset visible to the matcher

pub mod logs;
pub mod metrics;
