//! Logs module: turning raw daemon log text into structured entries.

pub mod parser;

pub use parser::{LineError, LogParser};
