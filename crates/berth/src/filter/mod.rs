//! In-memory filtering of list results.

pub mod engine;

pub use engine::FilterEngine;
