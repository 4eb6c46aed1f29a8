//! Runtime module: process startup and backend selection.

pub mod boot;
