//! I/O for assembler runs: configuration, input loading, artifact output.

pub mod config;
pub mod loader;
pub mod writer;
