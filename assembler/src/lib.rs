//! Mode/persona configuration assembler.
//!
//! Reads a tree of mode templates and persona documents, validates both
//! against fixed section grammars, resolves which personas each mode can
//! reach, and writes one assembled artifact per valid mode. The architecture
//! keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, grammar checks, tree
//!   resolution, rendering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (configuration, directory loading,
//!   artifact writes).
//!
//! [`pipeline`] wires the stages together and [`report`] turns the collected
//! issues into the consolidated end-of-run report.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
