//! Stable exit codes for the assembler CLI.

/// Run completed without any error-severity issue.
pub const OK: i32 = 0;
/// At least one error-severity issue was reported (unaffected modes are still written).
pub const INVALID: i32 = 1;
/// Unrecoverable failure: unreadable input root, bad config, or an output write failed.
pub const FATAL: i32 = 2;
