//! Stable exit codes for the scantest binary.
//!
//! The pipeline runs until the process is killed, so there is no success code.

/// The tool cannot continue, e.g. a bad config file or an unwritable report.
pub const FATAL: i32 = 1;
