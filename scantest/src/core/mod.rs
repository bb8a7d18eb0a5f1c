//! Deterministic, pure logic shared by the pipeline stages.
//!
//! Core modules must be free of I/O side effects. Where a stage needs the
//! toolchain, core logic takes a resolver closure so tests can answer from
//! memory.

pub mod cascade;
pub mod checksum;
pub mod failures;
pub mod grouping;
pub mod outcome;
pub mod report;
pub mod types;
