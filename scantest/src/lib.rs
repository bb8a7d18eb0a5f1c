//! Continuous, incremental test orchestrator for Go source trees.
//!
//! The crate polls a working tree and re-runs only the Go packages affected by
//! an edit. Work flows through six stages, each on its own thread:
//!
//! scanner -> detector -> grouper -> selector -> runner -> printer
//!
//! The architecture keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (checksums, grouping, cascade
//!   selection, failure parsing, report rendering). No I/O.
//! - **[`io`]**: Side-effecting operations (filesystem walks, the Go
//!   toolchain, configuration, stdin).
//! - **[`stages`]**: One long-lived actor per pipeline stage, coordinating core
//!   logic with I/O over [`batch`] channels.
//!
//! [`pipeline`] wires the stages together.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
