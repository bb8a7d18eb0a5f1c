//! I/O adapters used by the pipeline stages.

pub mod config;
pub mod process;
pub mod toolchain;
pub mod trigger;
pub mod walk;
