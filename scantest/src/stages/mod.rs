//! Long-lived pipeline stages.
//!
//! Each stage owns its private state and its channel ends. `run` consumes the
//! stage and loops until its upstream closes or its downstream hangs up.

pub mod detector;
pub mod grouper;
pub mod printer;
pub mod runner;
pub mod scanner;
pub mod selector;
