//! Command line interface module
//!
//! Argument parsing and the runner that turns a validated configuration
//! into a listening gateway.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
