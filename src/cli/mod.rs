//! Command Line Interface (CLI) layer for lidarkit.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that dispatches each subcommand
//! to the library functionality exposed via `lidarkit::api`.
//!
//! If you are embedding lidarkit into another application, prefer using
//! the high-level `lidarkit::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
