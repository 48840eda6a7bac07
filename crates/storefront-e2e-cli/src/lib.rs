//! storefront-e2e CLI library
//!
//! Command-line front end for the storefront scenario suite: argument
//! parsing, configuration layering and terminal reporting.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, RunArgs, SuiteArgs, ZeroBadgeArg};
pub use error::{CliError, CliResult};
pub use output::Reporter;
pub use runner::{build_suite_config, run_suite, select_scenarios};
