//! Autopay CLI library
//!
//! Argument parsing, configuration resolution, notifier selection and log
//! setup for the `autopay` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod delivery;
mod error;
mod logging;

pub use commands::Cli;
pub use config::{resolve_portal_config, Verbosity};
pub use delivery::Delivery;
pub use error::{CliError, CliResult};
pub use logging::init_tracing;
