//! Command-line interface

pub mod commands;
pub mod handlers;

pub use commands::build_cli;
pub use handlers::{exit_code, format_error, run_cli};
