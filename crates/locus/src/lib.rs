//! Locus CLI library
//!
//! Command definitions, handlers and output formatting behind the `locus`
//! binary. Discovery itself lives in `locus-core`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod commands;
pub mod output;

pub use cli::{build_cli, run_cli};
