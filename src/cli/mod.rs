//! # CLI Module
//!
//! Command-line entry points for the `courseapm` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the HTTP service and block until SIGINT or SIGTERM:
//!
//! ```bash
//! courseapm serve --config courseapm.yaml --addr 127.0.0.1:8000
//! ```
//!
//! `sink.kind: memory` is refused here; it is only for tests.
//!
//! On shutdown the server stops accepting connections and a background
//! emitter, if configured, delivers everything still queued before exit.
//!
//! ### `logs`
//!
//! Print the last hour of events from the configured CloudWatch log group:
//!
//! ```bash
//! courseapm logs --minutes 15 --stream ubc
//! ```
//!
//! `--group` and `--stream` default to the `apm` section of the configuration.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use courseapm::cli::{run, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["courseapm", "serve", "--addr", "127.0.0.1:8000"]);
//! run(cli)?;
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{load_serve_config, print_recent_logs, run, run_cli, Cli, Commands};
