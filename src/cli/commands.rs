use crate::{
    apm::TransactionRecorder,
    config::AppConfig,
    courses::CourseStore,
    emitter::{CloudWatchLogsClient, LogEventRecord},
    logging::{init_logging, LogConfig},
    registry::build_service,
    runtime_config::RuntimeConfig,
    server::{HttpServer, ServerHandle},
};
use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line interface for the course catalogue service
#[derive(Parser)]
#[command(name = "courseapm")]
#[command(about = "Course catalogue API with per-request transaction tracing", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address, overrides `http.addr`
        #[arg(long)]
        addr: Option<String>,

        /// YAML configuration file
        #[arg(short, long, env = "COURSEAPM_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print recent events from the CloudWatch log group
    Logs {
        /// YAML configuration file
        #[arg(short, long, env = "COURSEAPM_CONFIG")]
        config: Option<PathBuf>,

        /// Log group, defaults to `apm.log_group`
        #[arg(long)]
        group: Option<String>,

        /// Log stream to read (repeatable), defaults to `apm.log_stream`
        #[arg(long = "stream")]
        streams: Vec<String>,

        /// How far back to look
        #[arg(long, default_value_t = 60)]
        minutes: u32,
    },
}

/// Parse the command line and run the selected command.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

/// Run an already-parsed command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { addr, config } => serve(addr, config),
        Commands::Logs {
            config,
            group,
            streams,
            minutes,
        } => logs(config, group, streams, minutes),
    }
}

/// Load the configuration for `serve` and apply the `--addr` override.
pub fn load_serve_config(
    addr: Option<String>,
    config_path: Option<&Path>,
) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(config_path).context("Failed to load configuration")?;
    if let Some(addr) = addr {
        config.http.addr = addr;
    }
    config
        .validate_for_serve()
        .context("Configuration cannot be served")?;
    Ok(config)
}

fn serve(addr: Option<String>, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;

    let config = load_serve_config(addr, config_path.as_deref())?;

    let runtime = RuntimeConfig::from_env();
    may::config().set_stack_size(runtime.stack_size);

    let stack = config
        .build_emitter()
        .context("Failed to build the event emitter")?;
    let recorder = Arc::new(TransactionRecorder::new(
        Arc::clone(&stack.emitter),
        config.apm.recorder.clone(),
    ));
    let service = build_service(recorder, Arc::new(CourseStore::seeded()), runtime)
        .context("Failed to compile routes")?;

    let handle = HttpServer(service)
        .start(config.http.addr.as_str())
        .with_context(|| format!("Failed to bind {}", config.http.addr))?;
    info!(
        addr = %handle.addr(),
        sink = ?config.sink.kind,
        emission = ?config.apm.emission,
        "Service started"
    );

    wait_for_shutdown(handle)?;
    stack.shutdown();
    info!("Shutdown complete");
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("Server coroutine panicked"))
}

fn logs(
    config_path: Option<PathBuf>,
    group: Option<String>,
    streams: Vec<String>,
    minutes: u32,
) -> anyhow::Result<()> {
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    let client = config
        .sink
        .cloudwatch_client()
        .context("Failed to create the CloudWatch client")?;

    let group = group.unwrap_or_else(|| config.apm.recorder.log_group.clone());
    let streams = if streams.is_empty() {
        vec![config.apm.recorder.log_stream.clone()]
    } else {
        streams
    };
    let end = Utc::now();
    let start = end - ChronoDuration::minutes(i64::from(minutes));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_recent_logs(
        &client,
        &group,
        &streams,
        start.timestamp_millis(),
        end.timestamp_millis(),
        &mut out,
    )?;
    Ok(())
}

/// Write each stream's events between `start_millis` and `end_millis`.
///
/// A stream that cannot be read is reported and skipped. Returns the number
/// of events written.
pub fn print_recent_logs<W: Write>(
    client: &CloudWatchLogsClient,
    group: &str,
    streams: &[String],
    start_millis: i64,
    end_millis: i64,
    out: &mut W,
) -> io::Result<usize> {
    let mut printed = 0;
    for stream in streams {
        let events = match client.filter_log_events(
            group,
            std::slice::from_ref(stream),
            start_millis,
            end_millis,
        ) {
            Ok(events) => events,
            Err(err) => {
                warn!(group = %group, stream = %stream, error = %err, "Failed to fetch log events");
                writeln!(out, "Failed to fetch logs for stream '{stream}': {err}")?;
                continue;
            }
        };
        writeln!(out, "Logs for log stream '{stream}':")?;
        for LogEventRecord { message, .. } in events {
            writeln!(out, "{message}")?;
            printed += 1;
        }
    }
    Ok(printed)
}
