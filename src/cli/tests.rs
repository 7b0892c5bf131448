//! Unit tests for CLI parsing

use crate::cli::{load_serve_config, Cli, Commands};
use crate::config::{ConfigError, SinkKind};
use clap::Parser;
use std::io::Write;

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["courseapm", "serve"]).unwrap();
    match cli.command {
        Commands::Serve { addr, config } => {
            assert!(addr.is_none());
            // COURSEAPM_CONFIG is not set in the test environment
            if std::env::var_os("COURSEAPM_CONFIG").is_none() {
                assert!(config.is_none());
            }
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_serve_with_flags() {
    let cli = Cli::try_parse_from([
        "courseapm",
        "serve",
        "--addr",
        "127.0.0.1:9000",
        "--config",
        "courseapm.yaml",
    ])
    .unwrap();
    match cli.command {
        Commands::Serve { addr, config } => {
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert_eq!(config.unwrap().to_string_lossy(), "courseapm.yaml");
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_logs_defaults_to_one_hour() {
    let cli = Cli::try_parse_from(["courseapm", "logs"]).unwrap();
    match cli.command {
        Commands::Logs {
            group,
            streams,
            minutes,
            ..
        } => {
            assert!(group.is_none());
            assert!(streams.is_empty());
            assert_eq!(minutes, 60);
        }
        _ => panic!("Expected Logs command"),
    }
}

#[test]
fn test_logs_accepts_repeated_streams() {
    let cli = Cli::try_parse_from([
        "courseapm",
        "logs",
        "--group",
        "ubclogs",
        "--stream",
        "a",
        "--stream",
        "b",
        "--minutes",
        "5",
    ])
    .unwrap();
    match cli.command {
        Commands::Logs {
            group,
            streams,
            minutes,
            ..
        } => {
            assert_eq!(group.as_deref(), Some("ubclogs"));
            assert_eq!(streams, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(minutes, 5);
        }
        _ => panic!("Expected Logs command"),
    }
}

#[test]
fn test_negative_minutes_rejected() {
    assert!(Cli::try_parse_from(["courseapm", "logs", "--minutes", "-5"]).is_err());
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["courseapm", "generate"]).is_err());
}

fn config_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_serve_config_applies_addr_override() {
    let file = config_file("http:\n  addr: 0.0.0.0:8000\nsink:\n  kind: log\n");
    let config = load_serve_config(Some("127.0.0.1:9001".into()), Some(file.path())).unwrap();
    assert_eq!(config.http.addr, "127.0.0.1:9001");
    assert_eq!(config.sink.kind, SinkKind::Log);
}

#[test]
fn test_serve_refuses_memory_sink() {
    // COURSEAPM_SINK would override the file
    if std::env::var_os("COURSEAPM_SINK").is_some() {
        return;
    }
    let file = config_file("sink:\n  kind: memory\n");
    let err = load_serve_config(None, Some(file.path())).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MemorySinkNotServable)
    ));
}
