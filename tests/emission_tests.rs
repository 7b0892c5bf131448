mod common;

use common::{free_addr, parse_response_parts, send_request};
use courseapm::apm::TransactionRecorder;
use courseapm::config::{AppConfig, EmissionMode};
use courseapm::courses::CourseStore;
use courseapm::registry::build_service;
use courseapm::runtime_config::RuntimeConfig;
use courseapm::server::HttpServer;
use std::sync::Arc;

const CONFIG: &str = "apm:\n  log_group: test-group\n  log_stream: test-stream\n  emission: background\n  queue_bound: 16\nsink:\n  kind: memory\n";

#[test]
fn test_background_emission_drains_on_shutdown() {
    common::setup_may_runtime();
    let config = AppConfig::from_yaml(CONFIG).unwrap();
    assert_eq!(config.apm.emission, EmissionMode::Background);

    let stack = config.build_emitter().unwrap();
    let memory = stack.memory.clone().unwrap();
    let recorder = Arc::new(TransactionRecorder::new(
        Arc::clone(&stack.emitter),
        config.apm.recorder.clone(),
    ));
    let service = build_service(
        recorder,
        Arc::new(CourseStore::seeded()),
        RuntimeConfig::default(),
    )
    .unwrap();
    let handle = HttpServer(service).start(free_addr()).unwrap();
    handle.wait_ready().unwrap();

    for _ in 0..3 {
        let resp = send_request(
            &handle.addr(),
            "GET /cources HTTP/1.1\r\nHost: localhost\r\n\r\n",
        );
        assert_eq!(parse_response_parts(&resp).0, 200);
    }
    handle.stop();
    stack.shutdown();

    let records = memory.records();
    // one log line and one event per request
    assert_eq!(records.len(), 6);
    assert!(records
        .iter()
        .all(|r| r.log_group == "test-group" && r.log_stream == "test-stream"));
    assert_eq!(memory.events().len(), 3);
    let background = stack.background.as_ref().unwrap();
    assert_eq!(background.pending(), 0);
    assert_eq!(background.delivered(), 6);
}
