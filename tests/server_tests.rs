mod common;

use common::{parse_json, send_request, CourseTestServer};
use courseapm::courses::LIST_LOG_MESSAGE;

const CATALOGUE: &str = r#"[{"cource_id":"1","name":"Go","price":10,"language":"Go"},{"cource_id":"2","name":"Python","price":20,"language":"Python"}]"#;

#[test]
fn test_list_courses_returns_catalogue() {
    let server = CourseTestServer::new();
    let (status, content_type, body) = server.get("/cources");

    assert_eq!(status, 200);
    assert!(content_type.starts_with("application/json"));
    assert_eq!(body, CATALOGUE);
}

#[test]
fn test_list_courses_emits_one_event_with_one_segment() {
    let server = CourseTestServer::new();
    server.get("/cources");

    let events = server.sink.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.detail_type(), "TransactionEvent");
    assert_eq!(event.source(), "ubc-local");

    let details = event.details();
    let end = details.end_time.expect("finalized transaction has an end time");
    assert!(end >= details.start_time);
    assert_eq!(details.segments.len(), 1);
    let segment = &details.segments[0];
    let seg_end = segment.end_time.expect("segment closed by the handler");
    assert!(seg_end >= segment.start_time);
    assert!(segment.start_time >= details.start_time);
    assert!(seg_end <= end);
}

#[test]
fn test_list_courses_ships_plain_log_line() {
    let server = CourseTestServer::new();
    server.get("/cources");

    let records = server.sink.records();
    assert!(records
        .iter()
        .any(|r| r.payload == LIST_LOG_MESSAGE.as_bytes()));
    assert!(records
        .iter()
        .all(|r| r.log_group == "ubclogs" && r.log_stream == "ubc"));
}

#[test]
fn test_home_is_plain_text_without_segments() {
    let server = CourseTestServer::new();
    let (status, content_type, body) = server.get("/");

    assert_eq!(status, 200);
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body, "API is running");

    let events = server.sink.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].details().segments.is_empty());
}

#[test]
fn test_each_request_gets_its_own_transaction() {
    let server = CourseTestServer::new();
    server.get("/");
    server.get("/cources");
    server.get("/cources");

    let events = server.sink.events();
    assert_eq!(events.len(), 3);
    let mut ids: Vec<_> = events
        .iter()
        .map(|e| e.details().transaction_id.to_string())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    let stats = server.recorder.stats();
    assert_eq!(stats.started, 3);
    assert_eq!(stats.finalized, 3);
    assert_eq!(stats.double_finishes, 0);
}

#[test]
fn test_sink_failure_does_not_change_response() {
    let server = CourseTestServer::new();
    server.sink.set_failing(true);

    let (status, _, body) = server.get("/cources");
    assert_eq!(status, 200);
    assert_eq!(body, CATALOGUE);

    let (status, _, body) = server.get("/");
    assert_eq!(status, 200);
    assert_eq!(body, "API is running");

    assert!(server.sink.records().is_empty());
    let stats = server.recorder.stats();
    assert_eq!(stats.finalized, 2);
    // log line + event for /cources, event for /
    assert_eq!(stats.emission_failures, 3);
}

#[test]
fn test_unknown_route_is_404_json() {
    let server = CourseTestServer::new();
    let (status, content_type, body) = server.get("/courses");

    assert_eq!(status, 404);
    assert!(content_type.starts_with("application/json"));
    let json = parse_json(&body);
    assert_eq!(json["error"], "Not Found");
    assert_eq!(json["method"], "GET");
    assert_eq!(json["path"], "/courses");
    assert!(server.sink.records().is_empty());
}

#[test]
fn test_wrong_method_is_404() {
    let server = CourseTestServer::new();
    let resp = send_request(
        &server.addr(),
        "POST /cources HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n",
    );
    let (status, _, _) = common::parse_response_parts(&resp);
    assert_eq!(status, 404);
}

#[test]
fn test_query_string_does_not_affect_routing() {
    let server = CourseTestServer::new();
    let (status, _, body) = server.get("/cources?limit=1");
    assert_eq!(status, 200);
    assert_eq!(body, CATALOGUE);
}

#[test]
fn test_health_and_metrics_are_not_traced() {
    let server = CourseTestServer::new();

    let (status, _, body) = server.get("/health");
    assert_eq!(status, 200);
    assert_eq!(parse_json(&body)["status"], "ok");

    server.get("/cources");
    let (status, content_type, body) = server.get("/metrics");
    assert_eq!(status, 200);
    assert!(content_type.starts_with("text/plain"));
    assert!(body.contains("courseapm_requests_total 1\n"));
    assert!(body.contains("courseapm_transactions_finalized_total 1\n"));
    assert!(body.contains("courseapm_top_level_requests_total 2\n"));

    assert_eq!(server.sink.events().len(), 1);
}

#[test]
fn test_request_body_is_skipped_before_next_pipelined_request() {
    let server = CourseTestServer::new();
    let resp = send_request(
        &server.addr(),
        "GET /cources HTTP/1.1\r\nHost: localhost\r\nContent-Length: 9\r\n\r\nnot json!\
         GET / HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );

    assert_eq!(resp.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(resp.contains(CATALOGUE));
    assert!(resp.ends_with("API is running"));
    assert_eq!(server.sink.events().len(), 2);
}
