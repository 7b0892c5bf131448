#![allow(dead_code)]

use courseapm::apm::{RecorderSettings, TransactionRecorder};
use courseapm::courses::CourseStore;
use courseapm::emitter::MemoryEmitter;
use courseapm::registry::build_service;
use courseapm::runtime_config::RuntimeConfig;
use courseapm::server::{HttpServer, ServerHandle};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Once};
use std::time::Duration;

static MAY_INIT: Once = Once::new();

/// Configure May coroutines once per test binary
pub fn setup_may_runtime() {
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
    });
}

/// Reserve a free local port.
pub fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// The full service on a random port, recording into memory.
///
/// Stops the server on drop.
pub struct CourseTestServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
    pub sink: Arc<MemoryEmitter>,
    pub recorder: Arc<TransactionRecorder>,
}

impl CourseTestServer {
    pub fn new() -> Self {
        setup_may_runtime();
        let sink = Arc::new(MemoryEmitter::new());
        let recorder = Arc::new(TransactionRecorder::new(
            sink.clone(),
            RecorderSettings::default(),
        ));
        let service = build_service(
            Arc::clone(&recorder),
            Arc::new(CourseStore::seeded()),
            RuntimeConfig::default(),
        )
        .unwrap();

        let handle = HttpServer(service).start(free_addr()).unwrap();
        handle.wait_ready().unwrap();
        let addr = handle.addr();
        Self {
            handle: Some(handle),
            addr,
            sink,
            recorder,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn get(&self, path: &str) -> (u16, String, String) {
        let resp = send_request(
            &self.addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        );
        parse_response_parts(&resp)
    }
}

impl Drop for CourseTestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

pub fn send_request(addr: &SocketAddr, req: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {e:?}"),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// `(status, content-type, body)`
pub fn parse_response_parts(resp: &str) -> (u16, String, String) {
    let (headers, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
    let mut status = 0;
    let mut content_type = String::new();
    for line in headers.lines() {
        if line.starts_with("HTTP/1.1") {
            status = line
                .split_whitespace()
                .nth(1)
                .unwrap_or("0")
                .parse()
                .unwrap();
        } else if let Some((name, val)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-type") {
                content_type = val.trim().to_string();
            }
        }
    }
    (status, content_type, body.to_string())
}

pub fn parse_json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_default()
}
