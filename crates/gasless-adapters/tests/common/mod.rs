#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};

use gasless_adapters::AdapterConfig;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// JSON-RPC method name, when the body is a JSON-RPC request.
    pub fn rpc_method(&self) -> Option<&str> {
        self.body.get("method").and_then(Value::as_str)
    }
}

/// Serves up to `max_requests` requests with `handler`, recording each one.
pub fn spawn_mock_server<F>(
    max_requests: usize,
    handler: F,
) -> (String, Arc<Mutex<Vec<RecordedRequest>>>)
where
    F: Fn(&RecordedRequest) -> (u16, Value) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);

    thread::spawn(move || {
        for _ in 0..max_requests {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut raw = String::new();
            let _ = req.as_reader().read_to_string(&mut raw);
            let request = RecordedRequest {
                method: req.method().to_string(),
                path: req.url().to_owned(),
                headers: req
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().to_string(), h.value.as_str().to_owned()))
                    .collect(),
                body: serde_json::from_str(&raw).unwrap_or(Value::Null),
            };
            let (code, payload) = handler(&request);
            if let Ok(mut g) = recorded.lock() {
                g.push(request);
            }
            let response = Response::from_string(payload.to_string())
                .with_status_code(StatusCode(code))
                .with_header(
                    "Content-Type: application/json"
                        .parse::<tiny_http::Header>()
                        .expect("content type header"),
                );
            let _ = req.respond(response);
        }
    });

    (addr, calls)
}

pub fn rpc_result(req: &RecordedRequest, result: Value) -> (u16, Value) {
    let id = req.body.get("id").cloned().unwrap_or(json!(1));
    (200, json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

pub fn rpc_error(req: &RecordedRequest, code: i64, message: &str) -> (u16, Value) {
    let id = req.body.get("id").cloned().unwrap_or(json!(1));
    (
        200,
        json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}),
    )
}

pub fn test_config() -> AdapterConfig {
    AdapterConfig {
        http_timeout_ms: 5_000,
        receipt_poll_attempts: 3,
        receipt_poll_interval_ms: 1,
        ..AdapterConfig::default()
    }
}

pub fn hex_word(byte: u8) -> String {
    format!("0x{}", alloy::hex::encode([byte; 32]))
}

pub fn hex_signature(v: u8) -> String {
    let mut sig = vec![0x11; 32];
    sig.extend(vec![0x22; 32]);
    sig.push(v);
    format!("0x{}", alloy::hex::encode(sig))
}
