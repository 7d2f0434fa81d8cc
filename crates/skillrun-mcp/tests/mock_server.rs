//! Mock MCP server for integration testing.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout and answers
//! initialize, tools/list, and tools/call.
//!
//! Usage:
//!   mock-mcp-server [--delay-ms N] [--crash-on TOOL] [--garble-on TOOL] [--reverse-pairs]
//!
//! Options:
//!   --delay-ms N       Add N ms delay to all responses
//!   --crash-on TOOL    Exit with code 1 when TOOL is called
//!   --garble-on TOOL   Emit a non-JSON line instead of a response when TOOL is called
//!   --reverse-pairs    Buffer tools/call requests and answer each pair in reverse order

#![allow(dead_code)]

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// JSON-RPC request structure. Notifications lack an id and fail to parse,
/// which is how they get skipped.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

/// Server configuration parsed from the command line.
struct ServerConfig {
    delay_ms: u64,
    crash_on: Option<String>,
    garble_on: Option<String>,
    reverse_pairs: bool,
}

impl ServerConfig {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Self {
            delay_ms: 0,
            crash_on: None,
            garble_on: None,
            reverse_pairs: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--delay-ms" => {
                    if i + 1 < args.len() {
                        config.delay_ms = args[i + 1].parse().unwrap_or(0);
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--crash-on" => {
                    if i + 1 < args.len() {
                        config.crash_on = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--garble-on" => {
                    if i + 1 < args.len() {
                        config.garble_on = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--reverse-pairs" => {
                    config.reverse_pairs = true;
                    i += 1;
                }
                _ => {
                    i += 1;
                }
            }
        }

        config
    }
}

/// Mutable server state accumulated over a session.
#[derive(Default)]
struct ServerState {
    initialize_count: u64,
    /// First half of a buffered tools/call pair (reverse-pairs mode).
    held_call: Option<JsonRpcRequest>,
}

fn main() {
    let config = ServerConfig::from_args();
    let mut state = ServerState::default();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap() == 0 {
            return; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Skip notifications (no id).
        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(_) => continue,
        };

        if config.delay_ms > 0 {
            thread::sleep(Duration::from_millis(config.delay_ms));
        }

        if request.method == "tools/call" {
            let tool_name = tool_name(&request);

            if let Some(ref crash_tool) = config.crash_on {
                if crash_tool == &tool_name {
                    std::process::exit(1);
                }
            }

            if let Some(ref garble_tool) = config.garble_on {
                if garble_tool == &tool_name {
                    writeln!(stdout, "this is definitely not a json-rpc frame").unwrap();
                    stdout.flush().unwrap();
                    continue;
                }
            }

            if config.reverse_pairs {
                match state.held_call.take() {
                    None => {
                        state.held_call = Some(request);
                    }
                    Some(first) => {
                        send(&mut stdout, handle_request(&request, &mut state));
                        send(&mut stdout, handle_request(&first, &mut state));
                    }
                }
                continue;
            }
        }

        let response = handle_request(&request, &mut state);
        send(&mut stdout, response);
    }
}

fn send(stdout: &mut std::io::Stdout, response: JsonRpcResponse) {
    let encoded = serde_json::to_string(&response).unwrap();
    writeln!(stdout, "{}", encoded).unwrap();
    stdout.flush().unwrap();
}

fn tool_name(request: &JsonRpcRequest) -> String {
    request
        .params
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn handle_request(request: &JsonRpcRequest, state: &mut ServerState) -> JsonRpcResponse {
    let result = match request.method.as_str() {
        "initialize" => {
            state.initialize_count += 1;
            Some(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "mock-mcp-server",
                    "version": "1.0.0"
                }
            }))
        }
        "tools/list" => Some(json!({
            "tools": [
                {
                    "name": "ping",
                    "description": "replies pong",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                },
                {
                    "name": "echo",
                    "description": "Echo back the input",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" }
                        },
                        "required": ["message"]
                    }
                },
                {
                    "name": "add",
                    "description": "Add two numbers",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "a": { "type": "number" },
                            "b": { "type": "number" }
                        },
                        "required": ["a", "b"]
                    }
                },
                {
                    "name": "slow",
                    "description": "A slow tool for testing timeouts",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "delay_ms": { "type": "number" }
                        }
                    }
                },
                {
                    "name": "blob",
                    "description": "Returns non-text content",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                },
                {
                    "name": "stats",
                    "description": "Reports session counters",
                    "inputSchema": {
                        "type": "object",
                        "properties": {}
                    }
                }
            ]
        })),
        "tools/call" => {
            let args = request
                .params
                .as_ref()
                .and_then(|p| p.get("arguments"))
                .cloned()
                .unwrap_or(json!({}));

            match tool_name(request).as_str() {
                "ping" => Some(json!({
                    "content": [
                        { "type": "text", "text": "pong" }
                    ]
                })),
                "echo" => {
                    let message = args.get("message").and_then(|v| v.as_str()).unwrap_or("");
                    Some(json!({
                        "content": [
                            { "type": "text", "text": message }
                        ]
                    }))
                }
                "add" => {
                    let a = args.get("a").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    let b = args.get("b").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Some(json!({
                        "content": [
                            { "type": "text", "text": format!("{}", a + b) }
                        ]
                    }))
                }
                "slow" => {
                    let delay = args.get("delay_ms").and_then(|v| v.as_u64()).unwrap_or(1000);
                    thread::sleep(Duration::from_millis(delay));
                    Some(json!({
                        "content": [
                            { "type": "text", "text": format!("Slept for {} ms", delay) }
                        ]
                    }))
                }
                "blob" => Some(json!({
                    "content": [
                        { "type": "text", "text": "attached:" },
                        { "type": "image", "data": "aGVsbG8=", "mimeType": "image/png" }
                    ]
                })),
                "stats" => Some(json!({
                    "content": [
                        { "type": "text", "text": format!("{}", state.initialize_count) }
                    ]
                })),
                other => Some(json!({
                    "content": [
                        { "type": "text", "text": format!("Unknown tool: {}", other) }
                    ],
                    "isError": true
                })),
            }
        }
        _ => None,
    };

    let error = if result.is_none() {
        Some(json!({
            "code": -32601,
            "message": format!("Method not found: {}", request.method)
        }))
    } else {
        None
    };

    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result,
        error,
    }
}
