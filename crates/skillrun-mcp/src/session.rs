//! MCP session protocol engine.
//!
//! A [`Session`] owns one handshake-completed connection: the write half of
//! the duplex channel, the request-id counter, and the pending-request map
//! shared with a background reader task that correlates inbound frames to
//! their requests by id. Correlation never assumes in-order delivery.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, ListToolsResult, RpcNotification,
    RpcRequest, RpcResponse, ServerInfo, ToolCallResult, ToolDescriptor,
};
use crate::transport::StdioTransport;

/// Why the reader task gave up on a pending request.
#[derive(Debug, Clone)]
enum ReaderError {
    /// An inbound frame could not be parsed; correlation is unrecoverable.
    Corrupt(String),
    /// The channel reached EOF or failed; the server is gone.
    Closed,
}

impl From<ReaderError> for McpError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::Corrupt(msg) => McpError::Protocol(msg),
            ReaderError::Closed => McpError::Closed,
        }
    }
}

type PendingSlot = oneshot::Sender<std::result::Result<RpcResponse, ReaderError>>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingSlot>>>;

/// Options governing a session's request handling.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Per-request timeout. `None` waits indefinitely; set a bound when the
    /// server cannot be trusted to always answer.
    pub request_timeout: Option<Duration>,
}

/// One active, handshake-completed MCP connection.
///
/// Created by [`Session::initialize`]; never reused after [`Session::close`].
pub struct Session {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Option<Child>>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    // Shared with the reader task, which sets it on its way out so a dead
    // connection rejects new requests instead of parking them forever.
    closed: Arc<AtomicBool>,
    options: SessionOptions,
    server: ServerInfo,
}

impl Session {
    /// Perform the MCP handshake over a freshly spawned transport.
    ///
    /// On any handshake failure the transport is torn down and the error
    /// returned; the caller may retry with a new transport.
    pub async fn initialize(transport: StdioTransport, options: SessionOptions) -> Result<Self> {
        let (child, stdin, stdout) = transport.into_parts();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let reader = spawn_reader(stdout, Arc::clone(&pending), Arc::clone(&closed));

        let mut session = Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(Some(child)),
            pending,
            next_id: AtomicU64::new(1),
            reader,
            closed,
            options,
            server: ServerInfo {
                name: String::new(),
                version: String::new(),
            },
        };

        match session.handshake().await {
            Ok(info) => {
                tracing::info!(
                    server = %info.name,
                    version = %info.version,
                    "MCP session ready"
                );
                session.server = info;
                Ok(session)
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<ServerInfo> {
        let params = InitializeParams::default();
        let result = self
            .request("initialize", Some(serde_json::to_value(&params)?))
            .await?;

        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::protocol(format!("malformed initialize result: {e}")))?;

        self.notify("notifications/initialized", None).await?;

        Ok(init.server_info)
    }

    /// Identity the server reported during the handshake.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// List the tools the server advertises, in server order, following
    /// pagination cursors when present.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.take().map(|c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;

            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::protocol(format!("malformed tools/list result: {e}")))?;

            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = tools.len(), "listed tools");
        Ok(tools)
    }

    /// Invoke a tool. `arguments` may be empty but is always sent.
    ///
    /// A response the server marks with `isError` becomes
    /// [`McpError::ToolFailed`] carrying the tool's own message, distinct
    /// from transport and protocol failures.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> Result<ToolCallResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: Value::Object(arguments),
        };

        let result = self
            .request("tools/call", Some(serde_json::to_value(&params)?))
            .await?;

        let outcome: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| McpError::protocol(format!("malformed tools/call result: {e}")))?;

        if outcome.is_error() {
            let message = outcome
                .text()
                .unwrap_or_else(|| format!("tool '{name}' reported failure"));
            tracing::warn!(tool = name, "tool reported failure");
            return Err(McpError::ToolFailed(message));
        }

        tracing::debug!(tool = name, items = outcome.content.len(), "tool call succeeded");
        Ok(outcome)
    }

    /// Tear the session down: abort the reader, close the channel, kill and
    /// reap the server process.
    ///
    /// Best-effort by contract: all teardown errors are swallowed, and
    /// repeated calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.reader.abort();

        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }

        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
            let _ = child.wait().await;
        }

        fail_all(&self.pending, ReaderError::Closed).await;
        tracing::debug!(server = %self.server.name, "session closed");
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and wait for its correlated response.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }

        let id = self.next_request_id();
        let (tx, rx) = oneshot::channel();

        // The slot must exist before the frame is written, or a fast server
        // could answer into the void.
        self.pending.lock().await.insert(id, tx);

        let request = RpcRequest::new(id, method, params);
        if let Err(e) = self.write_frame(&serde_json::to_value(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        // The reader may have died between the gate above and the insert.
        // It sets `closed` before draining the map, so after this check the
        // slot is either drained (rx resolves) or it was never going to be.
        if self.is_closed() {
            self.pending.lock().await.remove(&id);
            return Err(McpError::Closed);
        }

        let received = match self.options.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    // Drop the slot so a late response cannot be misdelivered;
                    // other in-flight requests keep their entries.
                    self.pending.lock().await.remove(&id);
                    tracing::warn!(method, id, "request timed out");
                    return Err(McpError::Timeout);
                }
            },
            None => rx.await,
        };

        let response = received
            .map_err(|_| McpError::Closed)?
            .map_err(McpError::from)?;

        response
            .into_result()
            .map_err(|e| McpError::rpc(e.code, e.message, e.data))
    }

    /// Send a notification; no response is expected.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = RpcNotification::new(method, params);
        self.write_frame(&serde_json::to_value(&notification)?).await
    }

    async fn write_frame(&self, frame: &Value) -> Result<()> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;

        tracing::trace!(frame = %line.trim_end(), "sent frame");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The child itself is killed on drop by the transport's kill_on_drop.
        self.reader.abort();
    }
}

/// Spawn the task that reads inbound frames and dispatches them by id.
///
/// Well-formed frames without a result or error (server-initiated requests
/// and notifications) are ignored. An unparseable line poisons correlation,
/// so every pending request is failed and the task exits; EOF fails them
/// with a closed-connection error instead.
///
/// On every exit path the task marks the session closed *before* draining
/// the pending map, so no request registered afterwards can wait on a
/// dispatch that will never come.
fn spawn_reader<R>(stream: R, pending: PendingMap, closed: Arc<AtomicBool>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();

        let exit = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break ReaderError::Closed,
                Err(e) => {
                    tracing::debug!(error = %e, "read error on channel");
                    break ReaderError::Closed;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let frame: Value = match serde_json::from_str(line) {
                Ok(frame) => frame,
                Err(e) => break ReaderError::Corrupt(format!("unparseable frame: {e}")),
            };

            let Some(id) = frame.get("id").and_then(Value::as_u64) else {
                tracing::trace!(frame = %line, "ignoring non-response frame");
                continue;
            };

            if frame.get("result").is_none() && frame.get("error").is_none() {
                // A request from the server; this client does not serve.
                tracing::trace!(id, "ignoring server-initiated request");
                continue;
            }

            match serde_json::from_value::<RpcResponse>(frame) {
                Ok(response) => {
                    if let Some(tx) = pending.lock().await.remove(&id) {
                        let _ = tx.send(Ok(response));
                    } else {
                        tracing::warn!(id, "response for unknown request id");
                    }
                }
                Err(e) => break ReaderError::Corrupt(format!("malformed response frame: {e}")),
            }
        };

        closed.store(true, Ordering::SeqCst);
        fail_all(&pending, exit).await;
        tracing::debug!("reader task exited");
    })
}

async fn fail_all(pending: &PendingMap, error: ReaderError) {
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(error.clone()));
    }
}
