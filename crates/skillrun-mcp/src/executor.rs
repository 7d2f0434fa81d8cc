//! Executor facade: one launch spec, one lazily created session.
//!
//! The facade is the single object an embedding caller uses. Every operation
//! connects on first use, so callers never sequence a handshake themselves.

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::catalog::{self, ToolSummary};
use crate::config::LaunchSpec;
use crate::error::{McpError, Result};
use crate::protocol::{ToolCallResult, ToolDescriptor};
use crate::session::{Session, SessionOptions};
use crate::transport::StdioTransport;

/// Client-side executor for one MCP server.
///
/// Owns the launch spec for the server's lifetime and at most one live
/// [`Session`]. Operations lazily establish the connection;
/// [`close`](Self::close) is idempotent and never fails.
pub struct Executor {
    spec: LaunchSpec,
    options: SessionOptions,
    // Holding this lock across an operation also serializes handshakes:
    // at most one connect attempt is ever in flight.
    session: Mutex<Option<Session>>,
}

impl Executor {
    /// Create an executor with default session options (no request timeout).
    pub fn new(spec: LaunchSpec) -> Result<Self> {
        Self::with_options(spec, SessionOptions::default())
    }

    /// Create an executor with explicit session options.
    ///
    /// Fails fast when no Tokio runtime is available: the engine needs one
    /// for the server process and its reader task, and surfacing that here
    /// beats failing on every later call.
    pub fn with_options(spec: LaunchSpec, options: SessionOptions) -> Result<Self> {
        tokio::runtime::Handle::try_current().map_err(|e| {
            McpError::Runtime(format!(
                "a tokio runtime is required to drive the MCP session: {e}"
            ))
        })?;

        Ok(Self {
            spec,
            options,
            session: Mutex::new(None),
        })
    }

    /// Establish the connection if it does not exist yet.
    ///
    /// Idempotent: a ready session is left untouched. A failed handshake
    /// leaves the executor unconnected, so the next call retries cleanly.
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        self.ensure_session(&mut slot).await?;
        Ok(())
    }

    /// List the server's tools as description-only summaries, in server
    /// order.
    pub async fn list_tools(&self) -> Result<Vec<ToolSummary>> {
        let mut slot = self.session.lock().await;
        let session = self.ensure_session(&mut slot).await?;
        let result = session.list_tools().await;
        reap_if_dead(&mut slot, &result).await;
        Ok(catalog::summaries(&result?))
    }

    /// Fetch the full descriptor for one tool, or `None` when the server
    /// does not advertise it.
    pub async fn describe_tool(&self, name: &str) -> Result<Option<ToolDescriptor>> {
        let mut slot = self.session.lock().await;
        let session = self.ensure_session(&mut slot).await?;
        let result = session.list_tools().await;
        reap_if_dead(&mut slot, &result).await;
        Ok(catalog::find_tool(&result?, name).cloned())
    }

    /// Invoke a tool with the given arguments (possibly empty, never
    /// absent).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResult> {
        let mut slot = self.session.lock().await;
        let session = self.ensure_session(&mut slot).await?;
        let result = session.call_tool(name, arguments).await;
        reap_if_dead(&mut slot, &result).await;
        result
    }

    /// Tear down the session, if any. Never fails; safe on a never-connected
    /// executor and on repeated calls. A later operation opens a fresh
    /// session.
    pub async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.close().await;
        }
    }

    async fn ensure_session<'a>(&self, slot: &'a mut Option<Session>) -> Result<&'a Session> {
        match slot {
            Some(session) => Ok(session),
            None => {
                let transport = StdioTransport::spawn(&self.spec)?;
                let session = Session::initialize(transport, self.options.clone()).await?;
                Ok(slot.insert(session))
            }
        }
    }
}

/// Drop a session whose connection is gone, so the next operation lazily
/// opens a fresh one. A corrupt stream or dead server is unrecoverable for
/// the session, but not for the executor.
async fn reap_if_dead<T>(slot: &mut Option<Session>, result: &Result<T>) {
    if matches!(result, Err(McpError::Closed | McpError::Protocol(_))) {
        if let Some(session) = slot.take() {
            tracing::debug!("dropping dead session");
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_outside_runtime_fails_fast() {
        let result = Executor::new(LaunchSpec::new("echo-server"));
        match result {
            Ok(_) => panic!("expected construction to fail without a runtime"),
            Err(err) => assert!(matches!(err, McpError::Runtime(_))),
        }
    }

    #[tokio::test]
    async fn test_new_inside_runtime_succeeds() {
        assert!(Executor::new(LaunchSpec::new("echo-server")).is_ok());
    }

    #[tokio::test]
    async fn test_connect_nonexistent_command_fails_and_is_retryable() {
        let executor = Executor::new(LaunchSpec::new("nonexistent-mcp-server-12345")).unwrap();

        let first = executor.connect().await;
        assert!(matches!(first, Err(McpError::Spawn(_))));

        // The failure left no half-open state behind.
        let second = executor.connect().await;
        assert!(matches!(second, Err(McpError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_close_never_connected_is_safe() {
        let executor = Executor::new(LaunchSpec::new("echo-server")).unwrap();
        executor.close().await;
        executor.close().await;
    }
}
