//! Error types for MCP client operations.

use thiserror::Error;

/// Result type for MCP client operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for MCP client operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to spawn the MCP server process.
    #[error("failed to spawn MCP server: {0}")]
    Spawn(String),

    /// The duplex channel to the server broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed frame, handshake, or response shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on the duplex channel.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered a request with a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    Rpc {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// The tool ran but reported failure (protocol-level success).
    #[error("tool failed: {0}")]
    ToolFailed(String),

    /// A request exceeded its configured timeout.
    #[error("timed out waiting for response")]
    Timeout,

    /// The connection or session is closed.
    #[error("connection closed")]
    Closed,

    /// A runtime capability the engine depends on is unavailable.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl McpError {
    /// Create a spawn error.
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a server error from a JSON-RPC error object.
    pub fn rpc(code: i64, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// True when the remote tool itself reported failure, as opposed to a
    /// transport or protocol fault. Callers can surface these verbatim.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::ToolFailed(_))
    }
}
