//! MCP (Model Context Protocol) stdio client engine for skillrun.
//!
//! This crate connects to a subprocess-hosted MCP server, performs the
//! protocol handshake, and exposes tool discovery and invocation as a typed
//! API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Executor                                                   │
//! │  - Owns one LaunchSpec and one lazily created Session       │
//! │  - list / describe / call, idempotent close                 │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session                                                    │
//! │  - initialize handshake, tools/list, tools/call             │
//! │  - correlates responses to requests by id                   │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StdioTransport                                             │
//! │  - spawns the server process, pipes stdin/stdout            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use skillrun_mcp::{Executor, LaunchSpec};
//!
//! let spec = LaunchSpec::new("mcp-server-sqlite")
//!     .with_arg("--db")
//!     .with_arg("/path/to/database.db");
//!
//! // Connection is established lazily on first use.
//! let executor = Executor::new(spec)?;
//! for tool in executor.list_tools().await? {
//!     println!("{}: {}", tool.name, tool.description.as_deref().unwrap_or(""));
//! }
//!
//! let result = executor.call_tool("query", args).await?;
//! executor.close().await;
//! ```
//!
//! # Wire protocol
//!
//! MCP uses JSON-RPC 2.0 over the child's standard streams, one JSON frame
//! per line. The flow is:
//! 1. Client sends `initialize` with capabilities
//! 2. Server responds with its capabilities
//! 3. Client sends `notifications/initialized`
//! 4. Client can now call `tools/list` and `tools/call`

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export main types
pub use catalog::ToolSummary;
pub use config::LaunchSpec;
pub use error::{McpError, Result};
pub use executor::Executor;
pub use protocol::{ContentItem, ServerInfo, ToolCallResult, ToolDescriptor};
pub use session::{Session, SessionOptions};
pub use transport::StdioTransport;
