//! Launch configuration for MCP server processes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Describes how to launch an MCP server as a child process.
///
/// Deserializes directly from the JSON configuration file:
///
/// ```json
/// {
///   "command": "mcp-server-sqlite",
///   "args": ["--db", "/path/to/db.sqlite"],
///   "env": { "DEBUG": "1" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Executable to spawn, resolved through the host's PATH.
    pub command: String,
    /// Arguments passed through verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Child environment. `None` inherits the caller's environment; an
    /// explicit map (even an empty one) replaces it wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

impl LaunchSpec {
    /// Create a launch spec for the given command, with no arguments and an
    /// inherited environment.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: None,
        }
    }

    /// Replace the argument list.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Append an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable, switching from the inherited environment
    /// to an explicit one if necessary.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}
