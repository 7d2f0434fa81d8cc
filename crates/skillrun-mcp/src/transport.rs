//! Stdio transport: spawns an MCP server and wires up its standard streams.

use std::process::Stdio;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::config::LaunchSpec;
use crate::error::{McpError, Result};

/// A child-process duplex channel: bytes arrive from the server's stdout and
/// leave through its stdin. The server's stderr passes through to ours.
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl StdioTransport {
    /// Spawn the server process described by `spec`.
    ///
    /// The child is killed when the handle is dropped, so an abandoned
    /// channel cannot leave the server running.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // None inherits our environment; an explicit map replaces it
        // wholesale, so an empty map yields an empty child environment.
        if let Some(env) = &spec.env {
            cmd.env_clear().envs(env);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::spawn(format!("failed to spawn '{}': {}", spec.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::spawn("failed to capture stdin"))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::spawn("failed to capture stdout"))?;

        tracing::debug!(command = %spec.command, "spawned MCP server process");

        Ok(Self {
            child,
            stdin,
            stdout,
        })
    }

    /// Split the transport into the child handle and the two stream halves.
    pub fn into_parts(self) -> (Child, ChildStdin, ChildStdout) {
        (self.child, self.stdin, self.stdout)
    }
}
