//! Views over a server's tool listing.

use serde::{Deserialize, Serialize};

use crate::protocol::ToolDescriptor;

/// Description-only view of a tool, as shown by the list operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSummary {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&ToolDescriptor> for ToolSummary {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
        }
    }
}

/// Summarize a listing, preserving server order.
pub fn summaries(tools: &[ToolDescriptor]) -> Vec<ToolSummary> {
    tools.iter().map(ToolSummary::from).collect()
}

/// Find a tool by exact, case-sensitive name. Absence is a normal outcome,
/// not an error.
pub fn find_tool<'a>(tools: &'a [ToolDescriptor], name: &str) -> Option<&'a ToolDescriptor> {
    tools.iter().find(|tool| tool.name == name)
}
