// SPDX-License-Identifier: MIT

//! Workflow diagrams
//!
//! Renders a [`Topology`] as a Mermaid flowchart, fetches the PNG from a
//! Mermaid rendering service and prints a plain listing of nodes and edges.
//!
//! | Element           | Shape     | Mermaid Syntax      |
//! |-------------------|-----------|---------------------|
//! | Node              | Rectangle | `id[label]`         |
//! | START/END         | Stadium   | `id([label])`       |
//! | Unconditional     | Solid     | `a --> b`           |
//! | Conditional       | Dotted    | `a -. "label" .-> b`|

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use reqwest::Client;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{BoxError, ServiceError};
use crate::workflow::graph::{Topology, END};

pub const START: &str = "__start__";

const DEFAULT_MERMAID_INK: &str = "https://mermaid.ink";

/// Mermaid node ids must be alphanumeric plus underscores
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Render the graph as a `graph TD` Mermaid flowchart
pub fn to_mermaid(topology: &Topology) -> String {
    let mut out = String::from("graph TD\n");

    let _ = writeln!(out, "    {}([{}])", START, START);
    for node in &topology.nodes {
        let _ = writeln!(out, "    {}[{}]", sanitize_id(node), node);
    }
    let _ = writeln!(out, "    {}([{}])", END, END);

    let _ = writeln!(out, "    {} --> {}", START, sanitize_id(&topology.entry));
    for edge in &topology.edges {
        let from = sanitize_id(&edge.from);
        let to = sanitize_id(&edge.to);
        match &edge.label {
            Some(label) => {
                let _ = writeln!(out, "    {} -. \"{}\" .-> {}", from, label, to);
            }
            None => {
                let _ = writeln!(out, "    {} --> {}", from, to);
            }
        }
    }

    out
}

/// Node and edge listing shown before a run
pub fn describe(topology: &Topology) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "WORKFLOW GRAPH INFORMATION");
    let _ = writeln!(out, "{}", "=".repeat(40));
    // start and end markers count as nodes, the start edge as an edge
    let _ = writeln!(out, "Number of nodes: {}", topology.nodes.len() + 2);
    let _ = writeln!(out, "Number of edges: {}", topology.edges.len() + 1);

    let _ = writeln!(out, "\nNodes:");
    let _ = writeln!(out, "  - {}", START);
    for node in &topology.nodes {
        let _ = writeln!(out, "  - {}", node);
    }
    let _ = writeln!(out, "  - {}", END);

    let _ = writeln!(out, "\nEdges:");
    let _ = writeln!(out, "  - {} -> {}", START, topology.entry);
    for edge in &topology.edges {
        match &edge.label {
            Some(label) => {
                let _ = writeln!(out, "  - {} -> {} (when '{}')", edge.from, edge.to, label);
            }
            None => {
                let _ = writeln!(out, "  - {} -> {}", edge.from, edge.to);
            }
        }
    }
    out
}

/// Turns a topology into image bytes
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, topology: &Topology) -> Result<Vec<u8>, BoxError>;
}

/// Renders PNGs through the mermaid.ink HTTP API
pub struct MermaidInkRenderer {
    client: Client,
    base_url: String,
}

impl MermaidInkRenderer {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_MERMAID_INK.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn image_url(&self, topology: &Topology) -> String {
        let encoded = URL_SAFE.encode(to_mermaid(topology));
        format!("{}/img/{}?type=png", self.base_url, encoded)
    }
}

impl Default for MermaidInkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiagramRenderer for MermaidInkRenderer {
    async fn render(&self, topology: &Topology) -> Result<Vec<u8>, BoxError> {
        let resp = self.client.get(self.image_url(topology)).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ServiceError::api("mermaid.ink", format!("{}: {}", status, text)).into());
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Render and save the diagram. Failures are logged and reported as `false`;
/// they never abort the caller.
pub async fn export_diagram(
    renderer: &dyn DiagramRenderer,
    topology: &Topology,
    path: &Path,
) -> bool {
    let bytes = match renderer.render(topology).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Could not generate graph visualization: {}", e);
            return false;
        }
    };

    match tokio::fs::write(path, bytes).await {
        Ok(()) => {
            log::info!("Workflow graph saved as '{}'", path.display());
            true
        }
        Err(e) => {
            log::warn!("Could not save graph visualization to {}: {}", path.display(), e);
            false
        }
    }
}
