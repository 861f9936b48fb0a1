// SPDX-License-Identifier: MIT

//! Runtime configuration from the environment (and `.env`)

use std::env;
use std::path::PathBuf;

use crate::error::ServiceError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_DIAGRAM: &str = "workflow_graph.png";
pub const DEFAULT_REQUEST: &str = "I want to find the best shaorma places";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `GOOGLE_API_KEY`
    pub api_key: Option<String>,
    /// `RESEARCH_MODEL`
    pub model: String,
    /// `GEMINI_BASE_URL`, for proxies
    pub base_url: Option<String>,
    /// `RESEARCH_OUTPUT_DIR`: where report artifacts are written
    pub output_dir: PathBuf,
    /// `RESEARCH_WORKFLOW`: YAML definition replacing the built-in one
    pub workflow: Option<PathBuf>,
    /// `RESEARCH_DIAGRAM`: PNG path; empty disables the export
    pub diagram: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());
        let non_empty = |key: &str| get(key).filter(|v| !v.is_empty());

        let diagram = match get("RESEARCH_DIAGRAM") {
            Some(path) if path.is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_DIAGRAM)),
        };

        Self {
            api_key: non_empty("GOOGLE_API_KEY"),
            model: non_empty("RESEARCH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_empty("GEMINI_BASE_URL"),
            output_dir: non_empty("RESEARCH_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            workflow: non_empty("RESEARCH_WORKFLOW").map(PathBuf::from),
            diagram,
        }
    }

    pub fn require_api_key(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ServiceError::ApiKeyMissing("Gemini".to_string()))
    }
}
