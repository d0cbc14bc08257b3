//! Workflow transitions for chat records
//!
//! Definitions are loaded from JSON:
//!
//! ```json
//! {
//!   "Chat Room": { "initial": "Open", "transitions": { "Open": ["Closed"] } }
//! }
//! ```

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::DocKind;

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Allowed next states for an entity currently in `state`
    async fn possible_transitions(&self, kind: DocKind, state: Option<&str>) -> Result<Vec<String>>;

    /// State assigned to newly created records
    fn initial_state(&self, kind: DocKind) -> Option<String>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowDefinition {
    pub initial: Option<String>,
    #[serde(default)]
    pub transitions: HashMap<String, Vec<String>>,
}

/// Table-driven workflow engine
#[derive(Debug, Clone, Default)]
pub struct WorkflowTable {
    definitions: HashMap<DocKind, WorkflowDefinition>,
}

impl WorkflowTable {
    pub fn new(definitions: HashMap<DocKind, WorkflowDefinition>) -> Self {
        Self { definitions }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let definitions: HashMap<DocKind, WorkflowDefinition> =
            serde_json::from_str(raw).context("Invalid workflow definition")?;
        Ok(Self::new(definitions))
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read workflow file {:?}", path))?;
        let table = Self::from_json(&raw)?;
        info!(
            "[Workflow] Loaded {} workflow definitions from {:?}",
            table.definitions.len(),
            path
        );
        Ok(table)
    }
}

#[async_trait]
impl WorkflowEngine for WorkflowTable {
    async fn possible_transitions(&self, kind: DocKind, state: Option<&str>) -> Result<Vec<String>> {
        let transitions = state
            .and_then(|state| {
                self.definitions
                    .get(&kind)
                    .and_then(|def| def.transitions.get(state))
            })
            .cloned()
            .unwrap_or_default();
        Ok(transitions)
    }

    fn initial_state(&self, kind: DocKind) -> Option<String> {
        self.definitions.get(&kind).and_then(|def| def.initial.clone())
    }
}
