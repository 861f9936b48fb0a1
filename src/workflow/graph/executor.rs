// SPDX-License-Identifier: MIT

//! Graph workflow executor
//!
//! Walks the compiled graph from its entry node until a transition reaches
//! [`END`]. Per step: resolve node, run it on the current snapshot, merge
//! its partial update, resolve the successor. Nodes run one at a time.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::edges::END;
use super::CompiledGraph;
use crate::error::GraphError;
use crate::workflow::state::State;

/// Per-run knobs; the defaults impose no step budget
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Checked before every step
    pub cancel: Option<CancellationToken>,
    /// Abort with [`GraphError::StepLimitExceeded`] after this many steps
    pub step_limit: Option<usize>,
    /// Keep every intermediate snapshot in [`RunOutcome::snapshots`]
    pub keep_snapshots: bool,
}

/// One executed step; `next` is empty when routing failed after it
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub step: usize,
    pub node: String,
    /// Value of the node's attempt counter after its update, if tracked
    pub attempt: Option<i64>,
    /// Router label chosen after this node, for conditional edges
    pub route: Option<String>,
    pub next: String,
    pub at: DateTime<Utc>,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.attempt, &self.route) {
            (Some(attempt), _) => write!(f, "{}({})", self.node, attempt),
            (None, Some(route)) => write!(f, "{}({})", self.node, route),
            (None, None) => write!(f, "{}", self.node),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub state: State,
    pub trace: Vec<TraceRecord>,
    /// Initial snapshot followed by one per step, when requested
    pub snapshots: Vec<State>,
}

impl RunOutcome {
    /// Node visits in order, e.g. `research_agent(2)`
    pub fn path(&self) -> Vec<String> {
        self.trace.iter().map(|r| r.to_string()).collect()
    }
}

/// A failed run; `last_state` is the last snapshot produced by a complete merge
#[derive(Debug, Error)]
#[error("run {run_id} failed: {error}")]
pub struct RunFailure {
    pub run_id: Uuid,
    #[source]
    pub error: GraphError,
    pub last_state: State,
    pub trace: Vec<TraceRecord>,
}

enum Cursor {
    Running(String),
    Terminated,
}

impl CompiledGraph {
    /// Run to completion with default options
    pub async fn run(&self, initial: State) -> Result<RunOutcome, RunFailure> {
        self.run_with(initial, RunOptions::default()).await
    }

    pub async fn run_with(
        &self,
        initial: State,
        options: RunOptions,
    ) -> Result<RunOutcome, RunFailure> {
        let run_id = Uuid::new_v4();
        let mut state = initial;
        let mut trace = Vec::new();
        let mut snapshots = Vec::new();
        if options.keep_snapshots {
            snapshots.push(state.clone());
        }

        log::info!("Run {} starting at '{}'", run_id, self.entry);

        match self
            .drive(&mut state, &mut trace, &mut snapshots, &options)
            .await
        {
            Ok(()) => {
                log::info!("Run {} finished after {} steps", run_id, trace.len());
                Ok(RunOutcome {
                    run_id,
                    state,
                    trace,
                    snapshots,
                })
            }
            Err(error) => {
                log::error!("Run {} aborted: {}", run_id, error);
                Err(RunFailure {
                    run_id,
                    error,
                    last_state: state,
                    trace,
                })
            }
        }
    }

    /// `state` is replaced only after a step's update merged cleanly
    async fn drive(
        &self,
        state: &mut State,
        trace: &mut Vec<TraceRecord>,
        snapshots: &mut Vec<State>,
        options: &RunOptions,
    ) -> Result<(), GraphError> {
        let mut cursor = Cursor::Running(self.entry.clone());

        while let Cursor::Running(node_name) = cursor {
            if let Some(token) = &options.cancel {
                if token.is_cancelled() {
                    return Err(GraphError::Cancelled(node_name));
                }
            }
            if let Some(limit) = options.step_limit {
                if trace.len() >= limit {
                    return Err(GraphError::StepLimitExceeded(limit));
                }
            }

            let node = self.registry.resolve(&node_name)?;
            let partial = node
                .run(state)
                .await
                .map_err(|source| GraphError::Step {
                    node: node_name.clone(),
                    source,
                })?;

            *state = state
                .merge(&partial)
                .map_err(|source| GraphError::Merge {
                    node: node_name.clone(),
                    source,
                })?;
            if options.keep_snapshots {
                snapshots.push(state.clone());
            }

            let attempt = self
                .attempt_fields
                .get(&node_name)
                .and_then(|field| state.integer(field));
            let transition = match self.edges.next(&node_name, state) {
                Ok(transition) => transition,
                Err(error) => {
                    // The node ran and merged; record the visit with no successor
                    if let GraphError::Routing { label, .. } = &error {
                        trace.push(TraceRecord {
                            step: trace.len() + 1,
                            node: node_name,
                            attempt,
                            route: Some(label.clone()),
                            next: String::new(),
                            at: Utc::now(),
                        });
                    }
                    return Err(error);
                }
            };

            let record = TraceRecord {
                step: trace.len() + 1,
                node: node_name,
                attempt,
                route: transition.label.clone(),
                next: transition.to.clone(),
                at: Utc::now(),
            };
            log::info!(
                "Step {}: {} -> {}",
                record.step,
                record,
                record.next
            );
            trace.push(record);

            cursor = if transition.to == END {
                Cursor::Terminated
            } else {
                Cursor::Running(transition.to)
            };
        }

        Ok(())
    }
}
