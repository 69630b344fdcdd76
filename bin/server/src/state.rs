//! Shared application state.

use crate::config::WorkflowLimits;
use crate::error::ApiError;
use jobdesk_core::SystemClock;
use jobdesk_workflow::{LoadReport, NodeDecoder, NodeFactory, UlidIds, Workflow};
use serde_json::Value;
use std::sync::Arc;

/// State handed to every route.
#[derive(Debug, Clone)]
pub struct AppState {
    pub factory: NodeFactory,
    pub decoder: NodeDecoder,
    pub limits: WorkflowLimits,
}

impl AppState {
    /// Production state: ULID ids and the system clock.
    #[must_use]
    pub fn new(limits: WorkflowLimits) -> Self {
        Self::with_factory(
            NodeFactory::new(Arc::new(UlidIds), Arc::new(SystemClock)),
            limits,
        )
    }

    /// State around a caller-supplied factory; the decoder shares its id
    /// and clock sources.
    #[must_use]
    pub fn with_factory(factory: NodeFactory, limits: WorkflowLimits) -> Self {
        Self {
            decoder: factory.decoder(),
            factory,
            limits,
        }
    }

    /// Loads a workflow record after checking it against the node limit.
    ///
    /// # Errors
    ///
    /// Returns `TooManyNodes` or `InvalidWorkflow`.
    pub fn load(&self, record: &Value) -> Result<(Workflow, LoadReport), ApiError> {
        let count = record
            .get("nodes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if count > self.limits.max_nodes {
            return Err(ApiError::TooManyNodes {
                count,
                max: self.limits.max_nodes,
            });
        }
        Ok(Workflow::load(record, &self.decoder)?)
    }
}
