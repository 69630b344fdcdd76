//! HTTP routes for the workflow builder.
//!
//! Every route is stateless: requests carry the node or workflow record
//! they operate on and responses carry the result back. Persistence is
//! left to the caller.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use jobdesk_workflow::{
    LoadReport, NewNode, NodeKind, PaletteItem, TaskType, Workflow, WorkflowNode,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Builds the router with all workflow routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/palette", get(palette))
        .route("/nodes", post(create_node))
        .route("/nodes/duplicate", post(duplicate_node))
        .route("/workflows/load", post(load_workflow))
        .route("/workflows/validate", post(validate_workflow))
        .with_state(state)
}

/// One palette entry as shown in the editor sidebar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteEntry {
    pub tag: &'static str,
    pub label: &'static str,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
}

impl From<PaletteItem> for PaletteEntry {
    fn from(item: PaletteItem) -> Self {
        let kind = match item {
            PaletteItem::Start => NodeKind::Start,
            PaletteItem::End => NodeKind::End,
            _ => NodeKind::Task,
        };
        Self {
            tag: item.as_str(),
            label: item.default_label(),
            kind,
            task_type: item.task_type(),
        }
    }
}

/// Serializable form of a [`LoadReport`].
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    pub rejected_nodes: Vec<RejectedBody>,
    pub opaque_nodes: Vec<String>,
    pub dropped_edges: Vec<DroppedBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedBody {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedBody {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    pub reason: String,
}

impl From<&LoadReport> for ReportBody {
    fn from(report: &LoadReport) -> Self {
        Self {
            rejected_nodes: report
                .rejected_nodes
                .iter()
                .map(|r| RejectedBody {
                    index: r.index,
                    node_id: r.node_id.clone(),
                    error: r.error.to_string(),
                })
                .collect(),
            opaque_nodes: report.opaque_nodes.iter().map(ToString::to_string).collect(),
            dropped_edges: report
                .dropped_edges
                .iter()
                .map(|d| DroppedBody {
                    index: d.index,
                    edge_id: d.edge_id.clone(),
                    reason: d.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub workflow: Workflow,
    pub report: ReportBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub entry_nodes: Vec<String>,
    pub unreachable_nodes: Vec<String>,
    pub report: ReportBody,
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Lists the seven palette items in display order.
pub async fn palette() -> Json<Vec<PaletteEntry>> {
    Json(PaletteItem::ALL.into_iter().map(PaletteEntry::from).collect())
}

/// Palette drop: builds a node with a fresh id and variant defaults.
#[instrument(skip_all, fields(variant = %request.variant))]
pub async fn create_node(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewNode>,
) -> Result<(StatusCode, Json<WorkflowNode>), ApiError> {
    let node = state.factory.build(request)?;
    tracing::debug!(node_id = %node.id(), "created node");
    Ok((StatusCode::CREATED, Json(node)))
}

/// Duplicate action: decodes a node record and returns a copy under a new id.
#[instrument(skip_all)]
pub async fn duplicate_node(
    State(state): State<Arc<AppState>>,
    Json(record): Json<Value>,
) -> Result<(StatusCode, Json<WorkflowNode>), ApiError> {
    let entry = state.decoder.decode(&record)?;
    let copy = state.factory.duplicate_entry(&entry)?;
    tracing::debug!(node_id = %copy.id(), "duplicated node");
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Normalizes a persisted workflow: defaults filled, ids generated,
/// malformed nodes dropped and reported.
#[instrument(skip_all)]
pub async fn load_workflow(
    State(state): State<Arc<AppState>>,
    Json(record): Json<Value>,
) -> Result<Json<LoadResponse>, ApiError> {
    let (workflow, report) = state.load(&record)?;
    Ok(Json(LoadResponse {
        report: ReportBody::from(&report),
        workflow,
    }))
}

/// Loads a workflow and checks references and reachability.
#[instrument(skip_all)]
pub async fn validate_workflow(
    State(state): State<Arc<AppState>>,
    Json(record): Json<Value>,
) -> Result<Json<ValidationResponse>, ApiError> {
    let (workflow, report) = state.load(&record)?;
    let error = workflow.validate().err().map(|e| e.to_string());
    let graph = workflow.graph();

    Ok(Json(ValidationResponse {
        valid: error.is_none() && report.is_clean(),
        error,
        entry_nodes: graph.entry_nodes().into_iter().map(ToString::to_string).collect(),
        unreachable_nodes: graph
            .unreachable_nodes()
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        report: ReportBody::from(&report),
    }))
}
