//! Error type for the HTTP routes.
//!
//! Domain errors are mapped to a status code and a client-safe message;
//! full reports are logged, not returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jobdesk_workflow::{NodeError, WorkflowError};
use rootcause::Report;
use std::fmt;

/// Errors returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A single node could not be built, decoded or duplicated.
    Node(NodeError),
    /// The workflow-level fields of a record are unusable.
    InvalidWorkflow(Report<WorkflowError>),
    /// The record has more nodes than the configured limit.
    TooManyNodes { count: usize, max: usize },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(error) => write!(f, "{error}"),
            Self::InvalidWorkflow(report) => write!(f, "{report}"),
            Self::TooManyNodes { count, max } => {
                write!(f, "workflow has {count} nodes, limit is {max}")
            }
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(error: NodeError) -> Self {
        Self::Node(error)
    }
}

impl From<Report<WorkflowError>> for ApiError {
    fn from(report: Report<WorkflowError>) -> Self {
        Self::InvalidWorkflow(report)
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Node(NodeError::UnsupportedVariant { .. }) => StatusCode::BAD_REQUEST,
            Self::Node(_) | Self::InvalidWorkflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooManyNodes { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Node(error) => error.to_string(),
            Self::InvalidWorkflow(report) => {
                tracing::warn!("Rejected workflow record: {}", report);
                "Invalid workflow record".to_string()
            }
            Self::TooManyNodes { .. } => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_variant_is_bad_request() {
        let error = ApiError::from(NodeError::UnsupportedVariant {
            variant: "survey".to_string(),
        });
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn workflow_errors_are_unprocessable() {
        let report: Report<WorkflowError> = WorkflowError::InvalidRecord {
            field: "name",
            reason: "is required".to_string(),
        }
        .into();
        let error = ApiError::from(report);
        assert_eq!(error.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn node_limit_is_payload_too_large() {
        let error = ApiError::TooManyNodes { count: 3, max: 2 };
        assert_eq!(error.to_string(), "workflow has 3 nodes, limit is 2");
        assert_eq!(error.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
