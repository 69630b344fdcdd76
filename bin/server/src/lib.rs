//! jobdesk workflow builder service.
//!
//! A thin JSON layer over `jobdesk-workflow` exposing the editor's palette,
//! node creation and duplication, and workflow normalization and
//! validation.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
