//! Core domain types and utilities for the jobdesk platform.
//!
//! This crate provides the identifiers, time source and error handling
//! foundation shared by the workflow model and the service binary.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::Result;
pub use id::{EdgeId, NodeId, ParseIdError, UserId, WorkflowId};
