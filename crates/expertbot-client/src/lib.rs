//! Client for the ExpertBot backend.
//!
//! - `POST /api/query` resolves a query, optionally against a chosen file
//! - `POST /api/test` echoes the request for diagnostics
//! - `GET /` answers when the service is up

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{ExpertBackend, HttpBackend};
pub use error::{ClientError, Result};
pub use types::{is_truthy, FileOption, QueryRequest, QueryResponse, ResponseShape};
