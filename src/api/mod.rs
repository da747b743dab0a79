// src/api/mod.rs
// HTTP surface: router, request/response types and error mapping

pub mod error;
pub mod http;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use http::http_router;
pub use types::*;
