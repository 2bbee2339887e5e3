//! HTTP runtime surface for the optimization service.

pub mod api;

pub use api::{router, serve, ApiError, CancelResponse, Health, StartResponse};
