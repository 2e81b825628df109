//! HTTP API layer.
//!
//! - [`handlers`]: Axum route handlers
//! - [`models`]: request and response bodies

pub mod handlers;
pub mod models;
