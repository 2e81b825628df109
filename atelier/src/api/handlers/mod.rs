//! HTTP request handlers for all API endpoints.
//!
//! # Handler Modules
//!
//! - [`ateliers`]: atelier registration and lookup
//! - [`snapshots`]: whole-aggregate read and replace of an atelier's data
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to an HTTP status code and a
//! user-safe message.

pub mod ateliers;
pub mod snapshots;
