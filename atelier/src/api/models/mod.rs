//! API request and response data models.
//!
//! The aggregate shapes themselves live in [`crate::snapshot::aggregate`] since the snapshot
//! layer produces and consumes them directly.

pub mod ateliers;
pub mod snapshots;
