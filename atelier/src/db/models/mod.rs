//! Database record structures.
//!
//! - [`ateliers`]: the owning atelier record and its profile/subscription blocks
//! - [`documents`]: entity kinds and opaque child documents

pub mod ateliers;
pub mod documents;
