//! Whole-aggregate snapshot and replace for a single atelier.
//!
//! ```text
//! read (build_aggregate_response)
//!   ├─ AtelierStore: find_by_external_id        // owner must exist
//!   ├─ DocumentStore: find_by_owner × 9         // concurrent, all-or-none
//!   └─ legacy::resolve_profile                  // first-class vs legacy bag
//!
//! replace (replace_aggregate_data)
//!   ├─ AtelierStore: find_by_external_id + save // profile fields, no legacy logic
//!   ├─ DocumentStore: delete_by_owner × 9       // concurrent, wait for all
//!   └─ DocumentStore: insert_many × n           // only non-empty kinds, wait for all
//! ```
//!
//! No step is transactional across collections. Every fan-out leg runs to completion even
//! when a sibling fails, and the [`journal::ReplaceJournal`] returned inside
//! [`DbError::PartialReplace`](crate::db::errors::DbError::PartialReplace) tells the caller
//! exactly which collections were left in which state.

use std::sync::Arc;

use crate::db::store::{AtelierStore, DocumentStore};

pub mod aggregate;
pub mod journal;
pub mod legacy;
mod reader;
mod writer;

pub use aggregate::{AggregateData, ChildCollections, FullAggregate, ReplacePayload};
pub use journal::{ReplaceJournal, ReplacePhase};

/// Reader and writer for atelier aggregates, over whichever stores the app was built with.
#[derive(Clone)]
pub struct AtelierSnapshots {
    ateliers: Arc<dyn AtelierStore>,
    documents: Arc<dyn DocumentStore>,
}

impl AtelierSnapshots {
    pub fn new(ateliers: Arc<dyn AtelierStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { ateliers, documents }
    }
}
