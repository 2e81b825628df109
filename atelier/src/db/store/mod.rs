//! Storage traits for the owning record and the child document collections.
//!
//! Two backends implement both traits:
//!
//! - [`postgres::PostgresStore`]: one JSONB table per entity kind, pooled connections
//! - [`memory::MemoryStore`]: process-local collections for development and tests
//!
//! Neither trait offers multi-collection transactions. Callers that touch several
//! collections (see [`crate::snapshot`]) are responsible for tracking partial progress.

use async_trait::async_trait;

use crate::db::errors::Result;
use crate::db::models::ateliers::{Atelier, AtelierCreateDBRequest};
use crate::db::models::documents::{Document, DocumentInsert, EntityKind};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Access to owning atelier records.
#[async_trait]
pub trait AtelierStore: Send + Sync {
    /// Create a new atelier. Fails with a unique violation if the external id is taken.
    async fn create(&self, request: &AtelierCreateDBRequest) -> Result<Atelier>;

    /// Look up an atelier by its external identifier.
    async fn find_by_external_id(&self, id: &str) -> Result<Option<Atelier>>;

    /// Persist every mutable attribute of `atelier` in place, returning the stored record.
    async fn save(&self, atelier: &Atelier) -> Result<Atelier>;
}

/// Access to the per-kind child collections, partitioned by owning atelier.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of `kind` owned by `owner_id`, newest first.
    async fn find_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<Vec<Document>>;

    /// Delete every document of `kind` owned by `owner_id`, returning how many were removed.
    async fn delete_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<u64>;

    /// Insert already-stamped documents into the `kind` collection.
    async fn insert_many(&self, kind: EntityKind, documents: Vec<DocumentInsert>) -> Result<u64>;
}
