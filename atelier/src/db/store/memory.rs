//! In-process implementation of [`AtelierStore`] and [`DocumentStore`].
//!
//! Used when `database.type = memory` and throughout the test suite. Each collection sits
//! behind its own lock, so fan-out legs over different kinds do not contend, and nothing
//! here is transactional across collections either.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use super::{AtelierStore, DocumentStore};
use crate::db::errors::{DbError, Result};
use crate::db::models::ateliers::{Atelier, AtelierCreateDBRequest};
use crate::db::models::documents::{Document, DocumentInsert, EntityKind};
use crate::types::{AtelierId, abbrev_id};

#[derive(Debug, Clone)]
struct StoredDocument {
    seq: u64,
    owner_id: AtelierId,
    created_at: DateTime<Utc>,
    body: Document,
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ateliers: DashMap<AtelierId, Atelier>,
    collections: [RwLock<Vec<StoredDocument>>; EntityKind::COUNT],
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, kind: EntityKind) -> &RwLock<Vec<StoredDocument>> {
        &self.collections[kind.index()]
    }
}

#[async_trait]
impl AtelierStore for MemoryStore {
    #[instrument(skip(self, request), fields(manager_id = %abbrev_id(&request.manager_id)), err)]
    async fn create(&self, request: &AtelierCreateDBRequest) -> Result<Atelier> {
        let id = request.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        match self.ateliers.entry(id.clone()) {
            Entry::Occupied(_) => Err(DbError::UniqueViolation {
                constraint: Some("ateliers_id_key".to_string()),
                table: Some("ateliers".to_string()),
                message: format!("atelier {id} already exists"),
            }),
            Entry::Vacant(slot) => {
                let atelier = Atelier {
                    storage_key: Uuid::new_v4(),
                    id,
                    name: request.name.clone(),
                    manager_id: request.manager_id.clone(),
                    subscription: request.subscription.clone(),
                    profile: request.profile.clone(),
                    legacy: request.legacy.clone(),
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(atelier.clone());
                Ok(atelier)
            }
        }
    }

    #[instrument(skip(self), fields(atelier_id = %abbrev_id(id)), err)]
    async fn find_by_external_id(&self, id: &str) -> Result<Option<Atelier>> {
        Ok(self.ateliers.get(id).map(|entry| entry.value().clone()))
    }

    #[instrument(skip(self, atelier), fields(atelier_id = %abbrev_id(&atelier.id)), err)]
    async fn save(&self, atelier: &Atelier) -> Result<Atelier> {
        let mut entry = self
            .ateliers
            .get_mut(&atelier.id)
            .filter(|entry| entry.storage_key == atelier.storage_key)
            .ok_or(DbError::NotFound)?;

        let mut saved = atelier.clone();
        saved.created_at = entry.created_at;
        saved.updated_at = Utc::now();
        *entry = saved.clone();

        Ok(saved)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self), fields(atelier_id = %abbrev_id(owner_id)), err)]
    async fn find_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<Vec<Document>> {
        let collection = self.collection(kind).read().await;

        let mut owned: Vec<&StoredDocument> = collection.iter().filter(|doc| doc.owner_id == owner_id).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));

        Ok(owned.into_iter().map(|doc| doc.body.clone()).collect())
    }

    #[instrument(skip(self), fields(atelier_id = %abbrev_id(owner_id)), err)]
    async fn delete_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<u64> {
        let mut collection = self.collection(kind).write().await;

        let before = collection.len();
        collection.retain(|doc| doc.owner_id != owner_id);

        Ok((before - collection.len()) as u64)
    }

    #[instrument(skip(self, documents), fields(count = documents.len()), err)]
    async fn insert_many(&self, kind: EntityKind, documents: Vec<DocumentInsert>) -> Result<u64> {
        let mut collection = self.collection(kind).write().await;

        let count = documents.len() as u64;
        collection.extend(documents.into_iter().map(|document| StoredDocument {
            seq: self.sequence.fetch_add(1, Ordering::Relaxed),
            owner_id: document.owner_id,
            created_at: document.created_at,
            body: document.body,
        }));

        Ok(count)
    }
}
