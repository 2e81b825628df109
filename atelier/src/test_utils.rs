//! Test utilities (available with `test-utils` feature).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::{Config, DatabaseConfig};
use crate::db::errors::{DbError, Result};
use crate::db::models::ateliers::{Atelier, AtelierCreateDBRequest};
use crate::db::models::documents::{Document, DocumentInsert, EntityKind};
use crate::db::store::{AtelierStore, DocumentStore, MemoryStore};
use crate::snapshot::ReplacePayload;

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        enable_metrics: false,
        ..Default::default()
    }
}

/// Test server over a fresh in-memory store, which is returned for direct seeding.
pub async fn create_test_app() -> (TestServer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let server = create_test_app_with_stores(store.clone(), store.clone()).await;
    (server, store)
}

pub async fn create_test_app_with_stores(ateliers: Arc<dyn AtelierStore>, documents: Arc<dyn DocumentStore>) -> TestServer {
    create_test_app_with_config(create_test_config(), ateliers, documents).await
}

pub async fn create_test_app_with_config(
    config: Config,
    ateliers: Arc<dyn AtelierStore>,
    documents: Arc<dyn DocumentStore>,
) -> TestServer {
    crate::Application::new_with_stores(config, ateliers, documents)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

pub async fn create_test_atelier(store: &dyn AtelierStore, id: &str) -> Atelier {
    store
        .create(&AtelierCreateDBRequest {
            id: Some(id.to_string()),
            name: format!("Atelier {id}"),
            manager_id: "manager-1".to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to create test atelier")
}

pub fn document(value: Value) -> Document {
    value.as_object().cloned().expect("test document must be a JSON object")
}

pub fn stamp_all(owner_id: &str, documents: Vec<Document>, now: DateTime<Utc>) -> Vec<DocumentInsert> {
    documents.into_iter().map(|body| DocumentInsert::stamp(owner_id, body, now)).collect()
}

pub fn replace_payload(value: Value) -> ReplacePayload {
    serde_json::from_value(value).expect("invalid replace payload")
}

/// Counts calls per operation before delegating.
pub struct CountingDocuments {
    inner: Arc<dyn DocumentStore>,
    reads: AtomicUsize,
    deletes: AtomicUsize,
    inserts: AtomicUsize,
}

impl CountingDocuments {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.reads() + self.deletes() + self.inserts()
    }
}

#[async_trait]
impl DocumentStore for CountingDocuments {
    async fn find_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<Vec<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_owner(kind, owner_id).await
    }

    async fn delete_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_owner(kind, owner_id).await
    }

    async fn insert_many(&self, kind: EntityKind, documents: Vec<DocumentInsert>) -> Result<u64> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_many(kind, documents).await
    }
}

/// Fails selected operations for selected kinds; everything else is delegated.
pub struct FailingDocuments {
    inner: Arc<dyn DocumentStore>,
    fail_find: HashSet<EntityKind>,
    fail_delete: HashSet<EntityKind>,
    fail_insert: HashSet<EntityKind>,
}

impl FailingDocuments {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            fail_find: HashSet::new(),
            fail_delete: HashSet::new(),
            fail_insert: HashSet::new(),
        }
    }

    pub fn fail_find(mut self, kind: EntityKind) -> Self {
        self.fail_find.insert(kind);
        self
    }

    pub fn fail_delete(mut self, kind: EntityKind) -> Self {
        self.fail_delete.insert(kind);
        self
    }

    pub fn fail_insert(mut self, kind: EntityKind) -> Self {
        self.fail_insert.insert(kind);
        self
    }

    fn injected(operation: &str, kind: EntityKind) -> DbError {
        DbError::Other(anyhow::anyhow!("injected {operation} failure for {kind}"))
    }
}

#[async_trait]
impl DocumentStore for FailingDocuments {
    async fn find_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<Vec<Document>> {
        if self.fail_find.contains(&kind) {
            return Err(Self::injected("find", kind));
        }
        self.inner.find_by_owner(kind, owner_id).await
    }

    async fn delete_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<u64> {
        if self.fail_delete.contains(&kind) {
            return Err(Self::injected("delete", kind));
        }
        self.inner.delete_by_owner(kind, owner_id).await
    }

    async fn insert_many(&self, kind: EntityKind, documents: Vec<DocumentInsert>) -> Result<u64> {
        if self.fail_insert.contains(&kind) {
            return Err(Self::injected("insert", kind));
        }
        self.inner.insert_many(kind, documents).await
    }
}
