use futures::future::join_all;
use metrics::counter;
use tracing::{debug, instrument};

use super::AtelierSnapshots;
use super::aggregate::{AggregateData, ChildCollections, FullAggregate};
use super::legacy::resolve_profile;
use crate::db::errors::Result;
use crate::db::models::documents::EntityKind;
use crate::types::abbrev_id;

impl AtelierSnapshots {
    /// Children and reconciled profile fields for `owner_id`, or `None` if no such atelier.
    ///
    /// All nine collections are queried concurrently. Every query runs to completion; if any
    /// of them failed the first error is returned and nothing partial is handed back.
    #[instrument(skip(self), fields(atelier_id = %abbrev_id(owner_id)), err)]
    pub async fn build_aggregate_data(&self, owner_id: &str) -> Result<Option<AggregateData>> {
        let Some(owner) = self.ateliers.find_by_external_id(owner_id).await? else {
            debug!("Atelier not found, skipping collection reads");
            return Ok(None);
        };

        let documents = &self.documents;
        let results = join_all(
            EntityKind::ALL.map(move |kind| async move { (kind, documents.find_by_owner(kind, owner_id).await) }),
        )
        .await;

        let mut children = ChildCollections::default();
        for (kind, result) in results {
            children.set(kind, result?);
        }

        let profile = resolve_profile(&owner.profile, &owner.legacy);
        debug!(records = children.total(), "Assembled atelier aggregate");

        Ok(Some(AggregateData::new(children, profile)))
    }

    /// The full client-facing aggregate: owner envelope plus [`Self::build_aggregate_data`].
    ///
    /// The owner is looked up again before the collections are read, so an atelier removed
    /// in between yields `None` rather than an envelope with no data behind it.
    #[instrument(skip(self), fields(atelier_id = %abbrev_id(owner_id)), err)]
    pub async fn build_aggregate_response(&self, owner_id: &str) -> Result<Option<FullAggregate>> {
        let Some(owner) = self.ateliers.find_by_external_id(owner_id).await? else {
            return Ok(None);
        };

        let Some(data) = self.build_aggregate_data(owner_id).await? else {
            debug!("Atelier disappeared between lookups");
            return Ok(None);
        };

        counter!("atelier_snapshot_reads_total").increment(1);
        Ok(Some(FullAggregate::new(&owner, data)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use serde_json::json;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::errors::DbError;
    use crate::db::models::ateliers::{Atelier, AtelierCreateDBRequest, AtelierProfile};
    use crate::db::store::{AtelierStore, DocumentStore, MemoryStore};
    use crate::test_utils::{CountingDocuments, FailingDocuments, create_test_atelier, document, stamp_all};

    #[tokio::test]
    async fn test_missing_owner_touches_no_collection() {
        let store = Arc::new(MemoryStore::new());
        let counting = Arc::new(CountingDocuments::new(store.clone()));
        let snapshots = AtelierSnapshots::new(store, counting.clone());

        assert!(snapshots.build_aggregate_data("ghost").await.unwrap().is_none());
        assert!(snapshots.build_aggregate_response("ghost").await.unwrap().is_none());
        assert_eq!(counting.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_reads_every_kind_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let atelier = create_test_atelier(store.as_ref(), "atelier-1").await;
        let now = Utc::now();

        let mut older = document(json!({ "id": "m-old" }));
        older.insert("createdAt".to_string(), json!((now - Duration::days(3)).to_rfc3339()));
        store
            .insert_many(
                EntityKind::Models,
                stamp_all(&atelier.id, vec![older, document(json!({ "id": "m-new" }))], now),
            )
            .await
            .unwrap();

        let counting = Arc::new(CountingDocuments::new(store.clone()));
        let snapshots = AtelierSnapshots::new(store, counting.clone());

        let aggregate = snapshots.build_aggregate_response("atelier-1").await.unwrap().unwrap();
        let ids: Vec<_> = aggregate.data.children.models.iter().map(|m| m["id"].clone()).collect();

        assert_eq!(ids, vec![json!("m-new"), json!("m-old")]);
        assert_eq!(aggregate.id, "atelier-1");
        assert_eq!(aggregate.name, atelier.name);
        assert_eq!(counting.reads(), EntityKind::COUNT);
    }

    #[tokio::test]
    async fn test_legacy_precedence_applied_on_read() {
        let store = Arc::new(MemoryStore::new());
        let mut atelier = create_test_atelier(store.as_ref(), "atelier-legacy").await;
        atelier.profile = AtelierProfile {
            manager_access_code: Some(String::new()),
            model_of_the_month_id: Some(None),
            ..Default::default()
        };
        atelier.legacy = json!({
            "managerAccessCode": "7731",
            "modelOfTheMonthId": "model-legacy",
            "isNew": true
        })
        .as_object()
        .cloned()
        .unwrap();
        store.save(&atelier).await.unwrap();

        let snapshots = AtelierSnapshots::new(store.clone(), store);
        let data = snapshots.build_aggregate_data("atelier-legacy").await.unwrap().unwrap();

        assert_eq!(data.manager_access_code.as_deref(), Some("7731"));
        assert_eq!(data.model_of_the_month_id, None);
        assert!(data.is_new);
        assert!(data.favorite_ids.is_empty());
    }

    #[tokio::test]
    async fn test_one_failing_collection_fails_the_read() {
        let store = Arc::new(MemoryStore::new());
        create_test_atelier(store.as_ref(), "atelier-1").await;

        let failing = Arc::new(FailingDocuments::new(store.clone()).fail_find(EntityKind::Expenses));
        let counting = Arc::new(CountingDocuments::new(failing));
        let snapshots = AtelierSnapshots::new(store, counting.clone());

        let result = snapshots.build_aggregate_data("atelier-1").await;
        assert!(matches!(result, Err(DbError::Other(_))));
        // siblings were not cancelled
        assert_eq!(counting.reads(), EntityKind::COUNT);
    }

    /// Finds the atelier on the first lookup only, as if it were deleted right after.
    struct VanishingAteliers {
        inner: Arc<MemoryStore>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl AtelierStore for VanishingAteliers {
        async fn create(&self, request: &AtelierCreateDBRequest) -> crate::db::errors::Result<Atelier> {
            self.inner.create(request).await
        }

        async fn find_by_external_id(&self, id: &str) -> crate::db::errors::Result<Option<Atelier>> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.find_by_external_id(id).await
            } else {
                Ok(None)
            }
        }

        async fn save(&self, atelier: &Atelier) -> crate::db::errors::Result<Atelier> {
            self.inner.save(atelier).await
        }
    }

    #[tokio::test]
    async fn test_owner_removed_between_lookups_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        create_test_atelier(store.as_ref(), "atelier-1").await;
        let ateliers = Arc::new(VanishingAteliers {
            inner: store.clone(),
            lookups: AtomicUsize::new(0),
        });
        let counting = Arc::new(CountingDocuments::new(store));
        let snapshots = AtelierSnapshots::new(ateliers.clone(), counting.clone());

        let aggregate = snapshots.build_aggregate_response("atelier-1").await.unwrap();

        assert!(aggregate.is_none());
        assert_eq!(ateliers.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(counting.reads(), 0);
    }
}
