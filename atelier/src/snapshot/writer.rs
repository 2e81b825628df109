use chrono::Utc;
use futures::future::join_all;
use metrics::counter;
use tracing::{debug, error, info, instrument};

use super::AtelierSnapshots;
use super::aggregate::ReplacePayload;
use super::journal::{ReplaceJournal, ReplacePhase};
use crate::db::errors::{DbError, Result};
use crate::db::models::documents::{DocumentInsert, EntityKind};
use crate::types::abbrev_id;

impl AtelierSnapshots {
    /// Replace everything stored for `owner_id` with `payload`.
    ///
    /// Returns `Ok(false)` without touching anything when the atelier does not exist.
    ///
    /// Profile fields are copied verbatim from the payload (an absent field clears the
    /// attribute), then every collection is emptied and the non-empty kinds of the payload
    /// are inserted. A kind missing from the payload therefore ends up empty.
    ///
    /// # Errors
    ///
    /// A failure in the profile save or the owner lookup is returned as-is. Any failure once
    /// the collections are being touched becomes [`DbError::PartialReplace`]: if a delete
    /// fails no insert is attempted, and nothing already written is undone.
    #[instrument(skip(self, payload), fields(atelier_id = %abbrev_id(owner_id), records = payload.children.total()), err)]
    pub async fn replace_aggregate_data(&self, owner_id: &str, payload: ReplacePayload) -> Result<bool> {
        let Some(mut owner) = self.ateliers.find_by_external_id(owner_id).await? else {
            debug!("Atelier not found, nothing replaced");
            return Ok(false);
        };

        let ReplacePayload { mut children, profile } = payload;
        let mut journal = ReplaceJournal::new(owner_id);

        let now = Utc::now();
        let batches: Vec<(EntityKind, Vec<DocumentInsert>)> = EntityKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let records = children.take(kind);
                (!records.is_empty()).then(|| {
                    let stamped = records
                        .into_iter()
                        .map(|record| DocumentInsert::stamp(owner_id, record, now))
                        .collect();
                    (kind, stamped)
                })
            })
            .collect();
        for (kind, batch) in &batches {
            journal.record_planned(*kind, batch.len() as u64);
        }

        owner.profile = profile;
        self.ateliers.save(&owner).await?;
        journal.profile_committed = true;

        let documents = &self.documents;
        let deletes = join_all(
            EntityKind::ALL.map(move |kind| async move { (kind, documents.delete_by_owner(kind, owner_id).await) }),
        )
        .await;

        for (kind, result) in deletes {
            match result {
                Ok(removed) => journal.record_cleared(kind, removed),
                Err(e) => journal.record_failure(kind, ReplacePhase::Delete, &e),
            }
        }

        if journal.has_failures() {
            return Err(partial_replace(journal));
        }

        journal.insert_phase_started = true;
        let inserts = join_all(
            batches
                .into_iter()
                .map(move |(kind, batch)| async move { (kind, documents.insert_many(kind, batch).await) }),
        )
        .await;

        for (kind, result) in inserts {
            match result {
                Ok(written) => journal.record_inserted(kind, written),
                Err(e) => journal.record_failure(kind, ReplacePhase::Insert, &e),
            }
        }

        if journal.has_failures() {
            return Err(partial_replace(journal));
        }

        counter!("atelier_snapshot_replaces_total").increment(1);
        info!(
            cleared = journal.cleared.values().sum::<u64>(),
            inserted = journal.inserted.values().sum::<u64>(),
            "Replaced atelier aggregate"
        );

        Ok(true)
    }
}

fn partial_replace(journal: ReplaceJournal) -> DbError {
    counter!("atelier_snapshot_partial_replaces_total").increment(1);
    error!(
        atelier_id = %journal.atelier_id,
        inconsistent = ?journal.inconsistent_kinds(),
        insert_phase_started = journal.insert_phase_started,
        failures = ?journal.failures,
        "Atelier replace stopped part way, collections left inconsistent"
    );
    DbError::PartialReplace(Box::new(journal))
}
