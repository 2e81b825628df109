//! Progress record for whole-aggregate replacement.
//!
//! A replace touches the owner record and then nine collections with no transaction spanning
//! them. The journal is the saga state: it is filled in as each step reports back, and it is
//! what a caller receives when the replace stops half way.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::db::models::documents::EntityKind;
use crate::types::AtelierId;

/// Which fan-out group a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePhase {
    Delete,
    Insert,
}

impl fmt::Display for ReplacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("delete"),
            Self::Insert => f.write_str("insert"),
        }
    }
}

/// A step that reported an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub kind: EntityKind,
    pub phase: ReplacePhase,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceJournal {
    pub atelier_id: AtelierId,
    /// Profile fields were written to the owner record.
    pub profile_committed: bool,
    /// Kinds the payload asked to populate, with the number of documents requested.
    pub planned: BTreeMap<EntityKind, u64>,
    /// Kinds whose delete completed, with the number of documents removed.
    pub cleared: BTreeMap<EntityKind, u64>,
    /// Kinds whose insert completed, with the number of documents written.
    pub inserted: BTreeMap<EntityKind, u64>,
    /// Set once the insert phase has been issued.
    pub insert_phase_started: bool,
    pub failures: Vec<StepFailure>,
}

impl ReplaceJournal {
    pub fn new(atelier_id: &str) -> Self {
        Self {
            atelier_id: atelier_id.to_string(),
            profile_committed: false,
            planned: BTreeMap::new(),
            cleared: BTreeMap::new(),
            inserted: BTreeMap::new(),
            insert_phase_started: false,
            failures: Vec::new(),
        }
    }

    pub fn record_planned(&mut self, kind: EntityKind, requested: u64) {
        self.planned.insert(kind, requested);
    }

    pub fn record_cleared(&mut self, kind: EntityKind, removed: u64) {
        self.cleared.insert(kind, removed);
    }

    pub fn record_inserted(&mut self, kind: EntityKind, written: u64) {
        self.inserted.insert(kind, written);
    }

    pub fn record_failure(&mut self, kind: EntityKind, phase: ReplacePhase, error: &impl fmt::Display) {
        self.failures.push(StepFailure {
            kind,
            phase,
            message: error.to_string(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Kinds that failed in `phase`, sorted by `EntityKind`'s derived `Ord`, which follows
    /// declaration order.
    pub fn failed_kinds(&self, phase: ReplacePhase) -> Vec<EntityKind> {
        let mut kinds: Vec<_> = self.failures.iter().filter(|f| f.phase == phase).map(|f| f.kind).collect();
        kinds.sort();
        kinds
    }

    /// Kinds whose stored documents do not match the payload: every kind with a failed
    /// step, plus every planned kind that was cleared but never written back (all of them
    /// when a delete failure skipped the insert phase).
    pub fn inconsistent_kinds(&self) -> Vec<EntityKind> {
        let unwritten = self
            .planned
            .keys()
            .filter(|kind| self.cleared.contains_key(kind) && !self.inserted.contains_key(kind));

        let mut kinds: Vec<_> = self.failures.iter().map(|f| f.kind).chain(unwritten.copied()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// One-line description for logs and error messages.
    pub fn summary(&self) -> String {
        let failed = self
            .failures
            .iter()
            .map(|f| format!("{} {}", f.phase, f.kind))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "profile_committed={}, cleared={}/{}, inserted={}/{}, failed=[{}]",
            self.profile_committed,
            self.cleared.len(),
            EntityKind::COUNT,
            self.inserted.len(),
            self.planned.len(),
            failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_kinds_by_phase() {
        let mut journal = ReplaceJournal::new("atelier-1");
        journal.record_failure(EntityKind::Orders, ReplacePhase::Insert, &"boom");
        journal.record_failure(EntityKind::Clients, ReplacePhase::Insert, &"boom");
        journal.record_failure(EntityKind::Stations, ReplacePhase::Delete, &"boom");

        assert_eq!(
            journal.failed_kinds(ReplacePhase::Insert),
            vec![EntityKind::Clients, EntityKind::Orders]
        );
        assert_eq!(journal.failed_kinds(ReplacePhase::Delete), vec![EntityKind::Stations]);
        assert!(journal.has_failures());
    }

    #[test]
    fn test_summary_names_failed_steps() {
        let mut journal = ReplaceJournal::new("atelier-1");
        journal.profile_committed = true;
        journal.record_cleared(EntityKind::Clients, 3);
        journal.record_failure(EntityKind::Models, ReplacePhase::Delete, &"connection reset");

        assert_eq!(
            journal.summary(),
            "profile_committed=true, cleared=1/9, inserted=0/0, failed=[delete models]"
        );
        assert_eq!(journal.inconsistent_kinds(), vec![EntityKind::Models]);
    }

    #[test]
    fn test_skipped_inserts_count_as_inconsistent() {
        let mut journal = ReplaceJournal::new("atelier-1");
        journal.record_planned(EntityKind::Clients, 2);
        journal.record_planned(EntityKind::Orders, 1);
        for kind in EntityKind::ALL {
            if kind != EntityKind::Appointments {
                journal.record_cleared(kind, 1);
            }
        }
        journal.record_failure(EntityKind::Appointments, ReplacePhase::Delete, &"timeout");

        assert_eq!(
            journal.inconsistent_kinds(),
            vec![EntityKind::Clients, EntityKind::Appointments, EntityKind::Orders]
        );
    }

    #[test]
    fn test_written_kinds_are_consistent_after_insert_failure() {
        let mut journal = ReplaceJournal::new("atelier-1");
        for kind in EntityKind::ALL {
            journal.record_cleared(kind, 0);
        }
        journal.record_planned(EntityKind::Clients, 2);
        journal.record_planned(EntityKind::Expenses, 1);
        journal.insert_phase_started = true;
        journal.record_inserted(EntityKind::Expenses, 1);
        journal.record_failure(EntityKind::Clients, ReplacePhase::Insert, &"boom");

        assert_eq!(journal.inconsistent_kinds(), vec![EntityKind::Clients]);
    }
}
