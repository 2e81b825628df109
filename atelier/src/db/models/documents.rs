//! Database models for the per-kind child document collections.
//!
//! Child records are opaque JSON objects whose schema is owned by their respective domains.
//! This layer only relies on three keys: the record id, the owning atelier id and the
//! creation timestamp.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::AtelierId;

/// Opaque child record body.
pub type Document = Map<String, Value>;

/// Key holding a record's own identifier.
pub const ID_KEY: &str = "id";
/// Key holding the owning atelier's external id.
pub const OWNER_KEY: &str = "atelierId";
/// Key holding the record creation timestamp (RFC 3339).
pub const CREATED_AT_KEY: &str = "createdAt";

/// The nine child entity kinds anchored to an atelier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Clients,
    Models,
    Appointments,
    Orders,
    Stations,
    Supplies,
    Notifications,
    Expenses,
    Tutorials,
}

impl EntityKind {
    pub const COUNT: usize = 9;

    pub const ALL: [EntityKind; Self::COUNT] = [
        Self::Clients,
        Self::Models,
        Self::Appointments,
        Self::Orders,
        Self::Stations,
        Self::Supplies,
        Self::Notifications,
        Self::Expenses,
        Self::Tutorials,
    ];

    /// Key used for this kind in aggregate payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Models => "models",
            Self::Appointments => "appointments",
            Self::Orders => "orders",
            Self::Stations => "stations",
            Self::Supplies => "supplies",
            Self::Notifications => "notifications",
            Self::Expenses => "expenses",
            Self::Tutorials => "tutorials",
        }
    }

    /// Backing table in the Postgres store. Only ever built from this fixed set.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Clients => "atelier_clients",
            Self::Models => "atelier_models",
            Self::Appointments => "atelier_appointments",
            Self::Orders => "atelier_orders",
            Self::Stations => "atelier_stations",
            Self::Supplies => "atelier_supplies",
            Self::Notifications => "atelier_notifications",
            Self::Expenses => "atelier_expenses",
            Self::Tutorials => "atelier_tutorials",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity kind: {}", s))
    }
}

/// A child record ready to be written, with its indexed keys lifted out of the body.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInsert {
    pub id: String,
    pub owner_id: AtelierId,
    pub created_at: DateTime<Utc>,
    pub body: Document,
}

impl DocumentInsert {
    /// Scope a client-supplied record to `owner_id`.
    ///
    /// The owner key is always overwritten, whatever the payload carried. A missing id gets a
    /// fresh UUID and a missing or unparseable `createdAt` gets `now`; both are written back
    /// into the body so readers see the stored values.
    pub fn stamp(owner_id: &str, mut body: Document, now: DateTime<Utc>) -> Self {
        body.insert(OWNER_KEY.to_string(), Value::String(owner_id.to_string()));

        let id = match body.get(ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                let id = Uuid::new_v4().to_string();
                body.insert(ID_KEY.to_string(), Value::String(id.clone()));
                id
            }
        };

        let created_at = match body.get(CREATED_AT_KEY).and_then(Value::as_str).map(DateTime::parse_from_rfc3339) {
            Some(Ok(ts)) => ts.with_timezone(&Utc),
            _ => {
                body.insert(CREATED_AT_KEY.to_string(), Value::String(now.to_rfc3339()));
                now
            }
        };

        Self {
            id,
            owner_id: owner_id.to_string(),
            created_at,
            body,
        }
    }
}
