//! API request/response models for atelier registration and lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::db::models::ateliers::{Atelier, AtelierCreateDBRequest, AtelierProfile, Subscription};
use crate::types::AtelierId;

/// Request body for registering a new atelier.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AtelierCreate {
    /// External identifier. Generated (UUID) when omitted.
    #[schema(example = "atelier-dakar-01")]
    pub id: Option<AtelierId>,
    #[schema(example = "Couture Sokhna")]
    pub name: String,
    /// Owning user
    pub manager_id: String,
    #[serde(default)]
    pub subscription: Subscription,
    /// Initial profile attributes
    #[serde(flatten)]
    pub profile: AtelierProfile,
    /// Profile data imported from an older record format
    #[serde(default)]
    #[schema(value_type = Object)]
    pub legacy: Map<String, Value>,
}

impl From<AtelierCreate> for AtelierCreateDBRequest {
    fn from(create: AtelierCreate) -> Self {
        Self {
            id: create.id,
            name: create.name,
            manager_id: create.manager_id,
            subscription: create.subscription,
            profile: create.profile,
            legacy: create.legacy,
        }
    }
}

/// Atelier envelope returned by the API. Profile fields are served by the data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AtelierResponse {
    pub id: AtelierId,
    pub name: String,
    pub manager_id: String,
    pub subscription: Subscription,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Atelier> for AtelierResponse {
    fn from(atelier: Atelier) -> Self {
        Self {
            id: atelier.id,
            name: atelier.name,
            manager_id: atelier.manager_id,
            subscription: atelier.subscription,
            created_at: atelier.created_at,
            updated_at: atelier.updated_at,
        }
    }
}
