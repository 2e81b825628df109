//! Composite aggregate shapes exchanged with clients.
//!
//! These are request-scoped values: they are assembled per read and consumed per replace,
//! never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use utoipa::ToSchema;

use super::legacy::ResolvedProfile;
use crate::db::models::ateliers::{Atelier, AtelierProfile, ManagerProfile, Subscription};
use crate::db::models::documents::{Document, EntityKind};
use crate::types::AtelierId;

/// One sequence of child records per entity kind, keyed by kind name.
///
/// A kind that is missing (or null) in an incoming payload deserializes to an empty
/// sequence, which a replace treats as "clear this kind".
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChildCollections {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub clients: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub models: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub appointments: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub orders: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub stations: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub supplies: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub expenses: Vec<Document>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub tutorials: Vec<Document>,
}

impl ChildCollections {
    fn slot_mut(&mut self, kind: EntityKind) -> &mut Vec<Document> {
        match kind {
            EntityKind::Clients => &mut self.clients,
            EntityKind::Models => &mut self.models,
            EntityKind::Appointments => &mut self.appointments,
            EntityKind::Orders => &mut self.orders,
            EntityKind::Stations => &mut self.stations,
            EntityKind::Supplies => &mut self.supplies,
            EntityKind::Notifications => &mut self.notifications,
            EntityKind::Expenses => &mut self.expenses,
            EntityKind::Tutorials => &mut self.tutorials,
        }
    }

    pub fn get(&self, kind: EntityKind) -> &[Document] {
        match kind {
            EntityKind::Clients => &self.clients,
            EntityKind::Models => &self.models,
            EntityKind::Appointments => &self.appointments,
            EntityKind::Orders => &self.orders,
            EntityKind::Stations => &self.stations,
            EntityKind::Supplies => &self.supplies,
            EntityKind::Notifications => &self.notifications,
            EntityKind::Expenses => &self.expenses,
            EntityKind::Tutorials => &self.tutorials,
        }
    }

    pub fn set(&mut self, kind: EntityKind, documents: Vec<Document>) {
        *self.slot_mut(kind) = documents;
    }

    /// Move the sequence for `kind` out, leaving it empty.
    pub fn take(&mut self, kind: EntityKind) -> Vec<Document> {
        std::mem::take(self.slot_mut(kind))
    }

    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.get(*kind).len()).sum()
    }
}

/// Children plus the reconciled profile fields of one atelier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateData {
    #[serde(flatten)]
    pub children: ChildCollections,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_profile: Option<ManagerProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_access_code: Option<String>,
    #[serde(default)]
    pub model_of_the_month_id: Option<String>,
    #[serde(default)]
    pub favorite_ids: Vec<String>,
    #[serde(default)]
    pub is_new: bool,
}

impl AggregateData {
    pub fn new(children: ChildCollections, profile: ResolvedProfile) -> Self {
        Self {
            children,
            manager_profile: profile.manager_profile,
            manager_access_code: profile.manager_access_code,
            model_of_the_month_id: profile.model_of_the_month_id,
            favorite_ids: profile.favorite_ids,
            is_new: profile.is_new,
        }
    }
}

/// Everything a client needs to render an atelier: the owner envelope plus its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FullAggregate {
    pub id: AtelierId,
    pub name: String,
    pub manager_id: String,
    pub subscription: Subscription,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: AggregateData,
}

impl FullAggregate {
    pub fn new(owner: &Atelier, data: AggregateData) -> Self {
        Self {
            id: owner.id.clone(),
            name: owner.name.clone(),
            manager_id: owner.manager_id.clone(),
            subscription: owner.subscription.clone(),
            created_at: owner.created_at,
            data,
        }
    }
}

/// A full data set pushed by a client. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct ReplacePayload {
    #[serde(flatten)]
    pub children: ChildCollections,
    #[serde(flatten)]
    pub profile: AtelierProfile,
}
