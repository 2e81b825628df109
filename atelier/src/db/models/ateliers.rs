//! Database models for owning atelier records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::db::errors::DbError;
use crate::types::{AtelierId, StorageKey};

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Pending,
    #[default]
    Trial,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Trial => "trial",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "pending" => Ok(Self::Pending),
            "trial" => Ok(Self::Trial),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

/// Subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Trial,
    Premium,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Premium => "premium",
        }
    }
}

impl std::str::FromStr for SubscriptionPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(Self::Trial),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("Unknown subscription plan: {}", s)),
        }
    }
}

/// Subscription block carried by every atelier. Expiry arithmetic is owned by billing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub status: SubscriptionStatus,
    pub plan: SubscriptionPlan,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Manager profile shown on the workshop dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagerProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
}

/// First-class profile attributes of an atelier.
///
/// `None` means the attribute was never set on the record, which is what sends readers to
/// the legacy bag. Apart from the access code every field is tri-state: `Some(None)` is an
/// explicit null written by a client and must be kept distinct from an unset attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AtelierProfile {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<ManagerProfile>)]
    pub manager_profile: Option<Option<ManagerProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_access_code: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub model_of_the_month_id: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<Vec<String>>)]
    pub favorite_ids: Option<Option<Vec<String>>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<bool>)]
    pub is_new: Option<Option<bool>>,
}

/// Owning atelier record.
#[derive(Debug, Clone, PartialEq)]
pub struct Atelier {
    pub storage_key: StorageKey,
    pub id: AtelierId,
    pub name: String,
    pub manager_id: String,
    pub subscription: Subscription,
    pub profile: AtelierProfile,
    /// Holdover blob from before profile fields were promoted to columns.
    pub legacy: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new atelier.
#[derive(Debug, Clone, Default)]
pub struct AtelierCreateDBRequest {
    /// External id; generated when absent
    pub id: Option<AtelierId>,
    pub name: String,
    pub manager_id: String,
    pub subscription: Subscription,
    pub profile: AtelierProfile,
    pub legacy: Map<String, Value>,
}

/// Row shape of the `ateliers` table.
#[derive(Debug, FromRow)]
pub struct AtelierRow {
    pub storage_key: StorageKey,
    pub id: AtelierId,
    pub name: String,
    pub manager_id: String,
    pub subscription_status: String,
    pub subscription_plan: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub manager_profile: Option<Json<Option<ManagerProfile>>>,
    pub manager_access_code: Option<String>,
    pub model_of_the_month_id: Option<Json<Option<String>>>,
    pub favorite_ids: Option<Json<Option<Vec<String>>>>,
    pub is_new: Option<Json<Option<bool>>>,
    pub legacy: Json<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AtelierRow> for Atelier {
    type Error = DbError;

    fn try_from(row: AtelierRow) -> Result<Self, Self::Error> {
        let status = row.subscription_status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        let plan = row.subscription_plan.parse().map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(Atelier {
            storage_key: row.storage_key,
            id: row.id,
            name: row.name,
            manager_id: row.manager_id,
            subscription: Subscription {
                status,
                plan,
                expires_at: row.subscription_expires_at,
            },
            profile: AtelierProfile {
                manager_profile: row.manager_profile.map(|Json(profile)| profile),
                manager_access_code: row.manager_access_code,
                model_of_the_month_id: row.model_of_the_month_id.map(|Json(id)| id),
                favorite_ids: row.favorite_ids.map(|Json(ids)| ids),
                is_new: row.is_new.map(|Json(flag)| flag),
            },
            legacy: row.legacy.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_keeps_explicit_null_distinct_from_unset() {
        let unset: AtelierProfile = serde_json::from_value(json!({})).unwrap();
        assert_eq!(unset.model_of_the_month_id, None);

        let explicit: AtelierProfile = serde_json::from_value(json!({ "modelOfTheMonthId": null })).unwrap();
        assert_eq!(explicit.model_of_the_month_id, Some(None));

        let set: AtelierProfile = serde_json::from_value(json!({ "modelOfTheMonthId": "m-1" })).unwrap();
        assert_eq!(set.model_of_the_month_id, Some(Some("m-1".to_string())));

        // explicit null survives serialization, unset is omitted
        assert_eq!(serde_json::to_value(&explicit).unwrap(), json!({ "modelOfTheMonthId": null }));
        assert_eq!(serde_json::to_value(&unset).unwrap(), json!({}));
    }

    #[test]
    fn test_profile_explicit_nulls_for_every_tri_state_field() {
        let cleared: AtelierProfile = serde_json::from_value(json!({
            "managerProfile": null,
            "favoriteIds": null,
            "isNew": null
        }))
        .unwrap();

        assert_eq!(cleared.manager_profile, Some(None));
        assert_eq!(cleared.favorite_ids, Some(None));
        assert_eq!(cleared.is_new, Some(None));
        assert_eq!(
            serde_json::to_value(&cleared).unwrap(),
            json!({ "managerProfile": null, "favoriteIds": null, "isNew": null })
        );
    }

    #[test]
    fn test_manager_profile_type_field() {
        let profile: ManagerProfile = serde_json::from_value(json!({
            "name": "Amina",
            "type": "tailor",
            "employeeCount": 4
        }))
        .unwrap();

        assert_eq!(profile.kind.as_deref(), Some("tailor"));
        assert_eq!(profile.employee_count, Some(4));
        assert_eq!(profile.avatar, None);
    }

    #[test]
    fn test_subscription_round_trips_through_column_strings() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Trial,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
        assert_eq!("premium".parse::<SubscriptionPlan>().unwrap(), SubscriptionPlan::Premium);
        assert!("gold".parse::<SubscriptionPlan>().is_err());
    }
}
