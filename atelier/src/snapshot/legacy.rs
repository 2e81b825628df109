//! Two-source resolution of atelier profile fields.
//!
//! Profile attributes used to live inside an unstructured `legacy` blob before they became
//! first-class columns. Older records may still only carry them there, so every read
//! resolves each field from the first-class attribute first and the legacy blob second.
//!
//! The rule for "first-class attribute is missing" is deliberately NOT the same for every
//! field, and existing clients depend on the differences:
//!
//! | field               | legacy is consulted when the attribute is... |
//! |---------------------|----------------------------------------------|
//! | `managerProfile`    | unset; an explicit null is kept              |
//! | `managerAccessCode` | unset, null or empty (falsy)                 |
//! | `modelOfTheMonthId` | unset; an explicit null is kept              |
//! | `favoriteIds`       | unset; an explicit null reads as `[]`        |
//! | `isNew`             | unset; explicit `false` or null reads false  |
//!
//! The access-code asymmetry looks accidental. It is preserved here until product decides
//! otherwise; see DESIGN.md.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::db::models::ateliers::{AtelierProfile, ManagerProfile};

pub const MANAGER_PROFILE_KEY: &str = "managerProfile";
pub const MANAGER_ACCESS_CODE_KEY: &str = "managerAccessCode";
pub const MODEL_OF_THE_MONTH_KEY: &str = "modelOfTheMonthId";
pub const FAVORITE_IDS_KEY: &str = "favoriteIds";
pub const IS_NEW_KEY: &str = "isNew";

/// Profile fields after first-class/legacy reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub manager_profile: Option<ManagerProfile>,
    pub manager_access_code: Option<String>,
    pub model_of_the_month_id: Option<String>,
    pub favorite_ids: Vec<String>,
    pub is_new: bool,
}

pub fn resolve_profile(profile: &AtelierProfile, legacy: &Map<String, Value>) -> ResolvedProfile {
    ResolvedProfile {
        manager_profile: manager_profile(profile.manager_profile.as_ref(), legacy),
        manager_access_code: manager_access_code(profile.manager_access_code.as_deref(), legacy),
        model_of_the_month_id: model_of_the_month_id(profile.model_of_the_month_id.as_ref(), legacy),
        favorite_ids: favorite_ids(profile.favorite_ids.as_ref(), legacy),
        is_new: is_new(profile.is_new, legacy),
    }
}

fn manager_profile(
    first_class: Option<&Option<ManagerProfile>>,
    legacy: &Map<String, Value>,
) -> Option<ManagerProfile> {
    match first_class {
        Some(explicit) => explicit.clone(),
        None => legacy_field(legacy, MANAGER_PROFILE_KEY),
    }
}

// Falsy-or-missing: an empty first-class code still defers to the legacy value.
fn manager_access_code(first_class: Option<&str>, legacy: &Map<String, Value>) -> Option<String> {
    match first_class {
        Some(code) if !code.is_empty() => Some(code.to_string()),
        _ => legacy_field(legacy, MANAGER_ACCESS_CODE_KEY),
    }
}

fn model_of_the_month_id(first_class: Option<&Option<String>>, legacy: &Map<String, Value>) -> Option<String> {
    match first_class {
        Some(explicit) => explicit.clone(),
        None => legacy_field(legacy, MODEL_OF_THE_MONTH_KEY),
    }
}

fn favorite_ids(first_class: Option<&Option<Vec<String>>>, legacy: &Map<String, Value>) -> Vec<String> {
    match first_class {
        Some(explicit) => explicit.clone().unwrap_or_default(),
        None => legacy_field(legacy, FAVORITE_IDS_KEY).unwrap_or_default(),
    }
}

fn is_new(first_class: Option<Option<bool>>, legacy: &Map<String, Value>) -> bool {
    match first_class {
        Some(explicit) => explicit.unwrap_or(false),
        None => legacy_field(legacy, IS_NEW_KEY).unwrap_or(false),
    }
}

/// Read `key` from the legacy blob. JSON null counts as absent; a value of the wrong shape
/// is logged and treated as absent rather than failing the whole read.
fn legacy_field<T: DeserializeOwned>(legacy: &Map<String, Value>, key: &str) -> Option<T> {
    let value = legacy.get(key).filter(|v| !v.is_null())?;

    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = key, error = %e, "Ignoring malformed legacy profile field");
            None
        }
    }
}
