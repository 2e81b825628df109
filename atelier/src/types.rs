//! Common type definitions.
//!
//! # ID Types
//!
//! - [`AtelierId`]: external atelier identifier, the key every lookup and every child
//!   collection uses
//! - [`StorageKey`]: internal primary key of the owning record, never exposed to callers
//!
//! # Utility Functions
//!
//! - [`abbrev_id`]: Abbreviate identifiers to their first 8 chars for logging

use uuid::Uuid;

pub type AtelierId = String;
pub type StorageKey = Uuid;

/// Abbreviate an identifier to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_id(id: &str) -> String {
    id.chars().take(8).collect()
}
