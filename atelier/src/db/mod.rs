//! Persistence layer.
//!
//! ```text
//! ┌──────────────────┐
//! │ snapshot / api   │
//! └────────┬─────────┘
//!          │  AtelierStore + DocumentStore (store)
//!          ↓
//! ┌──────────────────┐      ┌──────────────────┐
//! │  PostgresStore   │  or  │   MemoryStore    │
//! └──────────────────┘      └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: storage traits and their two backends
//! - [`models`]: owning records and child documents
//! - [`errors`]: database-specific error types

pub mod errors;
pub mod models;
pub mod store;
