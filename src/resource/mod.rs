//! Resource Controller Module
//!
//! Binds a scope-owned remote collection to observable local state with a
//! uniform loading/error protocol.
//!
//! # Modules
//!
//! - [`controller`] - The generic controller and its state snapshot
//! - [`filters`] - Typed list filters and their merge rules
//! - [`error`] - Operation kinds and the caller-facing error

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::hash::Hash;

pub mod controller;
pub mod error;
pub mod filters;

pub use controller::{FetchOutcome, LoadStatus, ResourceController, ResourceState};
pub use error::{Operation, ResourceError};
pub use filters::ListFilters;

/// A record type that lives in a scope-owned REST collection
pub trait Resource: DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Lifecycle status carried by each record
    type Status: Serialize
        + DeserializeOwned
        + Clone
        + PartialEq
        + Eq
        + Hash
        + fmt::Display
        + fmt::Debug
        + Send
        + Sync
        + 'static;

    /// Create/update payload
    type Draft: Serialize + Send + Sync;

    /// Lowercase singular name used in user-facing messages
    const LABEL: &'static str;

    fn collection_path(scope_id: &str) -> String;

    fn item_path(scope_id: &str, id: &str) -> String {
        format!(
            "{}/{}",
            Self::collection_path(scope_id),
            urlencoding::encode(id)
        )
    }

    fn status_path(scope_id: &str, id: &str) -> String {
        format!("{}/status", Self::item_path(scope_id, id))
    }

    fn id(&self) -> &str;

    fn status(&self) -> Option<&Self::Status>;
}
