//! Resource Controller - observable CRUD state over a REST collection
//!
//! ## State machine
//!
//! Every operation moves `status` through `Idle → Loading → {Ready, Failed}`.
//! `Ready` and `Failed` are both stable until the next operation starts.
//! In-flight requests are never cancelled.
//!
//! ## Ordering
//!
//! Each list request captures a generation number from a monotonically
//! increasing counter. A response commits only while its generation is still
//! the newest one issued, so a slow reply to a superseded request can never
//! overwrite the result of a later one.
//!
//! Load and mutation failures stamp the newest list generation at the time
//! they fail. A list response from that generation or earlier still replaces
//! `items` but leaves the failure's `status` and `last_error` in place.
//!
//! ## Error protocol
//!
//! - List failures reset `items` to empty and record `last_error`; nobody is
//!   notified and nothing is returned as an error.
//! - Load and mutation failures record `last_error`, emit an error
//!   notification and return the error to the caller.

use log::{debug, info};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::error::{Operation, ResourceError};
use super::filters::ListFilters;
use super::Resource;
use crate::api::{unwrap_envelope, ApiClient, ApiError};
use crate::notify::Notifier;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What happened to a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced `items`
    Applied,
    /// The request failed; `items` were reset and `last_error` set
    Failed,
    /// A newer list request was issued meanwhile; the response was discarded
    Stale,
    /// The controller was detached before the response arrived
    Detached,
    /// No scope is known yet, so nothing was requested
    Skipped,
}

/// Snapshot of a controller's local state
#[derive(Debug, Clone)]
pub struct ResourceState<R: Resource> {
    pub items: Vec<R>,
    pub selected: Option<R>,
    pub status: LoadStatus,
    pub last_error: Option<String>,
    pub filters: ListFilters<R::Status>,
    /// Scope of the most recent list request
    pub scope_id: Option<String>,
}

impl<R: Resource> Default for ResourceState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            status: LoadStatus::Idle,
            last_error: None,
            filters: ListFilters::default(),
            scope_id: None,
        }
    }
}

impl<R: Resource> ResourceState<R> {
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn count_by_status(&self, status: &R::Status) -> usize {
        self.items
            .iter()
            .filter(|item| item.status() == Some(status))
            .count()
    }

    /// Item counts per status; items without a status are not counted
    #[must_use]
    pub fn status_counts(&self) -> HashMap<R::Status, usize> {
        let mut counts = HashMap::new();
        for status in self.items.iter().filter_map(R::status) {
            *counts.entry(status.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }
}

pub struct ResourceController<R: Resource> {
    api: Arc<dyn ApiClient>,
    notifier: Arc<dyn Notifier>,
    default_filters: ListFilters<R::Status>,
    state: watch::Sender<ResourceState<R>>,
    issued: AtomicU64,
    /// Newest list generation issued when a load or mutation last failed
    failed_at: AtomicU64,
    attached: AtomicBool,
}

// =============================================================================
// Construction and accessors
// =============================================================================

impl<R: Resource> ResourceController<R> {
    #[must_use]
    pub fn new(api: Arc<dyn ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            api,
            notifier,
            default_filters: ListFilters::default(),
            state,
            issued: AtomicU64::new(0),
            failed_at: AtomicU64::new(0),
            attached: AtomicBool::new(true),
        }
    }

    /// Set the filters restored by [`Self::clear_filters`] and apply them now
    #[must_use]
    pub fn with_default_filters(mut self, filters: ListFilters<R::Status>) -> Self {
        self.default_filters = filters.clone();
        self.state.send_modify(|s| s.filters = filters);
        self
    }

    /// Clone of the current state
    #[must_use]
    pub fn snapshot(&self) -> ResourceState<R> {
        self.state.borrow().clone()
    }

    /// Receiver woken on every committed state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<R>> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn items(&self) -> Vec<R> {
        self.state.borrow().items.clone()
    }

    #[must_use]
    pub fn selected(&self) -> Option<R> {
        self.state.borrow().selected.clone()
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.state.borrow().status
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    #[must_use]
    pub fn filters(&self) -> ListFilters<R::Status> {
        self.state.borrow().filters.clone()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.state.borrow().total()
    }

    #[must_use]
    pub fn count_by_status(&self, status: &R::Status) -> usize {
        self.state.borrow().count_by_status(status)
    }

    #[must_use]
    pub fn status_counts(&self) -> HashMap<R::Status, usize> {
        self.state.borrow().status_counts()
    }

    /// Stop committing responses; in-flight requests still run to completion
    pub fn detach(&self) {
        debug!("Detaching {} controller", R::LABEL);
        self.attached.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

// =============================================================================
// List operations
// =============================================================================

impl<R: Resource> ResourceController<R> {
    /// List the scope's records with the current filters
    ///
    /// When `filters` is given it replaces the current filter set first.
    pub async fn fetch_all(
        &self,
        scope_id: &str,
        filters: Option<ListFilters<R::Status>>,
    ) -> FetchOutcome {
        if !self.is_attached() {
            return FetchOutcome::Detached;
        }

        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let mut query = Vec::new();
        self.state.send_modify(|s| {
            if let Some(filters) = filters {
                s.filters = filters;
            }
            s.scope_id = Some(scope_id.to_string());
            s.status = LoadStatus::Loading;
            s.last_error = None;
            query = s.filters.to_query();
        });

        let result = match self.api.get(&R::collection_path(scope_id), &query).await {
            Ok(body) => Self::decode_collection(body),
            Err(e) => Err(ResourceError::from_api(Operation::List, R::LABEL, e)),
        };

        if !self.is_attached() {
            return FetchOutcome::Detached;
        }

        let mut outcome = FetchOutcome::Stale;
        self.state.send_if_modified(|s| {
            if self.issued.load(Ordering::SeqCst) != generation {
                return false;
            }
            let failed_since_issue = self.failed_at.load(Ordering::SeqCst) >= generation;
            match result {
                Ok(items) => {
                    debug!("Loaded {} {} record(s)", items.len(), R::LABEL);
                    s.items = items;
                    if !failed_since_issue {
                        s.status = LoadStatus::Ready;
                        s.last_error = None;
                    }
                    outcome = FetchOutcome::Applied;
                }
                Err(error) => {
                    info!("{} list failed: {error}", R::LABEL);
                    s.items.clear();
                    s.status = LoadStatus::Failed;
                    if !failed_since_issue {
                        s.last_error = Some(error.message);
                    }
                    outcome = FetchOutcome::Failed;
                }
            }
            true
        });

        if outcome == FetchOutcome::Stale {
            debug!(
                "Discarded stale {} list response (generation {generation})",
                R::LABEL
            );
        }
        outcome
    }

    /// Re-issue the list request for the current scope and filters
    pub async fn refresh(&self) -> FetchOutcome {
        let scope = self.state.borrow().scope_id.clone();
        match scope {
            Some(scope_id) => self.fetch_all(&scope_id, None).await,
            None => FetchOutcome::Skipped,
        }
    }

    /// Shallow-merge `update` into the current filters without refetching
    pub fn update_filters(&self, update: ListFilters<R::Status>) {
        self.commit(|s| {
            s.filters.merge(update);
            true
        });
    }

    /// Merge `update` and issue exactly one list request for the current scope
    pub async fn apply_filters(&self, update: ListFilters<R::Status>) -> FetchOutcome {
        self.update_filters(update);
        self.refresh().await
    }

    /// Restore the construction-time filters
    pub fn clear_filters(&self) {
        let defaults = self.default_filters.clone();
        self.commit(|s| {
            s.filters = defaults;
            true
        });
    }

    fn decode_collection(body: Value) -> Result<Vec<R>, ResourceError> {
        let list = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("items")) {
                Some(Value::Array(items)) => items,
                Some(Value::Object(mut page)) => match page.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            },
            other => {
                debug!("Coercing non-list {} response to empty: {other}", R::LABEL);
                Vec::new()
            }
        };

        list.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<R>, _>>()
            .map_err(|e| ResourceError::malformed(Operation::List, R::LABEL, &e.to_string()))
    }
}

// =============================================================================
// Single-record operations
// =============================================================================

impl<R: Resource> ResourceController<R> {
    /// Load one record into `selected`
    ///
    /// # Errors
    ///
    /// Returns an error (after notifying) if the request fails or the body is
    /// not a record.
    pub async fn fetch_one(&self, scope_id: &str, id: &str) -> Result<R, ResourceError> {
        self.begin();
        let body = self
            .api
            .get(&R::item_path(scope_id, id), &[])
            .await
            .map_err(|e| self.fail(ResourceError::from_api(Operation::Load, R::LABEL, e)))?;

        let item = Self::decode_item(body).map_err(|e| {
            self.fail(ResourceError::malformed(Operation::Load, R::LABEL, &e.to_string()))
        })?;

        let selected = item.clone();
        self.commit(|s| {
            s.selected = Some(selected);
            s.status = LoadStatus::Ready;
            true
        });
        Ok(item)
    }

    /// Create a record, then reload the list
    ///
    /// Returns the created record when the server echoes it back.
    ///
    /// # Errors
    ///
    /// Returns an error (after notifying) if the request fails. No list
    /// refresh happens in that case.
    pub async fn create(
        &self,
        scope_id: &str,
        draft: &R::Draft,
    ) -> Result<Option<R>, ResourceError> {
        self.begin();
        let body = self.encode_draft(Operation::Create, draft)?;
        let response = self
            .api
            .post(&R::collection_path(scope_id), body)
            .await
            .map_err(|e| self.fail(ResourceError::from_api(Operation::Create, R::LABEL, e)))?;

        let created = Self::decode_item(response).ok();
        self.notifier
            .success(&format!("{} created successfully", capitalized(R::LABEL)));
        let _ = self.fetch_all(scope_id, None).await;
        Ok(created)
    }

    /// Update a record, refresh `selected` if it is the same record, then reload the list
    ///
    /// # Errors
    ///
    /// Returns an error (after notifying) if the request fails.
    pub async fn update(
        &self,
        scope_id: &str,
        id: &str,
        draft: &R::Draft,
    ) -> Result<Option<R>, ResourceError> {
        self.begin();
        let body = self.encode_draft(Operation::Update, draft)?;
        let response = self
            .api
            .put(&R::item_path(scope_id, id), body)
            .await
            .map_err(|e| self.fail(ResourceError::from_api(Operation::Update, R::LABEL, e)))?;

        let updated = Self::decode_item(response).ok();
        self.replace_selected(id, updated.as_ref());
        self.notifier
            .success(&format!("{} updated successfully", capitalized(R::LABEL)));
        let _ = self.fetch_all(scope_id, None).await;
        Ok(updated)
    }

    /// Delete a record, drop it from `selected`, then reload the list
    ///
    /// # Errors
    ///
    /// Returns an error (after notifying) if the request fails.
    pub async fn remove(&self, scope_id: &str, id: &str) -> Result<(), ResourceError> {
        self.begin();
        self.api
            .delete(&R::item_path(scope_id, id))
            .await
            .map_err(|e| self.fail(ResourceError::from_api(Operation::Delete, R::LABEL, e)))?;

        self.commit(|s| {
            if s.selected.as_ref().is_some_and(|sel| sel.id() == id) {
                s.selected = None;
                return true;
            }
            false
        });
        self.notifier
            .success(&format!("{} deleted successfully", capitalized(R::LABEL)));
        let _ = self.fetch_all(scope_id, None).await;
        Ok(())
    }

    /// Change only the status of a record
    ///
    /// # Errors
    ///
    /// Returns an error (after notifying) if the request fails.
    pub async fn set_status(
        &self,
        scope_id: &str,
        id: &str,
        status: R::Status,
    ) -> Result<Option<R>, ResourceError> {
        self.begin();
        let response = self
            .api
            .put(&R::status_path(scope_id, id), json!({ "status": status }))
            .await
            .map_err(|e| {
                self.fail(ResourceError::from_api(Operation::ChangeStatus, R::LABEL, e))
            })?;

        let updated = Self::decode_item(response).ok();
        self.replace_selected(id, updated.as_ref());
        self.notifier.success(&format!(
            "{} status changed to {status}",
            capitalized(R::LABEL)
        ));
        let _ = self.fetch_all(scope_id, None).await;
        Ok(updated)
    }
}

// =============================================================================
// Internals
// =============================================================================

impl<R: Resource> ResourceController<R> {
    /// Apply a state change unless detached; `f` reports whether it changed anything
    fn commit(&self, f: impl FnOnce(&mut ResourceState<R>) -> bool) -> bool {
        if !self.is_attached() {
            return false;
        }
        self.state.send_if_modified(f)
    }

    fn begin(&self) {
        self.commit(|s| {
            s.status = LoadStatus::Loading;
            s.last_error = None;
            true
        });
    }

    /// Record and announce a failed load or mutation
    fn fail(&self, error: ResourceError) -> ResourceError {
        self.failed_at
            .store(self.issued.load(Ordering::SeqCst), Ordering::SeqCst);
        let message = error.message.clone();
        self.commit(|s| {
            s.status = LoadStatus::Failed;
            s.last_error = Some(message);
            true
        });
        self.notifier.error(&error.message);
        error
    }

    fn encode_draft(&self, operation: Operation, draft: &R::Draft) -> Result<Value, ResourceError> {
        serde_json::to_value(draft).map_err(|e| {
            self.fail(ResourceError::from_api(
                operation,
                R::LABEL,
                ApiError::InvalidRequest(e.to_string()),
            ))
        })
    }

    fn replace_selected(&self, id: &str, updated: Option<&R>) {
        let Some(updated) = updated else { return };
        self.commit(|s| {
            if s.selected.as_ref().is_some_and(|sel| sel.id() == id) {
                s.selected = Some(updated.clone());
                return true;
            }
            false
        });
    }

    fn decode_item(body: Value) -> Result<R, serde_json::Error> {
        serde_json::from_value(unwrap_envelope(body))
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
