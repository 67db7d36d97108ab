use std::fmt;

/// Filters applied to the next list request
///
/// Each field maps to one query parameter:
/// - `status` → `status`: only records in this lifecycle state
/// - `page` → `page`: 1-based page index
/// - `page_size` → `pageSize`: records per page
/// - `search` → `search`: free-text match evaluated by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilters<S> {
    pub status: Option<S>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

impl<S> Default for ListFilters<S> {
    fn default() -> Self {
        Self {
            status: None,
            page: None,
            page_size: None,
            search: None,
        }
    }
}

impl<S: fmt::Display> ListFilters<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(mut self, status: S) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Shallow merge: fields set in `update` overwrite, the rest persist
    pub fn merge(&mut self, update: Self) {
        if update.status.is_some() {
            self.status = update.status;
        }
        if update.page.is_some() {
            self.page = update.page;
        }
        if update.page_size.is_some() {
            self.page_size = update.page_size;
        }
        if update.search.is_some() {
            self.search = update.search;
        }
    }

    /// Query parameters for the list request; blank searches are dropped
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(status) = &self.status {
            query.push(("status".to_string(), status.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("pageSize".to_string(), page_size.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search".to_string(), search.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TourStatus;

    #[test]
    fn test_merge_preserves_prior_keys() {
        let mut filters = ListFilters::new();
        filters.merge(ListFilters::new().with_status(TourStatus::Active));
        filters.merge(ListFilters::new().with_page(2));

        assert_eq!(
            filters,
            ListFilters::new().with_status(TourStatus::Active).with_page(2)
        );
    }

    #[test]
    fn test_merge_overwrites_set_keys() {
        let mut filters = ListFilters::new().with_status(TourStatus::Draft).with_page(4);
        filters.merge(ListFilters::new().with_status(TourStatus::Active));

        assert_eq!(filters.status, Some(TourStatus::Active));
        assert_eq!(filters.page, Some(4));
    }

    #[test]
    fn test_to_query() {
        let filters = ListFilters::new()
            .with_status(TourStatus::Active)
            .with_page_size(20)
            .with_search("  ");
        assert_eq!(
            filters.to_query(),
            vec![
                ("status".to_string(), "active".to_string()),
                ("pageSize".to_string(), "20".to_string()),
            ]
        );
        assert!(ListFilters::<TourStatus>::new().to_query().is_empty());
    }
}
