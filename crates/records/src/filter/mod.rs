//! Filter engine.
//!
//! Translates the three declarative filter surfaces into [`RecordQuery`]s:
//!
//! - [`BasicFilter`] - type, creator, date range, free-text search
//! - [`AdvancedFilter`] - search terms, payload fields, types, exact/fuzzy
//! - [`DynamicFilter`] - `{field, operator, value}` triples combined by AND
//!
//! Every query carries the soft-delete guard, so deleted records are never
//! returned by a filter.

mod advanced;
mod basic;
mod dynamic;
mod predicate;
mod sort;

pub use advanced::AdvancedFilter;
pub use basic::BasicFilter;
pub use dynamic::{DynamicFilter, FilterOperator, dynamic_predicate};
pub use predicate::{
    Column, CompareOp, DataPath, DateRange, Field, FilterValue, Predicate, TextMatch,
};
pub use sort::{Sort, SortOrder};

use crate::config::RecordServiceConfig;
use crate::error::FilterResult;
use crate::types::Pagination;

/// A fully resolved query: predicate, sort and page window.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    /// The filter predicate.
    pub predicate: Predicate,
    /// Sort order; ties are broken by id.
    pub sort: Sort,
    /// Page window.
    pub pagination: Pagination,
}

impl RecordQuery {
    /// Creates a query over active records.
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate: predicate.active_only(),
            sort: Sort::default(),
            pagination: Pagination::default(),
        }
    }

    /// Sets the sort order.
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the page window.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

/// Builds [`RecordQuery`]s from filter requests, applying page-size limits.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    config: RecordServiceConfig,
}

impl FilterEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: RecordServiceConfig) -> Self {
        Self { config }
    }

    /// Translates a basic filter. Results are sorted by `createdAt desc`.
    pub fn basic(&self, filter: &BasicFilter) -> FilterResult<RecordQuery> {
        Ok(RecordQuery::new(filter.to_predicate()?)
            .with_pagination(self.config.pagination(filter.page, filter.limit)))
    }

    /// Translates an advanced search.
    pub fn advanced(&self, filter: &AdvancedFilter) -> FilterResult<RecordQuery> {
        let sort = Sort::resolve(filter.sort_by.as_deref(), filter.sort_order)?;
        Ok(RecordQuery::new(filter.to_predicate()?)
            .with_sort(sort)
            .with_pagination(self.config.pagination(filter.page, filter.limit)))
    }

    /// Translates a list of dynamic filters.
    pub fn dynamic(
        &self,
        filters: &[DynamicFilter],
        page: Option<u32>,
        limit: Option<u32>,
        sort: Option<Sort>,
    ) -> FilterResult<RecordQuery> {
        Ok(RecordQuery::new(dynamic_predicate(filters)?)
            .with_sort(sort.unwrap_or_default())
            .with_pagination(self.config.pagination(page, limit)))
    }
}
