//! Basic list filters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::{Column, DataPath, DateRange, Field, FilterValue, Predicate};
use crate::error::{FilterError, FilterResult};

/// The basic list filter.
///
/// Type, creator and date range narrow the result. Free-text `search` and
/// `data_filters` form a single OR group: a record matches if its type or
/// payload contains the search text, or if any data filter matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicFilter {
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<u32>,

    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Exact type.
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,

    /// Exact creator.
    #[serde(default)]
    pub created_by: Option<String>,

    /// Earliest creation time, inclusive.
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,

    /// Latest creation time, inclusive.
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,

    /// Free-text search over type and payload.
    #[serde(default)]
    pub search: Option<String>,

    /// Payload key/value equalities, ORed with the search.
    #[serde(default)]
    pub data_filters: BTreeMap<String, Value>,
}

impl BasicFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page and limit.
    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Restricts to one type.
    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Restricts to one creator.
    pub fn created_by(mut self, actor: impl Into<String>) -> Self {
        self.created_by = Some(actor.into());
        self
    }

    /// Sets the free-text search.
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Adds a payload equality to the OR group.
    pub fn data_filter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data_filters.insert(key.into(), value);
        self
    }

    /// Builds the predicate, soft-delete guard included.
    pub fn to_predicate(&self) -> FilterResult<Predicate> {
        let mut clauses = vec![Predicate::not_deleted()];

        if let Some(record_type) = non_empty(&self.record_type) {
            clauses.push(Predicate::eq(Column::Type, record_type));
        }

        if let Some(actor) = non_empty(&self.created_by) {
            clauses.push(Predicate::eq(Column::CreatedBy, actor));
        }

        clauses.extend(DateRange::new(self.date_from, self.date_to).predicates());

        let mut any = Vec::new();
        if let Some(text) = non_empty(&self.search) {
            any.push(Predicate::contains(Column::Type, text));
            any.push(Predicate::PayloadContains(text.to_string()));
        }
        for (key, value) in &self.data_filters {
            let path = DataPath::parse(key)?;
            let value = FilterValue::from_json(value).ok_or_else(|| FilterError::InvalidValue {
                field: key.clone(),
                operator: "eq".to_string(),
                message: "data filter values must be scalars".to_string(),
            })?;
            any.push(Predicate::eq(Field::Data(path), value));
        }
        if !any.is_empty() {
            clauses.push(Predicate::or(any));
        }

        Ok(Predicate::and(clauses))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter_is_guard_only() {
        let predicate = BasicFilter::new().to_predicate().unwrap();
        assert_eq!(predicate, Predicate::not_deleted());
    }

    #[test]
    fn test_search_and_data_filters_share_or_group() {
        let predicate = BasicFilter::new()
            .record_type("invoice")
            .search("acme")
            .data_filter("status", json!("paid"))
            .to_predicate()
            .unwrap();

        let Predicate::And(clauses) = predicate else {
            panic!("expected conjunction");
        };
        assert_eq!(clauses.len(), 3);
        let Predicate::Or(group) = &clauses[2] else {
            panic!("expected OR group");
        };
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_rejects_non_scalar_data_filter() {
        let err = BasicFilter::new()
            .data_filter("tags", json!(["a"]))
            .to_predicate()
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));
    }

    #[test]
    fn test_deserialize() {
        let filter: BasicFilter = serde_json::from_value(json!({
            "page": 2,
            "limit": 5,
            "type": "invoice",
            "dateFrom": "2024-01-01T00:00:00Z",
            "dataFilters": {"status": "open"}
        }))
        .unwrap();
        assert_eq!(filter.page, Some(2));
        assert_eq!(filter.record_type.as_deref(), Some("invoice"));
        assert!(filter.date_from.is_some());
        assert_eq!(filter.data_filters.len(), 1);
    }
}
