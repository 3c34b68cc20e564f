//! Advanced search.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::{Column, DataPath, DateRange, Field, FilterValue, Predicate};
use super::sort::SortOrder;
use crate::error::{FilterError, FilterResult};

/// Advanced search request.
///
/// In exact mode every criterion must hold: each data field equals its
/// value and the payload contains every search term. Otherwise search terms
/// are alternatives and data fields match as substrings. Types and the date
/// range narrow the result in both modes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedFilter {
    /// Payload search terms.
    #[serde(default)]
    pub search_terms: Vec<String>,

    /// Payload path/value criteria.
    #[serde(default)]
    pub data_fields: BTreeMap<String, Value>,

    /// Inclusive creation-time range.
    #[serde(default)]
    pub date_range: Option<DateRange>,

    /// Accepted types; empty accepts every type.
    #[serde(default)]
    pub types: Vec<String>,

    /// Exact or fuzzy matching.
    #[serde(default)]
    pub exact_match: bool,

    /// 1-based page number.
    #[serde(default)]
    pub page: Option<u32>,

    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Sort field; column name or payload path.
    #[serde(default)]
    pub sort_by: Option<String>,

    /// Sort direction.
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

impl AdvancedFilter {
    /// Builds the predicate, soft-delete guard included.
    pub fn to_predicate(&self) -> FilterResult<Predicate> {
        let mut clauses = vec![Predicate::not_deleted()];

        for (key, value) in &self.data_fields {
            let field = Field::Data(DataPath::parse(key)?);
            let scalar = FilterValue::from_json(value).ok_or_else(|| FilterError::InvalidValue {
                field: key.clone(),
                operator: if self.exact_match { "eq" } else { "contains" }.to_string(),
                message: "data field values must be scalars".to_string(),
            })?;

            if self.exact_match {
                clauses.push(Predicate::eq(field, scalar));
            } else if let Some(text) = scalar.as_text() {
                clauses.push(Predicate::contains(field, text));
            } else {
                clauses.push(Predicate::IsNull(field));
            }
        }

        if !self.types.is_empty() {
            clauses.push(Predicate::In {
                field: Field::Column(Column::Type),
                values: self.types.iter().map(|t| FilterValue::from(t.as_str())).collect(),
            });
        }

        if let Some(range) = &self.date_range {
            clauses.extend(range.predicates());
        }

        let terms: Vec<Predicate> = self
            .search_terms
            .iter()
            .filter(|term| !term.is_empty())
            .map(|term| Predicate::PayloadContains(term.clone()))
            .collect();
        if !terms.is_empty() {
            if self.exact_match {
                clauses.extend(terms);
            } else {
                clauses.push(Predicate::or(terms));
            }
        }

        Ok(Predicate::and(clauses))
    }
}
