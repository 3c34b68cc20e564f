//! Operator-based dynamic filters.
//!
//! A dynamic filter is a `{field, operator, value}` triple. A list of them is
//! combined with AND:
//!
//! ```
//! use helios_records::filter::{DynamicFilter, dynamic_predicate};
//! use serde_json::json;
//!
//! let filters: Vec<DynamicFilter> = serde_json::from_value(json!([
//!     {"field": "amount", "operator": "gte", "value": 100},
//!     {"field": "type", "operator": "eq", "value": "invoice"}
//! ]))
//! .unwrap();
//!
//! let predicate = dynamic_predicate(&filters).unwrap();
//! assert!(predicate.requires_active());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::predicate::{CompareOp, Field, FilterValue, Predicate, TextMatch};
use crate::error::{FilterError, FilterResult};

/// Supported dynamic-filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `eq`
    Eq,
    /// `neq`
    Neq,
    /// `gt`
    Gt,
    /// `gte`
    Gte,
    /// `lt`
    Lt,
    /// `lte`
    Lte,
    /// `contains`
    Contains,
    /// `startsWith`
    StartsWith,
    /// `endsWith`
    EndsWith,
    /// `in`
    In,
}

impl FilterOperator {
    /// The wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::In => "in",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOperator::Eq),
            "neq" => Ok(FilterOperator::Neq),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "contains" => Ok(FilterOperator::Contains),
            "startsWith" => Ok(FilterOperator::StartsWith),
            "endsWith" => Ok(FilterOperator::EndsWith),
            "in" => Ok(FilterOperator::In),
            _ => Err(FilterError::UnsupportedOperator {
                operator: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{field, operator, value}` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicFilter {
    /// Column name or payload path.
    pub field: String,
    /// Operator name.
    pub operator: String,
    /// Operand; an array for `in`, a scalar otherwise.
    pub value: Value,
}

impl DynamicFilter {
    /// Creates a filter.
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }

    /// Translates this filter into a predicate.
    pub fn to_predicate(&self) -> FilterResult<Predicate> {
        let operator: FilterOperator = self.operator.parse()?;
        let field = Field::parse(&self.field)?;

        let predicate = match operator {
            FilterOperator::In => {
                let Value::Array(items) = &self.value else {
                    return Err(self.invalid(operator, "expected an array"));
                };
                let values = items
                    .iter()
                    .map(|item| {
                        FilterValue::for_field(&field, item)
                            .ok_or_else(|| self.invalid(operator, "array items must be scalars"))
                    })
                    .collect::<FilterResult<Vec<_>>>()?;
                Predicate::In { field, values }
            }
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
                let text = self
                    .scalar(&field, operator)?
                    .as_text()
                    .ok_or_else(|| self.invalid(operator, "expected a non-null scalar"))?;
                let mode = match operator {
                    FilterOperator::StartsWith => TextMatch::StartsWith,
                    FilterOperator::EndsWith => TextMatch::EndsWith,
                    _ => TextMatch::Contains,
                };
                Predicate::Text {
                    field,
                    mode,
                    value: text,
                }
            }
            FilterOperator::Eq | FilterOperator::Neq => {
                let value = self.scalar(&field, operator)?;
                let op = if operator == FilterOperator::Eq {
                    CompareOp::Eq
                } else {
                    CompareOp::Neq
                };
                Predicate::Compare { field, op, value }
            }
            FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
                let value = self.scalar(&field, operator)?;
                if value.is_null() {
                    return Err(self.invalid(operator, "range bounds cannot be null"));
                }
                let op = match operator {
                    FilterOperator::Gt => CompareOp::Gt,
                    FilterOperator::Gte => CompareOp::Gte,
                    FilterOperator::Lt => CompareOp::Lt,
                    _ => CompareOp::Lte,
                };
                Predicate::Compare { field, op, value }
            }
        };

        Ok(predicate)
    }

    fn scalar(&self, field: &Field, operator: FilterOperator) -> FilterResult<FilterValue> {
        FilterValue::for_field(field, &self.value)
            .ok_or_else(|| self.invalid(operator, "expected a scalar"))
    }

    fn invalid(&self, operator: FilterOperator, message: &str) -> FilterError {
        FilterError::InvalidValue {
            field: self.field.clone(),
            operator: operator.to_string(),
            message: message.to_string(),
        }
    }
}

/// ANDs a list of dynamic filters together with the soft-delete guard.
pub fn dynamic_predicate(filters: &[DynamicFilter]) -> FilterResult<Predicate> {
    let mut clauses = vec![Predicate::not_deleted()];
    for filter in filters {
        clauses.push(filter.to_predicate()?);
    }
    Ok(Predicate::and(clauses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::predicate::Column;
    use serde_json::json;

    #[test]
    fn test_operator_names_round_trip() {
        for name in [
            "eq", "neq", "gt", "gte", "lt", "lte", "contains", "startsWith", "endsWith", "in",
        ] {
            let op: FilterOperator = name.parse().unwrap();
            assert_eq!(op.as_str(), name);
        }
    }

    #[test]
    fn test_unsupported_operator() {
        let err = DynamicFilter::new("amount", "like", json!("x"))
            .to_predicate()
            .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_in_requires_array() {
        let err = DynamicFilter::new("status", "in", json!("open"))
            .to_predicate()
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));

        let predicate = DynamicFilter::new("status", "in", json!(["open", "paid"]))
            .to_predicate()
            .unwrap();
        assert!(matches!(predicate, Predicate::In { ref values, .. } if values.len() == 2));
    }

    #[test]
    fn test_scalar_operators_reject_arrays() {
        let err = DynamicFilter::new("amount", "gte", json!([1, 2]))
            .to_predicate()
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));

        let err = DynamicFilter::new("amount", "lt", Value::Null)
            .to_predicate()
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));
    }

    #[test]
    fn test_column_and_payload_fields() {
        let predicate = DynamicFilter::new("type", "eq", json!("invoice"))
            .to_predicate()
            .unwrap();
        assert_eq!(predicate, Predicate::eq(Column::Type, "invoice"));

        let predicate = DynamicFilter::new("customer.name", "startsWith", json!("Ac"))
            .to_predicate()
            .unwrap();
        assert!(matches!(
            predicate,
            Predicate::Text {
                field: Field::Data(_),
                mode: TextMatch::StartsWith,
                ..
            }
        ));
    }

    #[test]
    fn test_filters_are_anded_with_guard() {
        let filters = vec![
            DynamicFilter::new("amount", "gte", json!(100)),
            DynamicFilter::new("type", "eq", json!("invoice")),
        ];
        let Predicate::And(clauses) = dynamic_predicate(&filters).unwrap() else {
            panic!("expected conjunction");
        };
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0], Predicate::not_deleted());
    }
}
