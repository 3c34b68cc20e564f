//! Single-field sorting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::predicate::{Column, Field};
use crate::error::{FilterError, FilterResult};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(FilterError::InvalidValue {
                field: "sortOrder".to_string(),
                operator: "sort".to_string(),
                message: format!("expected 'asc' or 'desc', got '{}'", s),
            }),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// Sort directive. Ties are always broken by record id, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    /// Field to sort by.
    pub field: Field,
    /// Direction.
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: Field::Column(Column::CreatedAt),
            order: SortOrder::Desc,
        }
    }
}

impl Sort {
    /// Creates a sort directive.
    pub fn new(field: impl Into<Field>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Resolves an optional field name and order, falling back to
    /// `createdAt desc`.
    pub fn resolve(field: Option<&str>, order: Option<SortOrder>) -> FilterResult<Self> {
        let field = match field {
            Some(name) if !name.is_empty() => Field::parse(name)?,
            _ => Field::Column(Column::CreatedAt),
        };
        Ok(Self {
            field,
            order: order.unwrap_or_default(),
        })
    }
}
