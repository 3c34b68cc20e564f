//! Backend-neutral predicate trees.
//!
//! Filters never carry query text. Every surface (basic, advanced, dynamic)
//! is translated into a [`Predicate`] built from validated [`Field`]s and
//! typed [`FilterValue`]s; backends render the tree with bound parameters.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FilterError, FilterResult};

/// Dotted payload path: identifier segments, optionally followed by numeric
/// array indices (`lines.0.amount`).
static DATA_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.([A-Za-z_][A-Za-z0-9_]*|[0-9]+))*$")
        .expect("data path pattern is a valid regex")
});

/// A flat record column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    /// `id`
    Id,
    /// `type`
    Type,
    /// `createdBy`
    CreatedBy,
    /// `updatedBy`
    UpdatedBy,
    /// `createdAt`
    CreatedAt,
    /// `updatedAt`
    UpdatedAt,
    /// `version`
    Version,
    /// `deletedAt`; only reachable through the soft-delete predicate.
    DeletedAt,
}

impl Column {
    /// Resolves a caller-facing column name.
    ///
    /// `deletedAt` is deliberately not addressable: soft-deleted records are
    /// never visible to filters.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Column::Id),
            "type" => Some(Column::Type),
            "createdBy" => Some(Column::CreatedBy),
            "updatedBy" => Some(Column::UpdatedBy),
            "createdAt" => Some(Column::CreatedAt),
            "updatedAt" => Some(Column::UpdatedAt),
            "version" => Some(Column::Version),
            _ => None,
        }
    }

    /// The caller-facing name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Type => "type",
            Column::CreatedBy => "createdBy",
            Column::UpdatedBy => "updatedBy",
            Column::CreatedAt => "createdAt",
            Column::UpdatedAt => "updatedAt",
            Column::Version => "version",
            Column::DeletedAt => "deletedAt",
        }
    }

    /// Whether the column holds a timestamp.
    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            Column::CreatedAt | Column::UpdatedAt | Column::DeletedAt
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// A validated path into the record payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataPath {
    segments: Vec<PathSegment>,
}

impl DataPath {
    /// Parses a dotted payload path such as `customer.address.city`.
    pub fn parse(path: &str) -> FilterResult<Self> {
        if !DATA_PATH.is_match(path) {
            return Err(FilterError::InvalidField {
                field: path.to_string(),
                message: "expected dot-separated identifiers or array indices".to_string(),
            });
        }

        let segments = path
            .split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(segment.to_string()),
            })
            .collect();

        Ok(Self { segments })
    }

    /// Renders the path as a JSON path expression (`$.lines[0].amount`).
    pub fn json_path(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => {
                    out.push('.');
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    out.push_str(&format!("[{}]", index));
                }
            }
        }
        out
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            match segment {
                PathSegment::Key(key) => write!(f, "{}", key)?,
                PathSegment::Index(index) => write!(f, "{}", index)?,
            }
        }
        Ok(())
    }
}

/// A filterable field: a flat column or a payload path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// A record column.
    Column(Column),
    /// A path into the payload.
    Data(DataPath),
}

impl Field {
    /// Resolves a caller-supplied field name.
    ///
    /// Known column names address columns. Anything else addresses the
    /// payload: a dotted name is a nested path, a single segment a top-level
    /// key.
    pub fn parse(name: &str) -> FilterResult<Self> {
        match Column::from_name(name) {
            Some(column) => Ok(Field::Column(column)),
            None => DataPath::parse(name).map(Field::Data),
        }
    }

    /// Addresses a payload path, even if its name collides with a column.
    pub fn data(path: &str) -> FilterResult<Self> {
        DataPath::parse(path).map(Field::Data)
    }

    /// Whether the field holds a timestamp.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, Field::Column(column) if column.is_timestamp())
    }
}

impl From<Column> for Field {
    fn from(column: Column) -> Self {
        Field::Column(column)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Column(column) => write!(f, "{}", column.name()),
            Field::Data(path) => write!(f, "{}", path),
        }
    }
}

/// A typed scalar operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Converts a JSON scalar. Arrays and objects are not scalars.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FilterValue::Null),
            Value::Bool(b) => Some(FilterValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FilterValue::Integer(i)),
                None => n.as_f64().map(FilterValue::Float),
            },
            Value::String(s) => Some(FilterValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Converts a JSON scalar for comparison against `field`.
    ///
    /// Strings compared against timestamp columns are read as RFC 3339 when
    /// they parse as such.
    pub fn for_field(field: &Field, value: &Value) -> Option<Self> {
        let converted = Self::from_json(value)?;
        match converted {
            FilterValue::Text(text) if field.is_timestamp() => {
                Some(match DateTime::parse_from_rfc3339(&text) {
                    Ok(parsed) => FilterValue::Timestamp(parsed.with_timezone(&Utc)),
                    Err(_) => FilterValue::Text(text),
                })
            }
            other => Some(other),
        }
    }

    /// Renders the value as plain text for substring matching.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FilterValue::Null => None,
            FilterValue::Bool(b) => Some(b.to_string()),
            FilterValue::Integer(i) => Some(i.to_string()),
            FilterValue::Float(f) => Some(f.to_string()),
            FilterValue::Text(s) => Some(s.clone()),
            FilterValue::Timestamp(ts) => Some(ts.to_rfc3339()),
        }
    }

    /// Returns true for [`FilterValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Integer(n)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(ts)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

/// Case-insensitive substring match modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMatch {
    /// Value occurs anywhere.
    Contains,
    /// Value is a prefix.
    StartsWith,
    /// Value is a suffix.
    EndsWith,
}

/// A predicate tree over records.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// All children hold. An empty conjunction is true.
    And(Vec<Predicate>),
    /// Any child holds. An empty disjunction is false.
    Or(Vec<Predicate>),
    /// Scalar comparison.
    Compare {
        /// Left-hand side.
        field: Field,
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        value: FilterValue,
    },
    /// Case-insensitive substring match.
    Text {
        /// Field to match.
        field: Field,
        /// Match mode.
        mode: TextMatch,
        /// Needle.
        value: String,
    },
    /// Membership in a list of values. An empty list matches nothing.
    In {
        /// Field to test.
        field: Field,
        /// Candidate values.
        values: Vec<FilterValue>,
    },
    /// Case-insensitive substring match against the whole serialized payload.
    PayloadContains(String),
    /// The field is null or absent.
    IsNull(Field),
}

impl Predicate {
    /// The soft-delete guard every query carries.
    pub fn not_deleted() -> Self {
        Predicate::IsNull(Field::Column(Column::DeletedAt))
    }

    /// `field = value`
    pub fn eq(field: impl Into<Field>, value: impl Into<FilterValue>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// `field <op> value`
    pub fn compare(field: impl Into<Field>, op: CompareOp, value: impl Into<FilterValue>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Case-insensitive substring match.
    pub fn contains(field: impl Into<Field>, value: impl Into<String>) -> Self {
        Predicate::Text {
            field: field.into(),
            mode: TextMatch::Contains,
            value: value.into(),
        }
    }

    /// Conjunction, flattening nested conjunctions.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            match predicate {
                Predicate::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Predicate::And(flat)
        }
    }

    /// Disjunction, flattening nested disjunctions.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            match predicate {
                Predicate::Or(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Predicate::Or(flat)
        }
    }

    /// ANDs the soft-delete guard into this predicate unless already present.
    pub fn active_only(self) -> Self {
        if self.requires_active() {
            self
        } else {
            Predicate::and(vec![Predicate::not_deleted(), self])
        }
    }

    /// Whether the soft-delete guard is a top-level conjunct.
    pub fn requires_active(&self) -> bool {
        let guard = Predicate::not_deleted();
        match self {
            Predicate::And(children) => children.contains(&guard),
            other => *other == guard,
        }
    }
}

/// An inclusive range on `createdAt`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Lower bound, inclusive.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,

    /// Upper bound, inclusive.
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Creates a range from optional bounds.
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Bound predicates on `createdAt`; empty when the range is open.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some(from) = self.from {
            out.push(Predicate::compare(Column::CreatedAt, CompareOp::Gte, from));
        }
        if let Some(to) = self.to {
            out.push(Predicate::compare(Column::CreatedAt, CompareOp::Lte, to));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_resolution() {
        assert_eq!(Field::parse("type").unwrap(), Field::Column(Column::Type));
        assert_eq!(
            Field::parse("createdAt").unwrap(),
            Field::Column(Column::CreatedAt)
        );

        let Field::Data(path) = Field::parse("amount").unwrap() else {
            panic!("expected payload field");
        };
        assert_eq!(path.json_path(), "$.amount");

        let Field::Data(path) = Field::parse("lines.0.amount").unwrap() else {
            panic!("expected payload field");
        };
        assert_eq!(path.json_path(), "$.lines[0].amount");
        assert_eq!(path.to_string(), "lines.0.amount");
    }

    #[test]
    fn test_deleted_at_not_addressable() {
        assert!(matches!(Field::parse("deletedAt").unwrap(), Field::Data(_)));
    }

    #[test]
    fn test_rejects_injection_attempts() {
        for bad in [
            "",
            "amount; DROP TABLE records",
            "a..b",
            "a.",
            "0abc",
            "$.amount",
            "a'b",
            "a b",
        ] {
            let err = Field::parse(bad).unwrap_err();
            assert!(matches!(err, FilterError::InvalidField { .. }), "{bad}");
        }
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(
            FilterValue::from_json(&json!(5)),
            Some(FilterValue::Integer(5))
        );
        assert_eq!(
            FilterValue::from_json(&json!(2.5)),
            Some(FilterValue::Float(2.5))
        );
        assert_eq!(FilterValue::from_json(&json!([1])), None);
        assert_eq!(FilterValue::from_json(&json!({"a": 1})), None);

        let created = Field::Column(Column::CreatedAt);
        assert!(matches!(
            FilterValue::for_field(&created, &json!("2024-01-01T00:00:00Z")),
            Some(FilterValue::Timestamp(_))
        ));
        assert!(matches!(
            FilterValue::for_field(&created, &json!("2024-01-01")),
            Some(FilterValue::Text(_))
        ));
    }

    #[test]
    fn test_and_flattens() {
        let p = Predicate::and(vec![
            Predicate::and(vec![Predicate::eq(Column::Type, "a"), Predicate::not_deleted()]),
            Predicate::eq(Column::CreatedBy, "u1"),
        ]);
        let Predicate::And(children) = &p else {
            panic!("expected conjunction");
        };
        assert_eq!(children.len(), 3);
        assert!(p.requires_active());
    }

    #[test]
    fn test_active_only_is_idempotent() {
        let p = Predicate::eq(Column::Type, "invoice").active_only();
        let again = p.clone().active_only();
        assert_eq!(p, again);
        assert!(Predicate::And(vec![]).active_only().requires_active());
    }

    #[test]
    fn test_date_range_predicates() {
        assert!(DateRange::default().predicates().is_empty());
        let range = DateRange::new(Some(Utc::now()), Some(Utc::now()));
        assert_eq!(range.predicates().len(), 2);
    }
}
