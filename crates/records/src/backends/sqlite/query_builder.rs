//! Renders predicate trees as parameterized SQLite SQL.
//!
//! Field names are validated before they reach this module; payload paths
//! and all operand values are bound as parameters, never spliced into SQL.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::ToSql;
use rusqlite::types::{Null, ToSqlOutput};

use crate::filter::{
    Column, CompareOp, Field, FilterValue, Predicate, RecordQuery, Sort, SortOrder, TextMatch,
};

/// Columns selected for a record row, in the order `storage::map_record_row`
/// reads them.
pub(crate) const RECORD_COLUMNS: &str = "id, record_type, data, metadata, created_by, \
    updated_by, created_at, updated_at, version, deleted_at, deleted_by";

/// Formats a timestamp the way it is stored.
///
/// Fixed microsecond precision keeps stored timestamps ordered as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A SQL clause with its bound parameters.
#[derive(Debug, Clone)]
pub(crate) struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    fn from_value(value: &FilterValue) -> Self {
        match value {
            FilterValue::Null => SqlParam::Null,
            FilterValue::Bool(b) => SqlParam::Integer(i64::from(*b)),
            FilterValue::Integer(i) => SqlParam::Integer(*i),
            FilterValue::Float(f) => SqlParam::Float(*f),
            FilterValue::Text(s) => SqlParam::String(s.clone()),
            FilterValue::Timestamp(ts) => SqlParam::String(format_timestamp(ts)),
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::from(s.as_str()),
            SqlParam::Integer(i) => ToSqlOutput::from(*i),
            SqlParam::Float(f) => ToSqlOutput::from(*f),
            SqlParam::Null => ToSqlOutput::from(Null),
        })
    }
}

/// Escapes `LIKE` wildcards so the needle matches literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn column_name(column: Column) -> &'static str {
    match column {
        Column::Id => "id",
        Column::Type => "record_type",
        Column::CreatedBy => "created_by",
        Column::UpdatedBy => "updated_by",
        Column::CreatedAt => "created_at",
        Column::UpdatedAt => "updated_at",
        Column::Version => "version",
        Column::DeletedAt => "deleted_at",
    }
}

/// Accumulates parameters while rendering clauses.
#[derive(Debug, Default)]
pub(crate) struct QueryBuilder {
    params: Vec<SqlParam>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter and returns its placeholder.
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    fn field(&mut self, field: &Field) -> String {
        match field {
            Field::Column(column) => column_name(*column).to_string(),
            Field::Data(path) => {
                let placeholder = self.bind(SqlParam::String(path.json_path()));
                format!("json_extract(data, {})", placeholder)
            }
        }
    }

    /// Target for substring matching. JSON booleans read back as the
    /// literals `true` and `false` rather than `1` and `0`.
    fn text_field(&mut self, field: &Field) -> String {
        match field {
            Field::Column(column) => column_name(*column).to_string(),
            Field::Data(path) => {
                let placeholder = self.bind(SqlParam::String(path.json_path()));
                format!(
                    "CASE json_type(data, {p}) WHEN 'true' THEN 'true' \
                     WHEN 'false' THEN 'false' ELSE json_extract(data, {p}) END",
                    p = placeholder
                )
            }
        }
    }

    fn like(&mut self, target: &str, mode: TextMatch, needle: &str) -> String {
        let escaped = escape_like(needle);
        let pattern = match mode {
            TextMatch::Contains => format!("%{}%", escaped),
            TextMatch::StartsWith => format!("{}%", escaped),
            TextMatch::EndsWith => format!("%{}", escaped),
        };
        let placeholder = self.bind(SqlParam::String(pattern));
        format!("{} LIKE {} ESCAPE '\\'", target, placeholder)
    }

    /// Renders a predicate as a WHERE clause body.
    pub fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::And(children) if children.is_empty() => "1 = 1".to_string(),
            Predicate::And(children) => self.join(children, " AND "),
            Predicate::Or(children) if children.is_empty() => "1 = 0".to_string(),
            Predicate::Or(children) => self.join(children, " OR "),
            Predicate::Compare { field, op, value } => {
                let target = self.field(field);
                match (op, value) {
                    (CompareOp::Eq, FilterValue::Null) => format!("{} IS NULL", target),
                    (CompareOp::Neq, FilterValue::Null) => format!("{} IS NOT NULL", target),
                    _ => {
                        let operator = match op {
                            CompareOp::Eq => "=",
                            CompareOp::Neq => "IS NOT",
                            CompareOp::Gt => ">",
                            CompareOp::Gte => ">=",
                            CompareOp::Lt => "<",
                            CompareOp::Lte => "<=",
                        };
                        let placeholder = self.bind(SqlParam::from_value(value));
                        format!("{} {} {}", target, operator, placeholder)
                    }
                }
            }
            Predicate::Text { field, mode, value } => {
                let target = self.text_field(field);
                self.like(&target, *mode, value)
            }
            Predicate::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Predicate::In { field, values } => {
                let target = self.field(field);
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|value| self.bind(SqlParam::from_value(value)))
                    .collect();
                format!("{} IN ({})", target, placeholders.join(", "))
            }
            Predicate::PayloadContains(text) => self.like("data", TextMatch::Contains, text),
            Predicate::IsNull(field) => {
                let target = self.field(field);
                format!("{} IS NULL", target)
            }
        }
    }

    fn join(&mut self, children: &[Predicate], separator: &str) -> String {
        children
            .iter()
            .map(|child| format!("({})", self.predicate(child)))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Renders an ORDER BY clause body; ties are broken by id.
    pub fn order_by(&mut self, sort: &Sort) -> String {
        let direction = match sort.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        match &sort.field {
            Field::Column(Column::Id) => format!("id {}", direction),
            field => {
                let target = self.field(field);
                format!("{} {}, id ASC", target, direction)
            }
        }
    }

    /// Consumes the builder, returning the SQL with its parameters.
    pub fn finish(self, sql: String) -> SqlFragment {
        SqlFragment {
            sql,
            params: self.params,
        }
    }
}

/// Builds the page query for a [`RecordQuery`].
pub(crate) fn build_select(query: &RecordQuery) -> SqlFragment {
    let mut builder = QueryBuilder::new();
    let where_clause = builder.predicate(&query.predicate);
    let order_by = builder.order_by(&query.sort);
    let limit = builder.bind(SqlParam::Integer(i64::from(query.pagination.limit)));
    let offset = builder.bind(SqlParam::Integer(
        i64::try_from(query.pagination.offset()).unwrap_or(i64::MAX),
    ));

    let sql = format!(
        "SELECT {} FROM records WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
        RECORD_COLUMNS, where_clause, order_by, limit, offset
    );
    builder.finish(sql)
}

/// Builds the count query for a predicate.
pub(crate) fn build_count(predicate: &Predicate) -> SqlFragment {
    let mut builder = QueryBuilder::new();
    let where_clause = builder.predicate(predicate);
    let sql = format!("SELECT COUNT(*) FROM records WHERE {}", where_clause);
    builder.finish(sql)
}
