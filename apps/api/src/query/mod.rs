//! Filtered-query construction over `sqlx::QueryBuilder`.
//!
//! Column names are compile-time constants supplied by handlers. Every value
//! that originates from a request is bound as a parameter, never spliced into
//! the SQL text.

pub mod params;

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

pub use params::{parse_i64_param, split_list, Pagination};

/// A bindable request value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Uuid(Uuid),
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Value::Uuid(id)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// A single WHERE-clause predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `col = $n`
    Eq(&'static str, Value),
    /// `$n = ANY(col)`: the value is a member of the stored array.
    Contains(&'static str, Value),
    /// `col && $n`: the stored array shares at least one element with the list.
    Overlaps(&'static str, Vec<String>),
    /// `col >= $n`
    Gte(&'static str, i64),
    /// `col <= $n`
    Lte(&'static str, i64),
    /// `col ILIKE $n`; the pattern is bound as-is.
    ILike(&'static str, String),
    /// Parenthesized OR of nested predicates.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn contains(column: &'static str, value: impl Into<Value>) -> Self {
        Predicate::Contains(column, value.into())
    }

    /// Case-insensitive substring match on `text`.
    pub fn ilike_contains(column: &'static str, text: &str) -> Self {
        Predicate::ILike(column, contains_pattern(text))
    }

    fn push_into(self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Eq(column, value) => {
                qb.push(column).push(" = ");
                push_value(qb, value);
            }
            Predicate::Contains(column, value) => {
                push_value(qb, value);
                qb.push(" = ANY(").push(column).push(")");
            }
            Predicate::Overlaps(column, list) => {
                qb.push(column).push(" && ").push_bind(list);
            }
            Predicate::Gte(column, bound) => {
                qb.push(column).push(" >= ").push_bind(bound);
            }
            Predicate::Lte(column, bound) => {
                qb.push(column).push(" <= ").push_bind(bound);
            }
            Predicate::ILike(column, pattern) => {
                qb.push(column).push(" ILIKE ").push_bind(pattern);
            }
            Predicate::Any(predicates) => {
                if predicates.is_empty() {
                    qb.push("FALSE");
                    return;
                }
                qb.push("(");
                for (i, predicate) in predicates.into_iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    predicate.push_into(qb);
                }
                qb.push(")");
            }
        }
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: Value) {
    match value {
        Value::Text(s) => qb.push_bind(s),
        Value::Int(i) => qb.push_bind(i),
        Value::Uuid(id) => qb.push_bind(id),
    };
}

/// Conjunction of optional predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Appends ` WHERE p1 AND p2 ...`, or nothing for an empty filter.
    pub fn push_where(self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.predicates.is_empty() {
            return;
        }
        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.into_iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            predicate.push_into(qb);
        }
    }
}

/// `{base}{WHERE ...} ORDER BY {order_by} LIMIT $n OFFSET $m`
pub fn select<'a>(
    base: &str,
    filter: Filter,
    order_by: &str,
    page: Pagination,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(base);
    filter.push_where(&mut qb);
    qb.push(" ORDER BY ").push(order_by);
    page.push_into(&mut qb);
    qb
}

/// `SELECT COUNT(*) FROM {from}{WHERE ...}`
pub fn count<'a>(from: &str, filter: Filter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(from);
    filter.push_where(&mut qb);
    qb
}

/// Builds an ILIKE pattern matching `text` anywhere, with LIKE metacharacters
/// in the input escaped (Postgres' default escape character is `\`).
pub fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
