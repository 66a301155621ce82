//! Relational binding of the filter expression.
//!
//! [`render`] turns a [`Query`] into a parameterised `WHERE` predicate over
//! `documents d`. Line filters become `EXISTS` sub-selects joining
//! `pages → lines → coordinates`; combinators become boolean connectives.
//! Column names come from [`Bound::column`](pagegrep_core::filter::Bound::column)
//! and are never caller-supplied; every value is a bind parameter.

use pagegrep_core::filter::{FileFilter, Filter, LineFilter, Query};
use sqlx::query::Query as SqlxQuery;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Real(f64),
}

/// A SQL boolean expression and its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub clause: String,
    pub binds: Vec<SqlValue>,
}

impl SqlPredicate {
    fn constant(value: bool) -> Self {
        Self {
            clause: if value { "1" } else { "0" }.to_string(),
            binds: Vec::new(),
        }
    }
}

/// Render the filter and scope of `query` against the alias `d`.
pub fn render(query: &Query) -> SqlPredicate {
    let filter = render_filter(&query.filter);
    match &query.scope {
        None => filter,
        Some(buckets) => {
            let scope = in_list("d.bucket", buckets);
            let mut binds = filter.binds;
            binds.extend(scope.binds);
            SqlPredicate {
                clause: format!("({}) AND ({})", filter.clause, scope.clause),
                binds,
            }
        }
    }
}

fn render_filter(filter: &Filter) -> SqlPredicate {
    match filter {
        Filter::Line(f) => render_line(f),
        Filter::File(f) => render_file(f),
        Filter::And(children) => join(children, " AND ", true),
        Filter::Or(children) => join(children, " OR ", false),
        Filter::Not(children) => {
            if children.is_empty() {
                return SqlPredicate::constant(true);
            }
            let any = join(children, " OR ", false);
            SqlPredicate {
                clause: format!("NOT {}", any.clause),
                binds: any.binds,
            }
        }
    }
}

fn render_line(f: &LineFilter) -> SqlPredicate {
    let mut clause = String::from(
        "EXISTS (SELECT 1 FROM pages p \
         JOIN lines l ON l.page_id = p.id \
         JOIN coordinates c ON c.line_id = l.id \
         WHERE p.document_id = d.id AND p.page_number = ? AND l.text = ?",
    );
    let mut binds = vec![SqlValue::Int(f.page_number), SqlValue::Text(f.text.clone())];
    for bound in &f.bounds {
        clause.push_str(&format!(" AND c.{} {} ?", bound.column(), bound.op.as_sql()));
        binds.push(SqlValue::Real(bound.value));
    }
    clause.push(')');
    SqlPredicate { clause, binds }
}

fn render_file(f: &FileFilter) -> SqlPredicate {
    let keys = in_list("d.object_key", &f.keys);
    let mut binds = vec![SqlValue::Text(f.bucket.clone())];
    binds.extend(keys.binds);
    SqlPredicate {
        clause: format!("(d.bucket = ? AND {})", keys.clause),
        binds,
    }
}

/// `column IN (?, ...)`; an empty list matches nothing.
fn in_list(column: &str, values: &[String]) -> SqlPredicate {
    if values.is_empty() {
        return SqlPredicate::constant(false);
    }
    SqlPredicate {
        clause: format!("{} IN ({})", column, placeholders(values.len())),
        binds: values.iter().cloned().map(SqlValue::Text).collect(),
    }
}

/// Join children with `sep`; an empty list renders `identity`.
fn join(children: &[Filter], sep: &str, identity: bool) -> SqlPredicate {
    if children.is_empty() {
        return SqlPredicate::constant(identity);
    }
    let mut clauses = Vec::with_capacity(children.len());
    let mut binds = Vec::new();
    for child in children {
        let p = render_filter(child);
        clauses.push(p.clause);
        binds.extend(p.binds);
    }
    SqlPredicate {
        clause: format!("({})", clauses.join(sep)),
        binds,
    }
}

/// `?, ?, ?` with `n` placeholders.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Bind `values` onto `query` in order.
pub fn bind_values<'q>(
    mut query: SqlxQuery<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [SqlValue],
) -> SqlxQuery<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Real(f) => query.bind(*f),
        };
    }
    query
}
