//! Small SQL builder: conjunctive WHERE clauses with positional parameters
//!
//! Every fragment uses anonymous `?` placeholders, so fragments and their
//! parameters stay aligned simply by being appended in the same order.

use rusqlite::types::Value;

/// A SQL fragment and the parameters its placeholders bind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// `col = ?`
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(format!("{} = ?", column), vec![value.into()])
    }

    /// `col IN (?, ?, ...)`; an empty list matches nothing
    pub fn in_list(column: &str, values: &[String]) -> Self {
        if values.is_empty() {
            return Self::new("0", Vec::new());
        }
        Self::new(
            format!("{} IN ({})", column, placeholders(values.len())),
            values.iter().cloned().map(Value::Text).collect(),
        )
    }

    /// `(a) OR (b) OR ...`, wrapped in parentheses; an empty list matches nothing
    pub fn any_of(fragments: Vec<Fragment>) -> Self {
        if fragments.is_empty() {
            return Self::new("0", Vec::new());
        }
        let mut sql = Vec::with_capacity(fragments.len());
        let mut params = Vec::new();
        for f in fragments {
            sql.push(format!("({})", f.sql));
            params.extend(f.params);
        }
        Self::new(format!("({})", sql.join(" OR ")), params)
    }
}

/// `?, ?, ?`
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `(?, ?, ?), (?, ?, ?)` for a multi-row INSERT
pub fn row_placeholders(rows: usize, columns: usize) -> String {
    let row = format!("({})", placeholders(columns));
    vec![row; rows].join(", ")
}

/// Conjunction of predicates
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, fragment: Fragment) -> Self {
        self.clauses.push(fragment.sql);
        self.params.extend(fragment.params);
        self
    }

    pub fn and_if(self, cond: bool, fragment: impl FnOnce() -> Fragment) -> Self {
        if cond {
            self.and(fragment())
        } else {
            self
        }
    }

    /// ` WHERE a AND b`, or an empty string
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}
