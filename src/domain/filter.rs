//! Filter Expressions
//!
//! Backend-agnostic filter criteria for list queries. A `FilterSet` is a
//! conjunction of `{field, op, value}` clauses that a source adapter
//! translates into its own query language; the in-memory source evaluates it
//! directly through [`FilterSet::matches`].
//!
//! Clauses are kept in canonical order so that two sets built in a different
//! order compare (and serialize) identically. Page loaders rely on that to
//! detect a filter change by value.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::record::Record;

/// A comparable field value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Order two values of compatible types; numbers compare across Int/Float
    pub fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Int(a), FilterValue::Int(b)) => Some(a.cmp(b)),
            (FilterValue::Int(a), FilterValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FilterValue::Float(a), FilterValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (FilterValue::Float(a), FilterValue::Float(b)) => a.partial_cmp(b),
            (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
            (FilterValue::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
            (FilterValue::Null, FilterValue::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Equality with numeric coercion
    pub fn loosely_eq(&self, other: &FilterValue) -> bool {
        match (self, other) {
            (FilterValue::List(a), FilterValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }

    /// Stable text form used for canonical ordering
    fn sort_token(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
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
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(i64::from(v))
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        FilterValue::Int(i64::from(v))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Comparison operator of a clause
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive substring for text, membership for list fields
    Contains,
    /// Field equals one of the listed values
    In,
    /// Field is missing or null; the clause value is ignored
    IsNull,
}

/// One `{field, op, value}` predicate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate the clause against a record
    ///
    /// A missing or null field only satisfies `IsNull`, like SQL comparisons
    /// against NULL.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let field = record.field(&self.field).filter(|v| !v.is_null());

        let Some(actual) = field else {
            return self.op == FilterOp::IsNull;
        };

        match self.op {
            FilterOp::IsNull => false,
            FilterOp::Eq => actual.loosely_eq(&self.value),
            FilterOp::Ne => !actual.loosely_eq(&self.value),
            FilterOp::Gt => actual.compare(&self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => actual.compare(&self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Contains => match (&actual, &self.value) {
                (FilterValue::Text(haystack), FilterValue::Text(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                (FilterValue::List(items), needle) => items.iter().any(|i| i.loosely_eq(needle)),
                _ => false,
            },
            FilterOp::In => match &self.value {
                FilterValue::List(options) => options.iter().any(|o| actual.loosely_eq(o)),
                single => actual.loosely_eq(single),
            },
        }
    }

    fn canonical_cmp(&self, other: &FilterClause) -> Ordering {
        self.field
            .cmp(&other.field)
            .then_with(|| self.op.cmp(&other.op))
            .then_with(|| self.value.sort_token().cmp(&other.value.sort_token()))
    }
}

/// Conjunction of clauses in canonical order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FilterClause>", into = "Vec<FilterClause>")]
pub struct FilterSet {
    clauses: Vec<FilterClause>,
}

impl FilterSet {
    /// Create an empty (match-all) filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause, keeping canonical order
    pub fn with(mut self, clause: FilterClause) -> Self {
        let position = self
            .clauses
            .iter()
            .position(|c| c.canonical_cmp(&clause) == Ordering::Greater)
            .unwrap_or(self.clauses.len());
        self.clauses.insert(position, clause);
        self
    }

    pub fn equals(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.with(FilterClause::new(field, FilterOp::Eq, value))
    }

    pub fn not_equals(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.with(FilterClause::new(field, FilterOp::Ne, value))
    }

    pub fn gte(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.with(FilterClause::new(field, FilterOp::Gte, value))
    }

    pub fn lte(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.with(FilterClause::new(field, FilterOp::Lte, value))
    }

    pub fn contains(self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.with(FilterClause::new(field, FilterOp::Contains, value))
    }

    pub fn one_of(self, field: &str, values: impl Into<FilterValue>) -> Self {
        self.with(FilterClause::new(field, FilterOp::In, values))
    }

    pub fn is_null(self, field: &str) -> Self {
        self.with(FilterClause::new(field, FilterOp::IsNull, FilterValue::Null))
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Check a record against every clause
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

impl FromIterator<FilterClause> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterClause>>(iter: I) -> Self {
        iter.into_iter().fold(FilterSet::new(), FilterSet::with)
    }
}

impl From<Vec<FilterClause>> for FilterSet {
    fn from(clauses: Vec<FilterClause>) -> Self {
        clauses.into_iter().collect()
    }
}

impl From<FilterSet> for Vec<FilterClause> {
    fn from(set: FilterSet) -> Self {
        set.clauses
    }
}

/// Ordering requested from the source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Compare two records by the sort field; missing values sort last
    pub fn compare<R: Record + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        let a = a.field(&self.field).filter(|v| !v.is_null());
        let b = b.field(&self.field).filter(|v| !v.is_null());
        match (a, b) {
            (Some(a), Some(b)) => {
                let ord = a.compare(&b).unwrap_or(Ordering::Equal);
                if self.descending { ord.reverse() } else { ord }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl Default for SortSpec {
    /// Newest first
    fn default() -> Self {
        Self::descending("created_at")
    }
}

/// Filters plus ordering: the criteria a list is paged by
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub filters: FilterSet,
    pub sort: SortSpec,
}

impl ListQuery {
    pub fn new(filters: FilterSet) -> Self {
        Self {
            filters,
            sort: SortSpec::default(),
        }
    }

    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Identified;
    use ahash::AHashMap;

    struct Row(AHashMap<&'static str, FilterValue>);

    impl Identified for Row {
        type Key = usize;

        fn key(&self) -> usize {
            0
        }
    }

    impl Record for Row {
        fn field(&self, name: &str) -> Option<FilterValue> {
            self.0.get(name).cloned()
        }
    }

    fn row(fields: Vec<(&'static str, FilterValue)>) -> Row {
        Row(fields.into_iter().collect())
    }

    #[test]
    fn test_filter_order_does_not_matter() {
        let a = FilterSet::new().equals("stage", "nuevo").gte("score", 50);
        let b = FilterSet::new().gte("score", 50).equals("stage", "nuevo");
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).expect("serialize"),
            serde_json::to_string(&b).expect("serialize")
        );
        assert_ne!(a, FilterSet::new().equals("stage", "nuevo"));
    }

    #[test]
    fn test_clause_evaluation() {
        let lead = row(vec![
            ("company", "Aceros del Norte SA".into()),
            ("score", FilterValue::Int(72)),
            ("sector", "industria".into()),
            ("tags", vec!["familiar", "export"].into()),
            ("owner", FilterValue::Null),
        ]);

        assert!(FilterSet::new().contains("company", "aceros").matches(&lead));
        assert!(FilterSet::new().gte("score", 72.0).matches(&lead));
        assert!(!FilterSet::new().gte("score", 73).matches(&lead));
        assert!(FilterSet::new().lte("score", 72).not_equals("sector", "retail").matches(&lead));
        assert!(FilterSet::new().one_of("sector", vec!["retail", "industria"]).matches(&lead));
        assert!(FilterSet::new().contains("tags", "export").matches(&lead));
        assert!(FilterSet::new().is_null("owner").matches(&lead));
        assert!(FilterSet::new().is_null("missing").matches(&lead));
        assert!(!FilterSet::new().is_null("sector").matches(&lead));
        // Comparisons against a missing field never match
        assert!(!FilterSet::new().not_equals("missing", "x").matches(&lead));
        assert!(FilterSet::new().matches(&lead));
    }

    #[test]
    fn test_sort_missing_values_last() {
        let a = row(vec![("created_at", "2026-01-02".into())]);
        let b = row(vec![("created_at", "2026-01-01".into())]);
        let c = row(vec![]);

        let newest_first = SortSpec::default();
        assert_eq!(newest_first.compare(&a, &b), Ordering::Less);
        assert_eq!(newest_first.compare(&c, &b), Ordering::Greater);
        assert_eq!(SortSpec::ascending("created_at").compare(&a, &b), Ordering::Greater);
    }
}
