//! Backend-neutral filter compilation
//!
//! [`Filter::compile`] turns a [`Criteria`] value into a small predicate IR.
//! Each storage backend then lowers the IR into its native form (a BSON
//! document, a parameterized SQL fragment, or an in-process matcher).
//!
//! # Compilation rules
//!
//! - absent, null and empty-string values are skipped
//! - a field named `id` (any case) is the primary-key lookup
//! - `like` builds a case-insensitive substring predicate; backends escape
//!   the value so it always matches literally
//! - arrays build an "any of" predicate
//! - a date given as a plain value builds `>=` (open upper bound)
//! - `min` / `max` build `>=` / `<=` and can be combined on one field
//! - nested criteria compile recursively into an element-match predicate
//!
//! An empty filter matches everything. Single-record operations must call
//! [`Filter::require_criteria`] so that an empty filter is rejected.

use crate::core::criteria::Criteria;
use crate::core::error::{RepositoryError, Result};
use crate::core::field::FieldValue;

/// Reserved name of the normalized primary-key field
pub const ID_FIELD: &str = "id";

/// A single predicate on one field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact match
    Eq(FieldValue),
    /// Membership in a set of values
    In(Vec<FieldValue>),
    /// Case-insensitive substring match (raw, unescaped text)
    Like(String),
    /// Greater than or equal
    Gte(FieldValue),
    /// Less than or equal
    Lte(FieldValue),
    /// At least one element of an array field matches the nested filter
    ElemMatch(Filter),
}

/// A predicate bound to a field name
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub predicate: Predicate,
}

impl Condition {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }

    /// Whether this condition targets the primary key
    pub fn is_identity(&self) -> bool {
        self.field == ID_FIELD
    }
}

/// Free-text search spread over several fields (OR semantics)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTerm {
    pub term: String,
    pub fields: Vec<String>,
}

/// Compiled, backend-neutral filter
///
/// All conditions are combined with AND. The soft-delete guard is kept
/// apart so that it never makes an otherwise empty filter look populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub search: Option<SearchTerm>,
    pub exclude_deleted: Option<String>,
}

impl Filter {
    /// Compile a criteria value
    pub fn compile<C: Criteria + ?Sized>(criteria: &C) -> Self {
        let base = criteria.base();
        let mut builder = FilterBuilder::new();

        builder.eq(ID_FIELD, base.id.as_ref());
        builder.any_of(ID_FIELD, base.ids.as_ref());
        criteria.apply(&mut builder);

        if let Some(term) = base.search.as_deref().filter(|t| !t.is_empty()) {
            let fields = criteria.search_fields();
            if fields.is_empty() {
                tracing::debug!(term, "Search token ignored: entity declares no search fields");
            } else {
                builder.search(term, fields);
            }
        }

        let filter = builder.build();
        tracing::debug!(conditions = filter.conditions.len(), "Compiled criteria");
        filter
    }

    /// Compile a criteria value and attach the soft-delete guard when the
    /// repository has a soft-delete field and the criteria do not ask for
    /// deleted records
    pub fn compile_with_guard<C: Criteria + ?Sized>(
        criteria: &C,
        soft_delete_field: Option<&str>,
    ) -> Self {
        let mut filter = Self::compile(criteria);
        if !criteria.base().includes_deleted() {
            filter.exclude_deleted = soft_delete_field.map(str::to_string);
        }
        filter
    }

    /// True when no caller-supplied condition survived compilation
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.search.is_none()
    }

    /// Reject an empty filter for operations that act on specific records
    pub fn require_criteria(self, operation: &'static str) -> Result<Self> {
        if self.is_empty() {
            tracing::warn!(operation, "Rejected operation without criteria");
            return Err(RepositoryError::criteria_required(operation));
        }
        Ok(self)
    }

    /// Identity values referenced by this filter (from `Eq` and `In` on `id`)
    pub fn identity_values(&self) -> impl Iterator<Item = &FieldValue> {
        self.conditions
            .iter()
            .filter(|c| c.is_identity())
            .flat_map(|c| match &c.predicate {
                Predicate::Eq(v) => std::slice::from_ref(v).iter(),
                Predicate::In(values) => values.iter(),
                _ => std::slice::Iter::default(),
            })
    }
}

/// Collects conditions for one criteria value
///
/// Every method accepts an `Option` and silently skips absent or blank
/// values, so a generated `apply` can forward each field unconditionally.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    conditions: Vec<Condition>,
    search: Option<SearchTerm>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact match (dates compile to an open-ended `>=`)
    pub fn eq<V>(&mut self, field: &str, value: Option<&V>) -> &mut Self
    where
        V: Clone + Into<FieldValue>,
    {
        let Some(value) = Self::populated(value) else {
            return self;
        };

        let field = normalize_field(field);
        let predicate = if value.is_date() {
            Predicate::Gte(value)
        } else {
            Predicate::Eq(value)
        };
        self.conditions.push(Condition::new(field, predicate));
        self
    }

    /// Case-insensitive substring match
    pub fn like<S>(&mut self, field: &str, value: Option<&S>) -> &mut Self
    where
        S: AsRef<str> + ?Sized,
    {
        let text: Option<&str> = value.map(|s| s.as_ref());
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.conditions.push(Condition::new(
                normalize_field(field),
                Predicate::Like(text.to_string()),
            ));
        }
        self
    }

    /// Inclusive lower bound
    pub fn min<V>(&mut self, field: &str, value: Option<&V>) -> &mut Self
    where
        V: Clone + Into<FieldValue>,
    {
        if let Some(value) = Self::populated(value) {
            self.conditions
                .push(Condition::new(normalize_field(field), Predicate::Gte(value)));
        }
        self
    }

    /// Inclusive upper bound
    pub fn max<V>(&mut self, field: &str, value: Option<&V>) -> &mut Self
    where
        V: Clone + Into<FieldValue>,
    {
        if let Some(value) = Self::populated(value) {
            self.conditions
                .push(Condition::new(normalize_field(field), Predicate::Lte(value)));
        }
        self
    }

    /// Membership ("IN") predicate; empty lists are skipped
    pub fn any_of<V>(&mut self, field: &str, values: Option<&Vec<V>>) -> &mut Self
    where
        V: Clone + Into<FieldValue>,
    {
        let values: Vec<FieldValue> = values
            .into_iter()
            .flatten()
            .map(|v| v.clone().into())
            .filter(|v: &FieldValue| !v.is_blank())
            .collect();

        if !values.is_empty() {
            self.conditions
                .push(Condition::new(normalize_field(field), Predicate::In(values)));
        }
        self
    }

    /// Element-match predicate built from nested criteria
    pub fn nested<C>(&mut self, field: &str, criteria: Option<&C>) -> &mut Self
    where
        C: Criteria,
    {
        if let Some(criteria) = criteria {
            let mut inner = FilterBuilder::new();
            criteria.apply(&mut inner);
            let inner = inner.build();
            if !inner.is_empty() {
                self.conditions
                    .push(Condition::new(field, Predicate::ElemMatch(inner)));
            }
        }
        self
    }

    /// Free-text search over the given fields
    pub fn search(&mut self, term: &str, fields: &[&str]) -> &mut Self {
        if !term.is_empty() && !fields.is_empty() {
            self.search = Some(SearchTerm {
                term: term.to_string(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
            });
        }
        self
    }

    /// Push a pre-built condition
    pub fn condition(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    pub fn build(self) -> Filter {
        Filter {
            conditions: self.conditions,
            search: self.search,
            exclude_deleted: None,
        }
    }

    fn populated<V>(value: Option<&V>) -> Option<FieldValue>
    where
        V: Clone + Into<FieldValue>,
    {
        value
            .map(|v| v.clone().into())
            .filter(|v: &FieldValue| !v.is_blank())
    }
}

fn normalize_field(field: &str) -> String {
    if field.eq_ignore_ascii_case(ID_FIELD) {
        ID_FIELD.to_string()
    } else {
        field.to_string()
    }
}
