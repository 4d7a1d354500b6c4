//! In-memory repository for testing and development
//!
//! Records are kept as JSON objects and the compiled [`Filter`] is evaluated
//! directly against them, with the same semantics the database backends
//! implement natively.

use crate::core::criteria::{Criteria, SortDirection};
use crate::core::error::{RepositoryError, Result};
use crate::core::field::FieldValue;
use crate::core::filter::{Condition, Filter, ID_FIELD, Predicate};
use crate::core::format::{self, Record};
use crate::core::query::{QueryOptions, SortSpec};
use crate::core::repository::{DataRepository, Dto};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

const BACKEND: &str = "in-memory";

/// In-memory repository implementation
///
/// Uses RwLock for thread-safe access. Clones share the same records, and
/// records outlive [`disconnect`](DataRepository::disconnect): the next
/// operation reconnects lazily and sees the same data.
pub struct InMemoryRepository<D, C> {
    collection: String,
    soft_delete_field: Option<String>,
    records: Arc<RwLock<Vec<Record>>>,
    connected: Arc<AtomicBool>,
    _marker: PhantomData<fn() -> (D, C)>,
}

impl<D, C> Clone for InMemoryRepository<D, C> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            soft_delete_field: self.soft_delete_field.clone(),
            records: Arc::clone(&self.records),
            connected: Arc::clone(&self.connected),
            _marker: PhantomData,
        }
    }
}

impl<D, C> InMemoryRepository<D, C> {
    /// Create an empty repository for the named collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            soft_delete_field: None,
            records: Arc::new(RwLock::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(false)),
            _marker: PhantomData,
        }
    }

    pub fn with_soft_delete_field(mut self, field: Option<String>) -> Self {
        self.soft_delete_field = field;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.connected.load(AtomicOrdering::Acquire)
    }

    fn ensure_connected(&self) {
        if !self.connected.swap(true, AtomicOrdering::AcqRel) {
            tracing::debug!(collection = %self.collection, "Connected to in-memory store");
        }
    }

    fn read<T>(&self, operation: &'static str, f: impl FnOnce(&Vec<Record>) -> T) -> Result<T> {
        self.ensure_connected();
        let records = self.records.read().map_err(|e| lock_error(operation, e))?;
        Ok(f(&records))
    }

    fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Vec<Record>) -> T,
    ) -> Result<T> {
        self.ensure_connected();
        let mut records = self.records.write().map_err(|e| lock_error(operation, e))?;
        Ok(f(&mut records))
    }
}

impl<D: Dto, C: Criteria> InMemoryRepository<D, C> {
    fn read_filter(&self, criteria: &C) -> Filter {
        Filter::compile_with_guard(criteria, self.soft_delete_field.as_deref())
    }

    fn to_dto(record: &Record) -> Result<D> {
        format::from_record(format::normalize_identity(record.clone(), ID_FIELD))
    }

    fn stamp_insert(dto: &D) -> Result<Record> {
        let mut record = format::prepare_insert(dto, Utc::now())?;
        record.insert(
            ID_FIELD.to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );
        Ok(record)
    }
}

fn lock_error(operation: &'static str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Query {
        backend: BACKEND,
        operation,
        message: format!("Failed to acquire lock: {}", err),
    }
}

#[async_trait]
impl<D, C> DataRepository<D, C> for InMemoryRepository<D, C>
where
    D: Dto,
    C: Criteria + Default + 'static,
{
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn initialize(&self) -> Result<()> {
        if !self.connected.swap(true, AtomicOrdering::AcqRel) {
            tracing::info!(collection = %self.collection, "In-memory repository initialized");
        }
        Ok(())
    }

    async fn get_items(&self, criteria: &C) -> Result<Vec<D>> {
        let filter = self.read_filter(criteria);
        let options = QueryOptions::compile(criteria.base());

        let rows = self.read("get_items", |records| {
            let mut rows: Vec<&Record> = records.iter().filter(|r| matches(&filter, r)).collect();
            if let Some(sort) = &options.sort {
                rows.sort_by(|a, b| compare_by(sort, a, b));
            }
            rows.into_iter()
                .skip(options.skip.unwrap_or(0) as usize)
                .take(options.limit.map_or(usize::MAX, |l| l as usize))
                .map(Self::to_dto)
                .collect::<Result<Vec<D>>>()
        })??;

        tracing::debug!(collection = %self.collection, count = rows.len(), "Listed records");
        Ok(rows)
    }

    async fn get_item(&self, criteria: &C) -> Result<D> {
        let filter = self.read_filter(criteria).require_criteria("get_item")?;

        self.read("get_item", |records| {
            records
                .iter()
                .find(|r| matches(&filter, r))
                .map(Self::to_dto)
        })?
        .ok_or_else(|| RepositoryError::not_found(&self.collection, "get_item"))?
    }

    async fn create_item(&self, dto: &D) -> Result<D> {
        let record = Self::stamp_insert(dto)?;
        let created = Self::to_dto(&record)?;

        self.write("create_item", |records| records.push(record))?;
        tracing::debug!(collection = %self.collection, id = created.id(), "Created record");
        Ok(created)
    }

    async fn update_item(&self, dto: &D, criteria: &C) -> Result<D> {
        let filter = self.read_filter(criteria).require_criteria("update_item")?;
        let changes = format::prepare_update(dto, Utc::now())?;

        self.write("update_item", |records| {
            records
                .iter_mut()
                .find(|r| matches(&filter, r))
                .map(|record| {
                    record.extend(changes);
                    Self::to_dto(record)
                })
        })?
        .ok_or_else(|| RepositoryError::not_found(&self.collection, "update_item"))?
    }

    async fn delete_item(&self, criteria: &C) -> Result<bool> {
        let filter = self.read_filter(criteria).require_criteria("delete_item")?;

        self.write("delete_item", |records| {
            match records.iter().position(|r| matches(&filter, r)) {
                Some(index) => {
                    records.remove(index);
                    true
                }
                None => false,
            }
        })
    }

    async fn item_exists(&self, criteria: &C) -> Result<bool> {
        let filter = self.read_filter(criteria).require_criteria("item_exists")?;
        self.read("item_exists", |records| {
            records.iter().any(|r| matches(&filter, r))
        })
    }

    async fn count_items(&self, criteria: &C) -> Result<u64> {
        let filter = self.read_filter(criteria);
        self.read("count_items", |records| {
            records.iter().filter(|r| matches(&filter, r)).count() as u64
        })
    }

    async fn bulk_insert(&self, dtos: &[D]) -> Result<u64> {
        let batch = dtos
            .iter()
            .map(Self::stamp_insert)
            .collect::<Result<Vec<_>>>()?;
        let inserted = batch.len() as u64;

        self.write("bulk_insert", |records| records.extend(batch))?;
        tracing::debug!(collection = %self.collection, inserted, "Bulk inserted records");
        Ok(inserted)
    }

    async fn bulk_update(&self, patch: &D, criteria: &C) -> Result<u64> {
        let filter = self.read_filter(criteria).require_criteria("bulk_update")?;
        let changes = format::prepare_update(patch, Utc::now())?;

        self.write("bulk_update", |records| {
            let mut updated = 0;
            for record in records.iter_mut().filter(|r| matches(&filter, r)) {
                record.extend(changes.clone());
                updated += 1;
            }
            updated
        })
    }

    async fn bulk_delete(&self, criteria: &C) -> Result<u64> {
        let filter = self.read_filter(criteria).require_criteria("bulk_delete")?;

        self.write("bulk_delete", |records| {
            let before = records.len();
            records.retain(|r| !matches(&filter, r));
            (before - records.len()) as u64
        })
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, AtomicOrdering::AcqRel) {
            tracing::info!(collection = %self.collection, "In-memory repository disconnected");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Filter evaluation
// ---------------------------------------------------------------------------

fn matches(filter: &Filter, record: &Record) -> bool {
    let deleted = filter
        .exclude_deleted
        .as_ref()
        .is_some_and(|field| record.get(field).is_some_and(|v| !v.is_null()));
    if deleted {
        return false;
    }

    let search_ok = filter.search.as_ref().is_none_or(|search| {
        search
            .fields
            .iter()
            .any(|field| record.get(field).is_some_and(|v| contains_text(v, &search.term)))
    });

    search_ok && filter.conditions.iter().all(|c| condition_matches(c, record))
}

fn condition_matches(condition: &Condition, record: &Record) -> bool {
    let Some(stored) = record.get(&condition.field) else {
        return false;
    };

    match &condition.predicate {
        Predicate::Eq(value) => equals(value, stored),
        Predicate::In(values) => values.iter().any(|v| equals(v, stored)),
        Predicate::Like(text) => contains_text(stored, text),
        Predicate::Gte(value) => any_element(stored, |s| {
            matches!(value.compare_json(s), Some(Ordering::Less | Ordering::Equal))
        }),
        Predicate::Lte(value) => any_element(stored, |s| {
            matches!(
                value.compare_json(s),
                Some(Ordering::Greater | Ordering::Equal)
            )
        }),
        Predicate::ElemMatch(inner) => match stored {
            Value::Array(items) => items.iter().any(|item| match item {
                Value::Object(obj) => matches(inner, obj),
                _ => false,
            }),
            Value::Object(obj) => matches(inner, obj),
            _ => false,
        },
    }
}

/// Scalar predicates on an array field match when any element matches
fn any_element(stored: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match stored {
        Value::Array(items) => items.iter().any(&pred),
        other => pred(other),
    }
}

fn equals(value: &FieldValue, stored: &Value) -> bool {
    if let FieldValue::Json(expected) = value {
        if expected == stored {
            return true;
        }
    }
    any_element(stored, |s| value.compare_json(s) == Some(Ordering::Equal))
}

fn contains_text(stored: &Value, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    any_element(stored, |s| {
        s.as_str()
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}

fn compare_by(sort: &SortSpec, a: &Record, b: &Record) -> Ordering {
    let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Missing and null values sort first
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
