//! MongoDB repository using the official MongoDB async driver.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! critere-rs = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Storage model
//!
//! Each repository owns one collection. Identities are native `ObjectId`s
//! stored in `_id` and exposed as their hex string in the `id` field.
//!
//! # Serialization strategy
//!
//! Records are converted between `serde_json::Value` and BSON by hand. The
//! two stamped fields (`createdAt`, `updatedAt`) are stored as BSON dates and
//! rendered back as RFC 3339 strings, so range criteria on them compare as
//! dates on the server side. Every other string is stored verbatim, even when
//! it looks like a date.

use crate::config::RepositoryConfig;
use crate::core::criteria::Criteria;
use crate::core::error::{RepositoryError, Result};
use crate::core::field::{FieldValue, format_timestamp};
use crate::core::filter::{Condition, Filter, ID_FIELD, Predicate};
use crate::core::format::{self, CREATED_AT, Record, UPDATED_AT};
use crate::core::query::QueryOptions;
use crate::core::repository::{DataRepository, Dto};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection};
use serde_json::{Map, Number, Value};
use std::marker::PhantomData;
use tokio::sync::RwLock;

const BACKEND: &str = "mongodb";

/// MongoDB convention for the primary key
const NATIVE_ID: &str = "_id";

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Top-level fields stored as native BSON dates
fn is_timestamp(field: &str) -> bool {
    field == CREATED_AT || field == UPDATED_AT
}

fn date_to_bson(dt: &DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis()))
}

/// Convert a JSON value into BSON
fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Bson::Int64(i),
            None => Bson::Double(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.iter()
                .map(|(key, value)| (key.clone(), json_to_bson(value)))
                .collect(),
        ),
    }
}

/// Convert a stamped value, keeping it as text when it is not RFC 3339
fn timestamp_to_bson(value: &Value) -> Bson {
    match value {
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => date_to_bson(&dt.with_timezone(&Utc)),
            Err(_) => Bson::String(s.clone()),
        },
        other => json_to_bson(other),
    }
}

fn record_to_document(record: &Record) -> Document {
    record
        .iter()
        .map(|(key, value)| {
            let bson = if is_timestamp(key) {
                timestamp_to_bson(value)
            } else {
                json_to_bson(value)
            };
            (key.clone(), bson)
        })
        .collect()
}

/// Convert BSON back into JSON: `ObjectId` becomes its hex string and dates
/// become RFC 3339 strings
fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
            .map_or(Value::Null, |dt| Value::String(format_timestamp(&dt))),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_record(doc)),
        other => other.into_relaxed_extjson(),
    }
}

fn document_to_record(doc: Document) -> Map<String, Value> {
    doc.into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

/// Criteria value to BSON, in the shape the field is stored in
///
/// Dates compare natively only on the stamped fields; elsewhere they are
/// matched against their RFC 3339 text.
fn field_to_bson(value: &FieldValue, timestamp: bool) -> Bson {
    match value {
        FieldValue::String(s) if timestamp => timestamp_to_bson(&Value::String(s.clone())),
        FieldValue::String(s) => Bson::String(s.clone()),
        FieldValue::Integer(i) => Bson::Int64(*i),
        FieldValue::Float(f) => Bson::Double(*f),
        FieldValue::Boolean(b) => Bson::Boolean(*b),
        FieldValue::Uuid(u) => Bson::String(u.to_string()),
        FieldValue::DateTime(dt) if timestamp => date_to_bson(dt),
        FieldValue::DateTime(dt) => Bson::String(format_timestamp(dt)),
        FieldValue::Json(v) => json_to_bson(v),
        FieldValue::Null => Bson::Null,
    }
}

/// Coerce an identity value to `ObjectId`
///
/// Fails fast: a value that cannot be an `ObjectId` could never match.
fn object_id(value: &FieldValue) -> Result<Bson> {
    let text = match value {
        FieldValue::String(s) => s.clone(),
        other => other.to_json().to_string(),
    };

    ObjectId::parse_str(&text).map(Bson::ObjectId).map_err(|_| {
        tracing::warn!(value = %text, "Rejected malformed ObjectId");
        RepositoryError::MalformedIdentifier {
            backend: BACKEND,
            value: text,
        }
    })
}

fn case_insensitive(text: &str) -> Document {
    doc! { "$regex": regex::escape(text), "$options": "i" }
}

// ---------------------------------------------------------------------------
// Filter lowering
// ---------------------------------------------------------------------------

/// Lower a compiled filter into a MongoDB query document
///
/// Conditions on the same field are merged into one operator document
/// (`{age: {$gte: 35, $lte: 50}}`); conflicting operators fall back to
/// `$and`.
fn lower_filter(filter: &Filter) -> Result<Document> {
    let mut query = lower_conditions(&filter.conditions, true)?;

    if let Some(search) = &filter.search {
        let clauses: Vec<Bson> = search
            .fields
            .iter()
            .map(|field| {
                Bson::Document(doc! { field.as_str(): case_insensitive(&search.term) })
            })
            .collect();
        query.insert("$or", clauses);
    }

    if let Some(field) = &filter.exclude_deleted {
        merge_operators(&mut query, field, doc! { "$eq": Bson::Null });
    }

    Ok(query)
}

fn lower_conditions(conditions: &[Condition], top_level: bool) -> Result<Document> {
    let mut query = Document::new();
    for condition in conditions {
        let identity = top_level && condition.is_identity();
        let timestamp = top_level && is_timestamp(&condition.field);
        let key = if identity {
            NATIVE_ID
        } else {
            condition.field.as_str()
        };
        let value = |v: &FieldValue| -> Result<Bson> {
            if identity {
                object_id(v)
            } else {
                Ok(field_to_bson(v, timestamp))
            }
        };

        let operators = match &condition.predicate {
            Predicate::Eq(v) => doc! { "$eq": value(v)? },
            Predicate::In(values) => doc! {
                "$in": values.iter().map(&value).collect::<Result<Vec<Bson>>>()?
            },
            Predicate::Like(text) => case_insensitive(text),
            Predicate::Gte(v) => doc! { "$gte": value(v)? },
            Predicate::Lte(v) => doc! { "$lte": value(v)? },
            Predicate::ElemMatch(inner) => {
                doc! { "$elemMatch": lower_conditions(&inner.conditions, false)? }
            }
        };

        merge_operators(&mut query, key, operators);
    }
    Ok(query)
}

fn merge_operators(query: &mut Document, key: &str, operators: Document) {
    if let Ok(existing) = query.get_document_mut(key)
        && !operators.keys().any(|op| existing.contains_key(op))
    {
        existing.extend(operators);
        return;
    }

    if query.contains_key(key) {
        let clause = Bson::Document(doc! { key: operators });
        match query.get_array_mut("$and") {
            Ok(clauses) => clauses.push(clause),
            Err(_) => {
                query.insert("$and", vec![clause]);
            }
        }
    } else {
        query.insert(key, operators);
    }
}

fn lower_sort(options: &QueryOptions) -> Option<Document> {
    options.sort.as_ref().map(|sort| {
        let field = if sort.field == ID_FIELD {
            NATIVE_ID
        } else {
            sort.field.as_str()
        };
        doc! { field: sort.direction.as_i32() }
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(
    operation: &'static str,
    collection: &str,
    err: mongodb::error::Error,
) -> RepositoryError {
    tracing::error!(operation, collection, error = %err, "MongoDB operation failed");
    let message = err.to_string();
    match err.kind.as_ref() {
        ErrorKind::Write(_) | ErrorKind::InsertMany(_) => RepositoryError::Conflict {
            backend: BACKEND,
            operation,
            message,
        },
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::Authentication { .. }
        | ErrorKind::DnsResolve { .. } => RepositoryError::Connection {
            backend: BACKEND,
            message,
        },
        _ => RepositoryError::Query {
            backend: BACKEND,
            operation,
            message,
        },
    }
}

// ---------------------------------------------------------------------------
// MongoRepository<D, C>
// ---------------------------------------------------------------------------

struct MongoConnection {
    client: Client,
    collection: Collection<Document>,
}

/// Repository backed by one MongoDB collection.
///
/// The client is created on first use and owned by this instance; nothing
/// is shared with other repositories.
///
/// # Example
///
/// ```rust,ignore
/// use critere::storage::MongoRepository;
///
/// let repo = MongoRepository::<User, UserCriteria>::new(
///     "mongodb://localhost:27017",
///     "shop",
///     "users",
/// );
/// let user = repo.create_item(&User::new("Alice".into(), None, Some(30))).await?;
/// ```
pub struct MongoRepository<D, C> {
    uri: String,
    database: String,
    collection: String,
    max_pool_size: Option<u32>,
    soft_delete_field: Option<String>,
    connection: RwLock<Option<MongoConnection>>,
    _marker: PhantomData<fn() -> (D, C)>,
}

impl<D, C> MongoRepository<D, C> {
    pub fn new(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: collection.into(),
            max_pool_size: None,
            soft_delete_field: None,
            connection: RwLock::new(None),
            _marker: PhantomData,
        }
    }

    /// Build a repository from a validated configuration
    pub fn from_config(config: &RepositoryConfig) -> Self {
        let mut repo = Self::new(
            &config.connection_string,
            &config.database_name,
            &config.collection_or_table_name,
        );
        repo.max_pool_size = config.max_connections;
        repo.soft_delete_field = config.soft_delete_field.clone();
        repo
    }

    /// Get the MongoDB collection, connecting on first use.
    async fn collection(&self) -> Result<Collection<Document>> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.collection.clone());
        }

        let mut guard = self.connection.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.collection.clone());
        }

        let conn = self.connect().await?;
        let collection = conn.collection.clone();
        *guard = Some(conn);
        Ok(collection)
    }

    async fn connect(&self) -> Result<MongoConnection> {
        let connection_error = |err: mongodb::error::Error| {
            tracing::error!(
                database = %self.database,
                error = %err,
                "Failed to connect to MongoDB"
            );
            RepositoryError::Connection {
                backend: BACKEND,
                message: err.to_string(),
            }
        };

        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(connection_error)?;
        if self.max_pool_size.is_some() {
            options.max_pool_size = self.max_pool_size;
        }

        let client = Client::with_options(options).map_err(connection_error)?;
        let database = client.database(&self.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        tracing::info!(
            database = %self.database,
            collection = %self.collection,
            "Connected to MongoDB"
        );

        Ok(MongoConnection {
            collection: database.collection(&self.collection),
            client,
        })
    }
}

impl<D: Dto, C: Criteria> MongoRepository<D, C> {
    fn compile(&self, criteria: &C) -> Filter {
        Filter::compile_with_guard(criteria, self.soft_delete_field.as_deref())
    }

    /// Compile criteria that must select specific records
    fn strict_query(&self, criteria: &C, operation: &'static str) -> Result<Document> {
        let filter = self.compile(criteria).require_criteria(operation)?;
        lower_filter(&filter)
    }

    fn document_to_dto(doc: Document) -> Result<D> {
        let record = format::normalize_identity(document_to_record(doc), NATIVE_ID);
        format::from_record(record)
    }

    fn error(
        &self,
        operation: &'static str,
    ) -> impl Fn(mongodb::error::Error) -> RepositoryError + '_ {
        move |err| map_error(operation, &self.collection, err)
    }
}

impl<D, C> MongoRepository<D, C> {
    /// Run an aggregation pipeline against the collection
    ///
    /// Stages are passed through untouched; results come back as JSON with
    /// `ObjectId`s rendered as hex strings and dates as RFC 3339 text.
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Value>> {
        tracing::debug!(
            collection = %self.collection,
            stages = pipeline.len(),
            "Running aggregation"
        );

        let docs: Vec<Document> = self
            .collection()
            .await?
            .aggregate(pipeline)
            .await
            .map_err(|err| map_error("aggregate", &self.collection, err))?
            .try_collect()
            .await
            .map_err(|err| map_error("aggregate", &self.collection, err))?;

        Ok(docs
            .into_iter()
            .map(|doc| Value::Object(document_to_record(doc)))
            .collect())
    }
}

#[async_trait]
impl<D, C> DataRepository<D, C> for MongoRepository<D, C>
where
    D: Dto,
    C: Criteria + Default + 'static,
{
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn initialize(&self) -> Result<()> {
        self.collection().await.map(|_| ())
    }

    async fn get_items(&self, criteria: &C) -> Result<Vec<D>> {
        let query = lower_filter(&self.compile(criteria))?;
        let options = QueryOptions::compile(criteria.base());
        tracing::debug!(collection = %self.collection, filter = %query, "Finding documents");

        let collection = self.collection().await?;
        let mut find = collection.find(query);
        if let Some(sort) = lower_sort(&options) {
            find = find.sort(sort);
        }
        if let Some(skip) = options.effective_skip() {
            find = find.skip(skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let docs: Vec<Document> = find
            .await
            .map_err(self.error("get_items"))?
            .try_collect()
            .await
            .map_err(self.error("get_items"))?;

        docs.into_iter().map(Self::document_to_dto).collect()
    }

    async fn get_item(&self, criteria: &C) -> Result<D> {
        let query = self.strict_query(criteria, "get_item")?;

        let doc = self
            .collection()
            .await?
            .find_one(query)
            .await
            .map_err(self.error("get_item"))?
            .ok_or_else(|| RepositoryError::not_found(&self.collection, "get_item"))?;

        Self::document_to_dto(doc)
    }

    /// Insert the document and read it back to return the stored version.
    async fn create_item(&self, dto: &D) -> Result<D> {
        let record = format::prepare_insert(dto, Utc::now())?;
        let collection = self.collection().await?;

        let inserted = collection
            .insert_one(record_to_document(&record))
            .await
            .map_err(self.error("create_item"))?;

        let doc = collection
            .find_one(doc! { NATIVE_ID: inserted.inserted_id })
            .await
            .map_err(self.error("create_item"))?
            .ok_or_else(|| RepositoryError::not_found(&self.collection, "create_item"))?;

        Self::document_to_dto(doc)
    }

    async fn update_item(&self, dto: &D, criteria: &C) -> Result<D> {
        let query = self.strict_query(criteria, "update_item")?;
        let changes = record_to_document(&format::prepare_update(dto, Utc::now())?);

        let doc = self
            .collection()
            .await?
            .find_one_and_update(query, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await
            .map_err(self.error("update_item"))?
            .ok_or_else(|| RepositoryError::not_found(&self.collection, "update_item"))?;

        Self::document_to_dto(doc)
    }

    async fn delete_item(&self, criteria: &C) -> Result<bool> {
        let query = self.strict_query(criteria, "delete_item")?;

        let result = self
            .collection()
            .await?
            .delete_one(query)
            .await
            .map_err(self.error("delete_item"))?;

        Ok(result.deleted_count > 0)
    }

    async fn item_exists(&self, criteria: &C) -> Result<bool> {
        let query = self.strict_query(criteria, "item_exists")?;

        let count = self
            .collection()
            .await?
            .count_documents(query)
            .limit(1)
            .await
            .map_err(self.error("item_exists"))?;

        Ok(count > 0)
    }

    async fn count_items(&self, criteria: &C) -> Result<u64> {
        let query = lower_filter(&self.compile(criteria))?;

        self.collection()
            .await?
            .count_documents(query)
            .await
            .map_err(self.error("count_items"))
    }

    async fn bulk_insert(&self, dtos: &[D]) -> Result<u64> {
        if dtos.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let docs = dtos
            .iter()
            .map(|dto| format::prepare_insert(dto, now).map(|r| record_to_document(&r)))
            .collect::<Result<Vec<_>>>()?;

        let result = self
            .collection()
            .await?
            .insert_many(docs)
            .await
            .map_err(self.error("bulk_insert"))?;

        Ok(result.inserted_ids.len() as u64)
    }

    async fn bulk_update(&self, patch: &D, criteria: &C) -> Result<u64> {
        let query = self.strict_query(criteria, "bulk_update")?;
        let changes = record_to_document(&format::prepare_update(patch, Utc::now())?);

        let result = self
            .collection()
            .await?
            .update_many(query, doc! { "$set": changes })
            .await
            .map_err(self.error("bulk_update"))?;

        Ok(result.matched_count)
    }

    async fn bulk_delete(&self, criteria: &C) -> Result<u64> {
        let query = self.strict_query(criteria, "bulk_delete")?;

        let result = self
            .collection()
            .await?
            .delete_many(query)
            .await
            .map_err(self.error("bulk_delete"))?;

        Ok(result.deleted_count)
    }

    async fn disconnect(&self) -> Result<()> {
        let connection = self.connection.write().await.take();
        if let Some(conn) = connection {
            conn.client.shutdown().await;
            tracing::info!(collection = %self.collection, "Disconnected from MongoDB");
        }
        Ok(())
    }
}
