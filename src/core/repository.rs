//! The uniform repository contract every storage backend implements

use crate::core::criteria::Criteria;
use crate::core::error::Result;
use crate::core::query::{Paginated, PaginationMeta, QueryOptions};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A plain record persisted by a repository
///
/// The identity is always a string on the wire, whatever the backend's
/// native key type. Use [`impl_dto!`](crate::impl_dto) to declare one.
pub trait Dto: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Normalized identity, `None` before the record is created
    fn id(&self) -> Option<&str>;
}

/// Repository trait for one entity type
///
/// `D` is the record type and `C` the criteria type used to select records.
/// Implementations establish their connection lazily: every operation
/// behaves as if [`initialize`](DataRepository::initialize) had been called
/// first.
///
/// Operations that act on specific records (`get_item`, `update_item`,
/// `delete_item`, `item_exists`, and the bulk mutations) reject criteria
/// that compile to an empty filter with a validation error.
#[async_trait]
pub trait DataRepository<D: Dto, C: Criteria + Default + 'static>: Send + Sync {
    /// Short backend name used in logs and errors
    fn backend(&self) -> &'static str;

    /// Establish the connection; calling it again is a no-op
    async fn initialize(&self) -> Result<()>;

    /// All records matching the criteria, ordered and paginated
    ///
    /// Returns an empty vector when nothing matches.
    async fn get_items(&self, criteria: &C) -> Result<Vec<D>>;

    /// The first record matching the criteria
    async fn get_item(&self, criteria: &C) -> Result<D>;

    /// Insert a record and return it as stored
    ///
    /// Any caller-supplied id and timestamps are ignored.
    async fn create_item(&self, dto: &D) -> Result<D>;

    /// Apply the non-null fields of `dto` to the first matching record and
    /// return the record after the update
    async fn update_item(&self, dto: &D, criteria: &C) -> Result<D>;

    /// Delete the first matching record, returning whether one was removed
    async fn delete_item(&self, criteria: &C) -> Result<bool>;

    /// Whether at least one record matches
    async fn item_exists(&self, criteria: &C) -> Result<bool>;

    /// Number of records matching the criteria, ignoring pagination
    async fn count_items(&self, criteria: &C) -> Result<u64>;

    /// Insert many records in batches, returning how many were written
    async fn bulk_insert(&self, dtos: &[D]) -> Result<u64>;

    /// Apply the non-null fields of `patch` to every matching record
    async fn bulk_update(&self, patch: &D, criteria: &C) -> Result<u64>;

    /// Delete every matching record
    async fn bulk_delete(&self, criteria: &C) -> Result<u64>;

    /// Release the connection; a no-op when already disconnected
    async fn disconnect(&self) -> Result<()>;

    /// One page of records together with pagination metadata
    async fn get_page(&self, criteria: &C) -> Result<Paginated<D>> {
        let total = self.count_items(criteria).await?;
        let data = self.get_items(criteria).await?;
        let options = QueryOptions::compile(criteria.base());

        Ok(Paginated {
            data,
            pagination: PaginationMeta::from_options(&options, total),
        })
    }

    /// Update the record named by `dto.id()` if it exists, otherwise create it
    async fn upsert_item(&self, dto: &D) -> Result<D> {
        if let Some(id) = dto.id().filter(|id| !id.is_empty()) {
            let criteria = C::for_id(id);
            if self.item_exists(&criteria).await? {
                tracing::debug!(backend = self.backend(), id, "Upsert resolved to update");
                return self.update_item(dto, &criteria).await;
            }
        }
        self.create_item(dto).await
    }
}
