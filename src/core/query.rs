//! Query options (skip / limit / sort) and pagination utilities

use crate::core::criteria::{BaseCriteria, SortDirection};
use serde::Serialize;

/// Sort order for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Backend-neutral query options compiled from criteria
///
/// # Precedence
///
/// Explicit `skip` / `limit` always win over values derived from
/// `page` / `page_size`, field by field:
///
/// - `limit` = `limit`, else `page_size` when `page` is also present
/// - `skip` = `skip`, else `(page - 1) * page_size` when both are present
///
/// A `page` below 1 is treated as page 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
}

impl QueryOptions {
    pub fn compile(criteria: &BaseCriteria) -> Self {
        let page = criteria.page.map(|p| p.max(1));

        let limit = criteria
            .limit
            .or_else(|| page.and(criteria.page_size));

        let skip = criteria.skip.or_else(|| match (page, criteria.page_size) {
            (Some(page), Some(size)) => Some((page - 1).saturating_mul(size)),
            _ => None,
        });

        let sort = criteria
            .sort
            .as_deref()
            .filter(|field| !field.is_empty())
            .map(|field| SortSpec {
                field: field.to_string(),
                direction: criteria.sort_direction.unwrap_or_default(),
            });

        Self { skip, limit, sort }
    }

    /// Skip value to send to the backend, omitting a no-op zero
    pub fn effective_skip(&self) -> Option<u64> {
        self.skip.filter(|s| *s > 0)
    }
}

/// Paginated response structure
///
/// This structure wraps paginated data with metadata about pagination state.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u64,

    /// Number of items per page
    pub limit: u64,

    /// Total number of items (after filters)
    pub total: u64,

    /// Total number of pages
    pub total_pages: u64,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        // Ensure limit is at least 1 to avoid division by zero
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1).saturating_mul(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }

    /// Derive metadata from compiled options and a total count
    ///
    /// Without any limit the whole result set is a single page.
    pub fn from_options(options: &QueryOptions, total: u64) -> Self {
        match options.limit {
            Some(limit) if limit > 0 => {
                let page = (options.skip.unwrap_or(0) / limit).saturating_add(1);
                Self::new(page, limit, total)
            }
            _ => Self::new(1, total.max(1), total),
        }
    }
}
