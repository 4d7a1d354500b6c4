//! Search criteria shared by every entity
//!
//! Each entity declares its own criteria struct (usually with
//! [`impl_criteria!`](crate::impl_criteria)) that flattens [`BaseCriteria`]
//! and enumerates its filterable fields through [`Criteria::apply`].
//! Nothing iterates unknown keys at runtime: only declared fields can ever
//! become predicates.
//!
//! # Wire shape
//!
//! ```json
//! {
//!     "nameLike": "alic",
//!     "ageMin": 35,
//!     "page": 2,
//!     "pageSize": 20,
//!     "sort": "age",
//!     "sortDirection": "desc"
//! }
//! ```

use crate::core::filter::FilterBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Asc,
    /// Sort in descending order (Z-A, 9-0)
    Desc,
}

impl SortDirection {
    /// Numeric form used by document stores (`1` / `-1`)
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    /// SQL keyword
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

// Accepts "asc"/"desc" in any case as well as the numeric 1 / -1 form.
impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) if s.eq_ignore_ascii_case("asc") => Ok(SortDirection::Asc),
            Raw::Text(s) if s.eq_ignore_ascii_case("desc") => Ok(SortDirection::Desc),
            Raw::Number(n) if n >= 0 => Ok(SortDirection::Asc),
            Raw::Number(_) => Ok(SortDirection::Desc),
            Raw::Text(other) => Err(serde::de::Error::custom(format!(
                "invalid sort direction '{}', expected 'asc' or 'desc'",
                other
            ))),
        }
    }
}

/// Criteria fields common to every entity
///
/// These are meta fields: apart from `id`, `ids` and `search` they never
/// become filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaseCriteria {
    /// Single primary-key lookup
    pub id: Option<String>,

    /// Primary-key membership lookup
    pub ids: Option<Vec<String>>,

    /// Free-text token matched against the entity's search fields
    pub search: Option<String>,

    /// Page number (starts at 1)
    pub page: Option<u64>,

    /// Number of items per page
    pub page_size: Option<u64>,

    /// Explicit number of records to skip (wins over `page`)
    pub skip: Option<u64>,

    /// Explicit maximum number of records (wins over `page_size`)
    pub limit: Option<u64>,

    /// Field to sort on
    pub sort: Option<String>,

    /// Sort direction, ascending unless stated otherwise
    pub sort_direction: Option<SortDirection>,

    /// Include soft-deleted records in reads
    pub include_deleted: Option<bool>,
}

impl BaseCriteria {
    /// Criteria targeting a single record by id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn includes_deleted(&self) -> bool {
        self.include_deleted.unwrap_or(false)
    }
}

/// Trait implemented by every entity criteria type
///
/// `apply` pushes one builder call per declared field; the builder skips
/// absent, null and empty values so implementations never need to check.
///
/// # Example
///
/// ```rust,ignore
/// impl Criteria for UserCriteria {
///     fn base(&self) -> &BaseCriteria {
///         &self.base
///     }
///
///     fn base_mut(&mut self) -> &mut BaseCriteria {
///         &mut self.base
///     }
///
///     fn apply(&self, filter: &mut FilterBuilder) {
///         filter.eq("name", self.name.as_ref());
///         filter.like("name", self.name_like.as_ref());
///         filter.min("age", self.age_min.as_ref());
///     }
/// }
/// ```
pub trait Criteria: Send + Sync {
    /// The shared meta fields
    fn base(&self) -> &BaseCriteria;

    fn base_mut(&mut self) -> &mut BaseCriteria;

    /// Push one predicate per declared, populated field
    fn apply(&self, filter: &mut FilterBuilder);

    /// Fields scanned by the free-text `search` token
    fn search_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Criteria matching exactly one record by id, every other field unset
    fn for_id(id: impl Into<String>) -> Self
    where
        Self: Default + Sized,
    {
        let mut criteria = Self::default();
        criteria.base_mut().id = Some(id.into());
        criteria
    }
}

impl Criteria for BaseCriteria {
    fn base(&self) -> &BaseCriteria {
        self
    }

    fn base_mut(&mut self) -> &mut BaseCriteria {
        self
    }

    fn apply(&self, _filter: &mut FilterBuilder) {}
}
