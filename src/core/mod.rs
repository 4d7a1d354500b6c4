//! Core module containing the criteria model, compilers and repository contract

pub mod criteria;
pub mod error;
pub mod field;
pub mod filter;
pub mod format;
pub mod query;
pub mod repository;

pub use criteria::{BaseCriteria, Criteria, SortDirection};
pub use error::{ConfigError, RepositoryError, Result};
pub use field::FieldValue;
pub use filter::{Condition, Filter, FilterBuilder, Predicate, SearchTerm};
pub use query::{Paginated, PaginationMeta, QueryOptions, SortSpec};
pub use repository::{DataRepository, Dto};
