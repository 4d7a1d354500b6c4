//! Shared test harness for repository backend testing
//!
//! Provides the `Person` record and `PersonCriteria` used by every backend
//! suite, plus helpers for building test data.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod repository_harness;
//! use repository_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod contract_tests;

use critere::prelude::*;

// ---------------------------------------------------------------------------
// Person: the record type every suite stores
// ---------------------------------------------------------------------------

impl_dto!(Person, {
    name: Option<String>,
    age: Option<i64>,
    email: Option<String>,
    tags: Option<Vec<String>>,
    deleted_at: Option<DateTime<Utc>>,
    code: Option<String>,
});

impl_criteria!(
    PersonCriteria,
    search = ["name", "email"],
    {
        name: String => eq "name",
        name_like: String => like "name",
        names: Vec<String> => any_of "name",
        email: String => eq "email",
        age: i64 => eq "age",
        age_min: i64 => min "age",
        age_max: i64 => max "age",
        code: String => eq "code",
    }
);

/// Field every suite configures as the soft-delete marker
pub const SOFT_DELETE_FIELD: &str = "deletedAt";

/// Well-formed identifier that no backend will ever assign
///
/// Valid as an ObjectId, and compared as text by the other backends.
pub const ABSENT_ID: &str = "507f1f77bcf86cd799439011";

/// A person with a name and an age
pub fn person(name: &str, age: i64) -> Person {
    Person::new(Some(name.to_string()), Some(age), None, None, None, None)
}

/// A person with a name, an age and an email
pub fn person_with_email(name: &str, age: i64, email: &str) -> Person {
    Person::new(
        Some(name.to_string()),
        Some(age),
        Some(email.to_string()),
        None,
        None,
        None,
    )
}

/// A person whose `code` is the given text
pub fn person_with_code(name: &str, code: &str) -> Person {
    let mut person = person(name, 0);
    person.code = Some(code.to_string());
    person
}

/// A patch that only touches the given fields
pub fn patch() -> Person {
    Person::new(None, None, None, None, None, None)
}

/// Criteria selecting one record by id
pub fn by_id(id: &str) -> PersonCriteria {
    PersonCriteria::for_id(id)
}

/// The id of a stored record
pub fn id_of(person: &Person) -> String {
    person.id.clone().expect("stored record must have an id")
}

/// Ages of the given records, in order
pub fn ages(people: &[Person]) -> Vec<i64> {
    people.iter().filter_map(|p| p.age).collect()
}

/// Names of the given records, sorted
pub fn sorted_names(people: &[Person]) -> Vec<String> {
    let mut names: Vec<String> = people.iter().filter_map(|p| p.name.clone()).collect();
    names.sort();
    names
}

/// Surface repository logs when `RUST_LOG` is set
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
