//! Macros for reducing boilerplate when declaring records and criteria
//!
//! These macros generate the struct definitions and trait implementations
//! each entity needs: a [`Dto`](crate::core::Dto) for the stored record and
//! a [`Criteria`](crate::core::Criteria) for selecting records.

/// Declare a record type with the normalized identity and timestamps
///
/// Injects: `id`, `created_at`, `updated_at` (serialized as `id`,
/// `createdAt`, `updatedAt`). All three are owned by the repository: they
/// are `None` until the record has been stored.
///
/// # Example
///
/// ```rust,ignore
/// use critere::prelude::*;
///
/// impl_dto!(User, {
///     name: String,
///     email: Option<String>,
///     age: Option<i64>,
/// });
///
/// let user = User::new("Alice".to_string(), None, Some(30));
/// assert!(user.id.is_none());
/// ```
#[macro_export]
macro_rules! impl_dto {
    (
        $type:ident,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $type {
            /// Normalized identity, assigned by the storage engine
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub id: Option<String>,

            $(
                #[serde(default)]
                pub $field : $field_type,
            )*

            /// When this record was created
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub created_at: Option<::chrono::DateTime<::chrono::Utc>>,

            /// When this record was last written
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub updated_at: Option<::chrono::DateTime<::chrono::Utc>>,
        }

        impl $crate::core::repository::Dto for $type {
            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }
        }

        impl $type {
            /// Create a record that has not been stored yet
            #[allow(clippy::too_many_arguments)]
            pub fn new( $( $field: $field_type ),* ) -> Self {
                Self {
                    id: None,
                    $( $field, )*
                    created_at: None,
                    updated_at: None,
                }
            }

            /// Same record addressed by `id`
            pub fn with_id(mut self, id: impl Into<String>) -> Self {
                self.id = Some(id.into());
                self
            }
        }
    };
}

/// Declare a criteria type for one entity
///
/// Every entry names a struct field, its value type, the predicate it
/// builds and the stored field it targets. Available predicates:
///
/// | op       | predicate                                  |
/// |----------|--------------------------------------------|
/// | `eq`     | exact match (`>=` for dates)               |
/// | `like`   | case-insensitive literal substring         |
/// | `min`    | inclusive lower bound                      |
/// | `max`    | inclusive upper bound                      |
/// | `any_of` | membership in a list                       |
/// | `nested` | element match with another criteria type   |
///
/// The struct flattens [`BaseCriteria`](crate::core::BaseCriteria) and uses
/// camelCase wire names, so `name_like` reads `nameLike` and `age_min`
/// reads `ageMin`. Keys that match no declared field are ignored.
///
/// # Example
///
/// ```rust,ignore
/// impl_criteria!(
///     UserCriteria,
///     search = ["name", "email"],
///     {
///         name: String => eq "name",
///         name_like: String => like "name",
///         age_min: i64 => min "age",
///         age_max: i64 => max "age",
///         roles: Vec<String> => any_of "role",
///     }
/// );
///
/// let criteria: UserCriteria = serde_json::from_value(json!({
///     "nameLike": "alic",
///     "ageMin": 35,
///     "pageSize": 20,
///     "page": 1
/// }))?;
/// ```
#[macro_export]
macro_rules! impl_criteria {
    (
        $type:ident,
        {
            $( $field:ident : $field_type:ty => $op:ident $column:literal ),* $(,)?
        }
    ) => {
        $crate::impl_criteria!(
            $type,
            search = [],
            { $( $field : $field_type => $op $column ),* }
        );
    };

    (
        $type:ident,
        search = [ $( $search_field:literal ),* $(,)? ],
        {
            $( $field:ident : $field_type:ty => $op:ident $column:literal ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Default, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $type {
            /// Shared meta fields (id, pagination, sort, search)
            #[serde(flatten)]
            pub base: $crate::core::criteria::BaseCriteria,

            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field : Option<$field_type>,
            )*
        }

        impl $crate::core::criteria::Criteria for $type {
            fn base(&self) -> &$crate::core::criteria::BaseCriteria {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::core::criteria::BaseCriteria {
                &mut self.base
            }

            #[allow(unused_variables)]
            fn apply(&self, filter: &mut $crate::core::filter::FilterBuilder) {
                $(
                    filter.$op($column, self.$field.as_ref());
                )*
            }

            fn search_fields(&self) -> &'static [&'static str] {
                &[ $( $search_field ),* ]
            }
        }
    };
}
