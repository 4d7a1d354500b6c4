//! Macro-generated test suite for `DataRepository<Person, PersonCriteria>`
//! contract validation.
//!
//! The `repository_contract_tests!` macro generates a test module that
//! validates any repository against the full contract: the strict criteria
//! rule, CRUD round trips, literal pattern matching, ranges, pagination,
//! bulk operations, the soft-delete guard and connection lifecycle.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod repository_harness;
//!
//! use repository_harness::*;
//!
//! repository_contract_tests!(in_memory_repository());
//! ```
//!
//! `$factory` is re-evaluated for each test and must yield an empty
//! repository configured with [`SOFT_DELETE_FIELD`](super::SOFT_DELETE_FIELD)
//! as its soft-delete field.

/// Generate a full `DataRepository<Person, PersonCriteria>` conformance suite.
#[macro_export]
macro_rules! repository_contract_tests {
    ($factory:expr) => {
        mod repository_contract_tests {
            use super::*;
            use critere::core::RepositoryError;
            use critere::prelude::*;
            use std::sync::Arc;
            use std::time::Duration;

            /// Stored timestamps can be millisecond-precision
            async fn tick() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }

            async fn seed<R>(repo: &R, people: &[Person]) -> Vec<Person>
            where
                R: DataRepository<Person, PersonCriteria>,
            {
                let mut stored = Vec::with_capacity(people.len());
                for p in people {
                    stored.push(repo.create_item(p).await.unwrap());
                }
                stored
            }

            // ==================================================================
            // Strict rule
            // ==================================================================

            #[tokio::test]
            async fn test_empty_criteria_return_whole_collection() {
                let repo = $factory;
                seed(&repo, &[person("A", 1), person("B", 2), person("C", 3)]).await;

                let all = repo.get_items(&PersonCriteria::default()).await.unwrap();
                assert_eq!(all.len(), 3);
                assert_eq!(repo.count_items(&PersonCriteria::default()).await.unwrap(), 3);
            }

            #[tokio::test]
            async fn test_single_record_operations_require_criteria() {
                let repo = $factory;
                seed(&repo, &[person("A", 1)]).await;
                let empty = PersonCriteria::default();

                let results = vec![
                    repo.get_item(&empty).await.map(|_| ()),
                    repo.update_item(&person("B", 2), &empty).await.map(|_| ()),
                    repo.delete_item(&empty).await.map(|_| ()),
                    repo.item_exists(&empty).await.map(|_| ()),
                    repo.bulk_update(&patch(), &empty).await.map(|_| ()),
                    repo.bulk_delete(&empty).await.map(|_| ()),
                ];
                for result in results {
                    assert!(
                        matches!(result, Err(RepositoryError::Validation { .. })),
                        "expected a validation error, got {:?}",
                        result
                    );
                }

                // Nothing was touched
                let all = repo.get_items(&empty).await.unwrap();
                assert_eq!(sorted_names(&all), vec!["A"]);
            }

            #[tokio::test]
            async fn test_pagination_alone_is_not_criteria() {
                let repo = $factory;
                let mut criteria = PersonCriteria::default();
                criteria.base.page = Some(1);
                criteria.base.page_size = Some(10);
                criteria.base.sort = Some("age".to_string());

                let err = repo.delete_item(&criteria).await.unwrap_err();
                assert_eq!(err.error_code(), "VALIDATION_ERROR");
            }

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_create_assigns_identity_and_equal_timestamps() {
                let repo = $factory;
                let created = repo
                    .create_item(&person("Bob", 25).with_id("caller-chosen"))
                    .await
                    .unwrap();

                let id = id_of(&created);
                assert!(!id.is_empty());
                assert_ne!(id, "caller-chosen");
                assert!(created.created_at.is_some());
                assert_eq!(created.created_at, created.updated_at);
                assert_eq!(created.name.as_deref(), Some("Bob"));
                assert_eq!(created.age, Some(25));
            }

            #[tokio::test]
            async fn test_create_then_get_round_trip() {
                let repo = $factory;
                let created = repo
                    .create_item(&person_with_email("Alice", 30, "alice@test.com"))
                    .await
                    .unwrap();

                let fetched = repo.get_item(&by_id(&id_of(&created))).await.unwrap();
                assert_eq!(fetched, created);
            }

            #[tokio::test]
            async fn test_get_item_not_found() {
                let repo = $factory;
                seed(&repo, &[person("A", 1)]).await;

                let err = repo.get_item(&by_id(ABSENT_ID)).await.unwrap_err();
                assert!(matches!(err, RepositoryError::NotFound { .. }), "got {:?}", err);
            }

            #[tokio::test]
            async fn test_update_keeps_identity_and_created_at() {
                let repo = $factory;
                let created = repo.create_item(&person("Bob", 25)).await.unwrap();
                let id = id_of(&created);
                tick().await;

                let mut changes = patch().with_id("ignored");
                changes.age = Some(26);
                let updated = repo.update_item(&changes, &by_id(&id)).await.unwrap();

                assert_eq!(updated.id.as_deref(), Some(id.as_str()));
                assert_eq!(updated.age, Some(26));
                assert_eq!(updated.name.as_deref(), Some("Bob"), "null fields are left untouched");
                assert_eq!(updated.created_at, created.created_at);
                assert!(updated.updated_at > created.updated_at);

                let fetched = repo.get_item(&by_id(&id)).await.unwrap();
                assert_eq!(fetched, updated);
            }

            #[tokio::test]
            async fn test_update_unknown_record_is_not_found() {
                let repo = $factory;
                let err = repo.update_item(&person("X", 1), &by_id(ABSENT_ID)).await.unwrap_err();
                assert!(matches!(err, RepositoryError::NotFound { .. }), "got {:?}", err);
            }

            #[tokio::test]
            async fn test_delete_existing_and_missing() {
                let repo = $factory;
                let created = repo.create_item(&person("Bob", 25)).await.unwrap();
                let id = id_of(&created);

                assert!(!repo.delete_item(&by_id(ABSENT_ID)).await.unwrap());
                assert!(repo.item_exists(&by_id(&id)).await.unwrap());

                assert!(repo.delete_item(&by_id(&id)).await.unwrap());
                assert!(!repo.item_exists(&by_id(&id)).await.unwrap());
                assert!(!repo.delete_item(&by_id(&id)).await.unwrap());
            }

            #[tokio::test]
            async fn test_delete_removes_only_one_match() {
                let repo = $factory;
                seed(&repo, &[person("Twin", 1), person("Twin", 1)]).await;

                let criteria = PersonCriteria {
                    name: Some("Twin".to_string()),
                    ..Default::default()
                };
                assert!(repo.delete_item(&criteria).await.unwrap());
                assert_eq!(repo.count_items(&criteria).await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_ids_select_several_records() {
                let repo = $factory;
                let stored = seed(&repo, &[person("A", 1), person("B", 2), person("C", 3)]).await;

                let mut criteria = PersonCriteria::default();
                criteria.base.ids = Some(vec![id_of(&stored[0]), id_of(&stored[2])]);

                let found = repo.get_items(&criteria).await.unwrap();
                assert_eq!(sorted_names(&found), vec!["A", "C"]);
            }

            // ==================================================================
            // Filters
            // ==================================================================

            #[tokio::test]
            async fn test_like_and_range_scenario() {
                let repo = $factory;
                seed(&repo, &[person("Alice", 30), person("Alicia", 40), person("Bob", 40)]).await;

                let like: PersonCriteria =
                    serde_json::from_value(serde_json::json!({"nameLike": "Alic"})).unwrap();
                let found = repo.get_items(&like).await.unwrap();
                assert_eq!(sorted_names(&found), vec!["Alice", "Alicia"]);

                let narrowed: PersonCriteria =
                    serde_json::from_value(serde_json::json!({"nameLike": "Alic", "ageMin": 35}))
                        .unwrap();
                let found = repo.get_items(&narrowed).await.unwrap();
                assert_eq!(sorted_names(&found), vec!["Alicia"]);
            }

            #[tokio::test]
            async fn test_like_is_case_insensitive() {
                let repo = $factory;
                seed(&repo, &[person("Alice", 30)]).await;

                let criteria = PersonCriteria {
                    name_like: Some("aLIc".to_string()),
                    ..Default::default()
                };
                assert_eq!(repo.get_items(&criteria).await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_like_matches_metacharacters_literally() {
                let repo = $factory;
                seed(
                    &repo,
                    &[
                        person("50%_off", 1),
                        person("500 off", 2),
                        person("a.b", 3),
                        person("axb", 4),
                        person("(x)*", 5),
                        person("xxx", 6),
                        person(r"back\slash", 7),
                        person("backslash", 8),
                    ],
                )
                .await;

                for (pattern, expected) in [
                    ("50%", "50%_off"),
                    ("%_o", "50%_off"),
                    ("a.b", "a.b"),
                    ("(x)*", "(x)*"),
                    (r"k\s", r"back\slash"),
                ] {
                    let criteria = PersonCriteria {
                        name_like: Some(pattern.to_string()),
                        ..Default::default()
                    };
                    let found = repo.get_items(&criteria).await.unwrap();
                    assert_eq!(sorted_names(&found), vec![expected], "pattern {:?}", pattern);
                }
            }

            #[tokio::test]
            async fn test_range_bounds_are_inclusive() {
                let repo = $factory;
                seed(
                    &repo,
                    &[person("A", 20), person("B", 30), person("C", 40), person("D", 50)],
                )
                .await;

                let criteria = PersonCriteria {
                    age_min: Some(30),
                    age_max: Some(40),
                    ..Default::default()
                };
                let found = repo.get_items(&criteria).await.unwrap();
                assert_eq!(found.len(), 2);
                assert!(ages(&found).iter().all(|age| (30..=40).contains(age)));
            }

            #[tokio::test]
            async fn test_any_of_and_exact_match() {
                let repo = $factory;
                seed(&repo, &[person("A", 20), person("B", 30), person("C", 30)]).await;

                let criteria = PersonCriteria {
                    names: Some(vec!["A".to_string(), "C".to_string()]),
                    ..Default::default()
                };
                assert_eq!(
                    sorted_names(&repo.get_items(&criteria).await.unwrap()),
                    vec!["A", "C"]
                );

                let criteria = PersonCriteria {
                    age: Some(30),
                    ..Default::default()
                };
                assert_eq!(repo.count_items(&criteria).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_date_shaped_text_is_kept_verbatim() {
                let repo = $factory;
                let code = "2025-01-01T00:00:00+02:00";
                let created = repo
                    .create_item(&person_with_code("Coded", code))
                    .await
                    .unwrap();
                assert_eq!(created.code.as_deref(), Some(code));

                let criteria = PersonCriteria {
                    code: Some(code.to_string()),
                    ..Default::default()
                };
                let found = repo.get_items(&criteria).await.unwrap();
                assert_eq!(sorted_names(&found), vec!["Coded"]);
                assert_eq!(found[0].code.as_deref(), Some(code));
            }

            #[tokio::test]
            async fn test_empty_string_criteria_are_ignored() {
                let repo = $factory;
                seed(&repo, &[person("A", 20), person("B", 30)]).await;

                let criteria = PersonCriteria {
                    name: Some(String::new()),
                    name_like: Some(String::new()),
                    ..Default::default()
                };
                assert_eq!(repo.get_items(&criteria).await.unwrap().len(), 2);
            }

            #[tokio::test]
            async fn test_search_spans_declared_fields() {
                let repo = $factory;
                seed(
                    &repo,
                    &[
                        person_with_email("Bobby", 20, "first@test.com"),
                        person_with_email("Carol", 30, "bob@test.com"),
                        person_with_email("Dave", 40, "dave@test.com"),
                    ],
                )
                .await;

                let mut criteria = PersonCriteria::default();
                criteria.base.search = Some("BOB".to_string());

                let found = repo.get_items(&criteria).await.unwrap();
                assert_eq!(sorted_names(&found), vec!["Bobby", "Carol"]);
            }

            // ==================================================================
            // Options
            // ==================================================================

            #[tokio::test]
            async fn test_limit_caps_results() {
                let repo = $factory;
                seed(
                    &repo,
                    &[
                        person("A", 1),
                        person("B", 2),
                        person("C", 3),
                        person("D", 4),
                        person("E", 5),
                    ],
                )
                .await;

                let mut criteria = PersonCriteria::default();
                criteria.base.limit = Some(2);
                assert_eq!(repo.get_items(&criteria).await.unwrap().len(), 2);
            }

            #[tokio::test]
            async fn test_sort_and_page() {
                let repo = $factory;
                seed(
                    &repo,
                    &[
                        person("C", 30),
                        person("A", 10),
                        person("E", 50),
                        person("B", 20),
                        person("D", 40),
                    ],
                )
                .await;

                let mut criteria = PersonCriteria::default();
                criteria.base.sort = Some("age".to_string());
                criteria.base.page = Some(2);
                criteria.base.page_size = Some(2);
                assert_eq!(ages(&repo.get_items(&criteria).await.unwrap()), vec![30, 40]);

                criteria.base.sort_direction = Some(SortDirection::Desc);
                assert_eq!(ages(&repo.get_items(&criteria).await.unwrap()), vec![30, 20]);

                let page = repo.get_page(&criteria).await.unwrap();
                assert_eq!(ages(&page.data), vec![30, 20]);
                assert_eq!(page.pagination.total, 5);
                assert_eq!(page.pagination.total_pages, 3);
                assert!(page.pagination.has_next);
                assert!(page.pagination.has_prev);
            }

            #[tokio::test]
            async fn test_explicit_skip_wins_over_page() {
                let repo = $factory;
                seed(&repo, &[person("A", 10), person("B", 20), person("C", 30)]).await;

                let mut criteria = PersonCriteria::default();
                criteria.base.sort = Some("age".to_string());
                criteria.base.page = Some(1);
                criteria.base.page_size = Some(2);
                criteria.base.skip = Some(1);
                assert_eq!(ages(&repo.get_items(&criteria).await.unwrap()), vec![20, 30]);

                criteria.base.page = None;
                criteria.base.page_size = None;
                criteria.base.skip = Some(2);
                assert_eq!(ages(&repo.get_items(&criteria).await.unwrap()), vec![30]);
            }

            // ==================================================================
            // Supplemented operations
            // ==================================================================

            #[tokio::test]
            async fn test_upsert_creates_then_updates() {
                let repo = $factory;
                let created = repo.upsert_item(&person("Eve", 30)).await.unwrap();
                let id = id_of(&created);
                tick().await;

                let mut changes = patch().with_id(id.clone());
                changes.age = Some(31);
                let updated = repo.upsert_item(&changes).await.unwrap();

                assert_eq!(updated.id.as_deref(), Some(id.as_str()));
                assert_eq!(updated.age, Some(31));
                assert_eq!(repo.count_items(&PersonCriteria::default()).await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_bulk_insert_update_delete() {
                let repo = $factory;
                assert_eq!(repo.bulk_insert(&[]).await.unwrap(), 0);

                let inserted = repo
                    .bulk_insert(&[
                        person("A", 10),
                        person_with_email("B", 20, "b@test.com"),
                        person("C", 30),
                    ])
                    .await
                    .unwrap();
                assert_eq!(inserted, 3);

                let adults = PersonCriteria {
                    age_min: Some(20),
                    ..Default::default()
                };
                let mut changes = patch();
                changes.email = Some("adult@test.com".to_string());
                assert_eq!(repo.bulk_update(&changes, &adults).await.unwrap(), 2);

                let tagged = PersonCriteria {
                    email: Some("adult@test.com".to_string()),
                    ..Default::default()
                };
                assert_eq!(sorted_names(&repo.get_items(&tagged).await.unwrap()), vec!["B", "C"]);

                // Rewriting the same values still counts every matched record
                assert_eq!(repo.bulk_update(&changes, &adults).await.unwrap(), 2);

                assert_eq!(repo.bulk_delete(&adults).await.unwrap(), 2);
                let rest = repo.get_items(&PersonCriteria::default()).await.unwrap();
                assert_eq!(sorted_names(&rest), vec!["A"]);
            }

            // ==================================================================
            // Soft delete
            // ==================================================================

            #[tokio::test]
            async fn test_soft_deleted_records_are_hidden() {
                let repo = $factory;
                let stored = seed(&repo, &[person("Kept", 1), person("Gone", 2)]).await;
                let gone = id_of(&stored[1]);

                let mut changes = patch();
                changes.deleted_at = Some(Utc::now());
                repo.update_item(&changes, &by_id(&gone)).await.unwrap();

                let visible = repo.get_items(&PersonCriteria::default()).await.unwrap();
                assert_eq!(sorted_names(&visible), vec!["Kept"]);
                assert!(!repo.item_exists(&by_id(&gone)).await.unwrap());

                let mut criteria = by_id(&gone);
                criteria.base.include_deleted = Some(true);
                let restored = repo.get_item(&criteria).await.unwrap();
                assert!(restored.deleted_at.is_some());

                let mut all = PersonCriteria::default();
                all.base.include_deleted = Some(true);
                assert_eq!(repo.count_items(&all).await.unwrap(), 2);
            }

            // ==================================================================
            // Lifecycle & concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_initialize_and_disconnect_are_idempotent() {
                let repo = $factory;
                repo.initialize().await.unwrap();
                repo.initialize().await.unwrap();
                repo.create_item(&person("A", 1)).await.unwrap();

                repo.disconnect().await.unwrap();
                repo.disconnect().await.unwrap();

                // Reconnects lazily
                let all = repo.get_items(&PersonCriteria::default()).await.unwrap();
                assert_eq!(sorted_names(&all), vec!["A"]);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn test_concurrent_creates() {
                let repo = Arc::new($factory);

                let handles: Vec<_> = (0..4)
                    .map(|i| {
                        let repo = Arc::clone(&repo);
                        tokio::spawn(async move {
                            repo.create_item(&person(&format!("P{}", i), i)).await
                        })
                    })
                    .collect();

                let results = tokio::time::timeout(Duration::from_secs(30), async {
                    futures::future::join_all(handles).await
                })
                .await
                .expect("concurrent creates timed out");

                for result in results {
                    result.unwrap().unwrap();
                }
                assert_eq!(repo.count_items(&PersonCriteria::default()).await.unwrap(), 4);
            }
        }
    };
}
