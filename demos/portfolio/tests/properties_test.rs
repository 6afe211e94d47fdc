use refract::mutation::FieldWrite;
use refract::{ErrorKind, Operation, Schema, ToInput};
use serde_json::{json, Value};

pub mod helpers {
    use super::*;

    pub fn schema() -> &'static Schema {
        let _ = env_logger::builder().is_test(true).try_init();
        portfolio::install().unwrap()
    }

    /// A valid create input for every entity of the model
    pub fn create_samples() -> Vec<(&'static str, Value)> {
        vec![
            (
                "User",
                json!({ "email": "ada@example.com", "name": "Ada", "role": "ADMIN" }),
            ),
            (
                "Account",
                json!({
                    "type": "oauth",
                    "provider": "github",
                    "providerAccountId": "42",
                    "user": { "connect": { "id": "u1" } }
                }),
            ),
            (
                "Session",
                json!({ "sessionToken": "tok", "expires": "2030-01-01T00:00:00Z", "userId": "u1" }),
            ),
            (
                "Blog",
                json!({
                    "title": "Parsing without panics",
                    "slug": "parsing-without-panics",
                    "content": "...",
                    "tags": ["rust", "parsing"],
                    "status": "PUBLISHED",
                    "deletedAt": null,
                    "author": { "connect": { "email": "ada@example.com" } }
                }),
            ),
            (
                "Project",
                json!({
                    "title": "refract",
                    "description": "input validation",
                    "technologies": ["rust"],
                    "featured": true,
                    "owner": { "connect": { "id": "u1" } }
                }),
            ),
            (
                "SkillCategory",
                json!({
                    "name": "Languages",
                    "ownerId": "u1",
                    "skills": { "create": [{ "name": "Rust", "years": 4.5 }, { "name": "SQL" }] }
                }),
            ),
            (
                "Skill",
                json!({
                    "name": "Rust",
                    "level": 5,
                    "years": null,
                    "category": {
                        "connectOrCreate": {
                            "where": { "name": "Languages" },
                            "create": { "name": "Languages", "ownerId": "u1" }
                        }
                    }
                }),
            ),
            (
                "WorkExperience",
                json!({
                    "company": "Acme",
                    "position": "Engineer",
                    "employmentType": "CONTRACT",
                    "startDate": "2021-03-01T00:00:00Z",
                    "highlights": ["Shipped the thing"],
                    "user": { "connect": { "id": "u1" } }
                }),
            ),
        ]
    }

    pub fn blog_scenario(status: &str) -> Value {
        json!({
            "AND": [
                { "status": status },
                { "OR": [{ "title": { "contains": "rust" } }, { "tags": { "hasSome": ["systems"] } }] }
            ]
        })
    }
}

mod round_trip_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_create_replays_as_full_update_for_every_entity() {
        let schema = schema();
        for (entity, raw) in create_samples() {
            let created = schema
                .validate_create(entity, &raw)
                .unwrap_or_else(|e| panic!("{} create rejected: {}", entity, e));
            let updated = schema
                .validate_update(entity, &created.to_update_input())
                .unwrap_or_else(|e| panic!("{} replay rejected: {}", entity, e));

            assert_eq!(updated.fields.len(), created.fields.len(), "{}", entity);
            for (field, value) in &created.fields {
                assert_eq!(
                    updated.field(field),
                    Some(&FieldWrite::Set(value.clone())),
                    "{}.{}",
                    entity,
                    field
                );
            }
            assert_eq!(updated.relations.len(), created.relations.len(), "{}", entity);
        }
    }

    #[test]
    fn test_validated_arguments_render_to_equivalent_input() {
        let schema = schema();
        let raw = json!({
            "where": { "status": "PUBLISHED", "author": { "role": "ADMIN" } },
            "orderBy": [{ "publishedAt": { "sort": "desc", "nulls": "last" } }, { "id": "asc" }],
            "take": 10,
            "include": { "author": { "select": { "name": true, "email": true } } }
        });
        let args = schema.validate(Operation::FindMany, "Blog", &raw).unwrap();
        let replayed = schema
            .validate(Operation::FindMany, "Blog", &args.to_input())
            .unwrap();
        assert_eq!(replayed, args);
    }
}

mod strictness_tests {
    use super::helpers::*;
    use super::*;

    fn assert_single_unknown(result: Result<impl std::fmt::Debug, refract::ValidationErrors>, path: &str) {
        let errors = result.unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField], "{}", errors);
        assert!(errors.at(path).is_some(), "no error at {}: {}", path, errors);
    }

    #[test]
    fn test_one_extra_key_is_one_error() {
        let schema = schema();

        assert_single_unknown(
            schema.validate_where("Blog", &json!({ "status": "DRAFT", "bogus": 1 })),
            "bogus",
        );
        assert_single_unknown(
            schema.validate_where("Blog", &json!({ "title": { "contains": "x", "bogus": 1 } })),
            "title.bogus",
        );
        assert_single_unknown(
            schema.validate_where("Blog", &json!({ "tags": { "has": "x", "bogus": 1 } })),
            "tags.bogus",
        );
        assert_single_unknown(
            schema.validate_where("User", &json!({ "blogs": { "some": {}, "bogus": {} } })),
            "blogs.bogus",
        );
        assert_single_unknown(
            schema.validate_where_unique("Blog", &json!({ "slug": "a", "bogus": 1 })),
            "bogus",
        );
        assert_single_unknown(
            schema.validate_where_unique(
                "Account",
                &json!({ "provider_providerAccountId": { "provider": "github", "providerAccountId": "42", "bogus": 1 } }),
            ),
            "provider_providerAccountId.bogus",
        );
        assert_single_unknown(
            schema.validate_order_by(
                "Blog",
                &json!([{ "field": "createdAt", "sort": "desc", "bogus": 1 }]),
            ),
            "[0].bogus",
        );
        assert_single_unknown(
            schema.validate_update("Project", &json!({ "featured": false, "bogus": 1 })),
            "bogus",
        );
        assert_single_unknown(
            schema.validate_update(
                "Skill",
                &json!({ "category": { "connect": { "name": "Languages" }, "bogus": true } }),
            ),
            "category.bogus",
        );
        assert_single_unknown(
            schema.validate(
                Operation::FindMany,
                "Project",
                &json!({ "where": { "featured": true }, "bogus": 1 }),
            ),
            "bogus",
        );
        assert_single_unknown(
            schema.validate(
                Operation::FindFirst,
                "User",
                &json!({ "select": { "email": true, "bogus": true } }),
            ),
            "select.bogus",
        );
    }

    #[test]
    fn test_one_extra_key_in_every_create() {
        let schema = schema();
        for (entity, raw) in create_samples() {
            let mut raw = raw;
            raw["bogus"] = json!(1);
            assert_single_unknown(schema.validate_create(entity, &raw), "bogus");
        }
    }
}

mod nullability_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_nullable_field_must_be_supplied_at_create() {
        let schema = schema();
        let base = json!({
            "title": "t",
            "slug": "t",
            "content": "c",
            "authorId": "u1"
        });
        let errors = schema.validate_create("Blog", &base).unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::MissingField]);
        assert!(errors.at("deletedAt").is_some());

        let mut with_null = base.clone();
        with_null["deletedAt"] = Value::Null;
        assert!(schema.validate_create("Blog", &with_null).is_ok());
    }

    #[test]
    fn test_nullable_field_accepts_null_set() {
        let schema = schema();
        assert!(schema
            .validate_update("Blog", &json!({ "deletedAt": { "set": null } }))
            .is_ok());
        assert!(schema
            .validate_update("Blog", &json!({ "excerpt": null }))
            .is_ok());

        let errors = schema
            .validate_update("Blog", &json!({ "title": { "set": null } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::TypeMismatch]);
    }

    #[test]
    fn test_optional_field_may_be_omitted() {
        let schema = schema();
        assert!(schema
            .validate_create(
                "WorkExperience",
                &json!({ "company": "Acme", "position": "Engineer", "startDate": "2020-01-01T00:00:00Z", "userId": "u1" })
            )
            .is_ok());
    }
}

mod filter_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_list_filter_consistency() {
        let schema = schema();
        let empty = schema
            .validate_where("Blog", &json!({ "tags": { "isEmpty": true } }))
            .unwrap();
        let equals_empty = schema
            .validate_where("Blog", &json!({ "tags": { "equals": [] } }))
            .unwrap();
        let both = schema
            .validate_where("Blog", &json!({ "tags": { "isEmpty": true, "equals": [] } }))
            .unwrap();
        assert_eq!(empty, equals_empty);
        assert_eq!(empty, both);

        let errors = schema
            .validate_where("Blog", &json!({ "tags": { "isEmpty": true, "equals": ["x"] } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::ConstraintViolation]);
    }

    #[test]
    fn test_blog_scenario() {
        let schema = schema();
        assert!(schema
            .validate_where("Blog", &blog_scenario("PUBLISHED"))
            .is_ok());

        let errors = schema
            .validate_where("Blog", &blog_scenario("ARCHIVED"))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        let error = errors.at("AND[0].status").unwrap();
        assert_eq!(error.kind, ErrorKind::EnumDomainViolation);
        assert_eq!(error.value, json!("ARCHIVED"));
    }

    #[test]
    fn test_soft_deleted_filter() {
        let schema = schema();
        assert!(schema
            .validate(
                Operation::Count,
                "Blog",
                &json!({ "where": { "deletedAt": null, "author": { "is": { "role": "ADMIN" } } } }),
            )
            .is_ok());
    }
}

mod identity_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_compound_key_atomicity() {
        let schema = schema();
        let errors = schema
            .validate_where_unique(
                "Account",
                &json!({ "provider_providerAccountId": { "provider": "github" } }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnionMismatch]);

        let a = schema
            .validate_where_unique(
                "Account",
                &json!({ "provider_providerAccountId": { "provider": "github", "providerAccountId": "42" } }),
            )
            .unwrap();
        let b = schema
            .validate_where_unique(
                "Account",
                &json!({ "provider_providerAccountId": { "providerAccountId": "42", "provider": "github" } }),
            )
            .unwrap();
        assert_eq!(a, b);

        assert!(schema
            .validate_where_unique(
                "Skill",
                &json!({ "categoryId_name": { "categoryId": "c1", "name": "Rust" } })
            )
            .is_ok());
        let errors = schema
            .validate_where_unique("Skill", &json!({ "name": "Rust" }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnionMismatch]);
    }
}

mod paging_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_cursor_order_coupling() {
        let schema = schema();
        let errors = schema
            .validate(
                Operation::FindMany,
                "Blog",
                &json!({ "cursor": { "id": "abc" }, "take": 5 }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::AmbiguousCursor]);

        assert!(schema
            .validate(
                Operation::FindMany,
                "Blog",
                &json!({
                    "cursor": { "id": "abc" },
                    "take": 5,
                    "orderBy": [{ "field": "createdAt", "sort": "desc" }]
                }),
            )
            .is_ok());
    }

    #[test]
    fn test_page_size_is_bounded() {
        let schema = schema();
        let errors = schema
            .validate(Operation::FindMany, "Project", &json!({ "take": 500 }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::ConstraintViolation]);
    }

    #[test]
    fn test_blog_stats_by_status() {
        let schema = schema();
        assert!(schema
            .validate(
                Operation::GroupBy,
                "Blog",
                &json!({
                    "by": ["status"],
                    "where": { "deletedAt": null },
                    "_count": { "_all": true },
                    "_sum": { "views": true },
                    "having": { "views": { "_sum": { "gt": 100 } } },
                    "orderBy": { "_sum": { "views": "desc" } }
                }),
            )
            .is_ok());
    }
}

mod concurrency_tests {
    use super::helpers::*;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_validation_is_shared_and_deterministic_across_threads() {
        let schema = schema();
        let expected = schema
            .validate_where("Blog", &blog_scenario("ARCHIVED"))
            .unwrap_err();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..50)
                            .map(|_| schema.validate_where("Blog", &blog_scenario("ARCHIVED")))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                for result in handle.join().unwrap() {
                    assert_eq!(result.unwrap_err(), expected);
                }
            }
        });
    }

    #[test]
    fn test_owned_schema_behind_arc() {
        let schema = Arc::new(portfolio::model().build().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let schema = Arc::clone(&schema);
                std::thread::spawn(move || {
                    schema
                        .validate(
                            Operation::FindMany,
                            "Skill",
                            &json!({ "where": { "level": { "gte": i } }, "orderBy": { "level": "desc" } }),
                        )
                        .is_ok()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
