use async_trait::async_trait;
use refract::model::DefaultValue;
use refract::{
    Client, ErrorKind, FieldKind, Operation, Outcome, Payload, RequestError, Schema,
    StorageEngine, StorageError, StorageErrorKind, ValidatedArgs,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

pub mod helpers {
    use super::*;

    /// Engine that records every request and answers with a fixed outcome
    pub struct RecordingEngine {
        pub calls: Mutex<Vec<ValidatedArgs>>,
        pub reply: Result<Outcome, StorageError>,
    }

    impl RecordingEngine {
        pub fn replying(reply: Result<Outcome, StorageError>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StorageEngine for RecordingEngine {
        async fn execute(&self, args: ValidatedArgs) -> Result<Outcome, StorageError> {
            self.calls.lock().unwrap().push(args);
            self.reply.clone()
        }
    }

    pub fn schema() -> Arc<Schema> {
        let _ = env_logger::builder().is_test(true).try_init();
        let schema = Schema::builder()
            .entity("SkillCategory", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("name", FieldKind::String).unique();
                e.relation("skills", "Skill").many();
            })
            .entity("Skill", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("name", FieldKind::String);
                e.field("level", FieldKind::Int);
                e.field("categoryId", FieldKind::Int);
                e.relation("category", "SkillCategory")
                    .fields(["categoryId"])
                    .references(["id"]);
                e.unique(["categoryId", "name"]);
            })
            .build()
            .unwrap();
        Arc::new(schema)
    }

    pub fn client(reply: Result<Outcome, StorageError>) -> Client<RecordingEngine> {
        Client::new(schema(), RecordingEngine::replying(reply))
    }
}

mod client_tests {
    use super::helpers::*;
    use super::*;

    #[tokio::test]
    async fn test_valid_request_reaches_engine() {
        // Setup
        let client = client(Ok(Outcome::Rows(vec![json!({ "id": 1, "name": "Rust" })])));

        let outcome = client
            .entity("skill")
            .find_many(json!({ "where": { "level": { "gte": 3 } }, "orderBy": { "level": "desc" } }))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Rows(rows) if rows.len() == 1));
        let calls = client.engine().calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::FindMany);
        assert_eq!(calls[0].entity, "Skill");
        assert_eq!(calls[0].order_by.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_engine() {
        let client = client(Ok(Outcome::Count(0)));

        let err = client
            .entity("skill")
            .create(json!({ "data": { "name": "Rust", "level": "high" } }))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        let errors = err.validation_errors().unwrap();
        assert!(errors.at("data.level").is_some());
        assert!(errors.has(ErrorKind::MissingField));
        assert_eq!(client.engine().call_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_errors_pass_through() {
        let client = client(Err(StorageError::unique_constraint(
            "Skill(categoryId, name) already exists",
        )));

        let err = client
            .entity("skill")
            .create(json!({ "data": { "name": "Rust", "level": 3, "categoryId": 1 } }))
            .await
            .unwrap_err();

        match err {
            RequestError::Storage(storage) => {
                assert_eq!(storage.kind, StorageErrorKind::UniqueConstraint);
            }
            other => panic!("expected a storage error, got {:?}", other),
        }
        assert_eq!(client.engine().call_count(), 1);
    }

    #[tokio::test]
    async fn test_or_throw_turns_empty_row_into_not_found() {
        let client = client(Ok(Outcome::Row(None)));

        let err = client
            .entity("skillCategory")
            .find_unique_or_throw(json!({ "where": { "name": "Languages" } }))
            .await
            .unwrap_err();
        match err {
            RequestError::Storage(storage) => {
                assert_eq!(storage.kind, StorageErrorKind::RecordNotFound)
            }
            other => panic!("expected not found, got {:?}", other),
        }

        let outcome = client
            .entity("skillCategory")
            .find_unique(json!({ "where": { "name": "Languages" } }))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Row(None));
    }

    #[tokio::test]
    async fn test_operation_specific_payloads() {
        let client = client(Ok(Outcome::Aggregate(json!({ "_avg": { "level": 2.5 } }))));

        client
            .entity("skill")
            .aggregate(json!({ "_avg": { "level": true }, "where": { "category": { "name": "Languages" } } }))
            .await
            .unwrap();
        client
            .entity("skill")
            .upsert(json!({
                "where": { "categoryId_name": { "categoryId": 1, "name": "Rust" } },
                "create": { "name": "Rust", "level": 1, "category": { "connect": { "id": 1 } } },
                "update": { "level": { "increment": 1 } }
            }))
            .await
            .unwrap();

        let calls = client.engine().calls.lock().unwrap();
        assert!(matches!(calls[0].payload, Some(Payload::Aggregate(_))));
        assert!(matches!(calls[1].payload, Some(Payload::Upsert { .. })));
        assert!(calls[1].unique.is_some());
    }

    #[tokio::test]
    async fn test_unknown_entity_is_a_validation_error() {
        let client = client(Ok(Outcome::Count(0)));
        let err = client
            .request(Operation::Count, "Project", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.validation_errors().unwrap().kinds(),
            vec![ErrorKind::UnknownField]
        );
    }

    #[tokio::test]
    async fn test_clients_share_one_schema_across_tasks() {
        let client = client(Ok(Outcome::Count(3)));

        let mut handles = Vec::new();
        for level in 0..8 {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                client
                    .entity("skill")
                    .count(json!({ "where": { "level": level } }))
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Outcome::Count(3));
        }
        assert_eq!(client.engine().call_count(), 8);
    }
}
