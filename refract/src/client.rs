//! Hand-off to the storage engine. Only validated arguments ever cross this boundary.

use crate::args::{Operation, ValidatedArgs};
use crate::error::{RequestError, StorageError};
use crate::model::Schema;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// What the storage engine returns for one request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Rows(Vec<Value>),
    /// `None` when a point lookup matched nothing
    Row(Option<Value>),
    /// Affected or counted rows
    Count(u64),
    Aggregate(Value),
}

/// External engine executing validated requests.
///
/// Data-level constraints the shape grammar cannot express, such as cross-row
/// uniqueness, are the engine's to detect and report through [`StorageError`].
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn execute(&self, args: ValidatedArgs) -> Result<Outcome, StorageError>;
}

pub struct Client<E> {
    schema: Arc<Schema>,
    engine: Arc<E>,
}

impl<E> Clone for Client<E> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<E: StorageEngine> Client<E> {
    pub fn new(schema: Arc<Schema>, engine: E) -> Self {
        Self {
            schema,
            engine: Arc::new(engine),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Accessor for one entity, e.g. `client.entity("blog").find_many(...)`
    pub fn entity<'c>(&'c self, name: &'c str) -> EntityClient<'c, E> {
        EntityClient { client: self, name }
    }

    /// Validate `raw` and hand the result to the engine. Invalid input never reaches
    /// the engine; engine failures are returned as they were reported.
    pub async fn request(
        &self,
        operation: Operation,
        entity: &str,
        raw: &Value,
    ) -> Result<Outcome, RequestError> {
        let args = self.schema.validate(operation, entity, raw)?;
        log::debug!("executing {} on {}", operation, args.entity);
        let outcome = self.engine.execute(args).await?;
        match (operation, outcome) {
            (Operation::FindUniqueOrThrow | Operation::FindFirstOrThrow, Outcome::Row(None)) => {
                Err(StorageError::not_found(format!("{} found no {} row", operation, entity)).into())
            }
            (_, outcome) => Ok(outcome),
        }
    }
}

/// Operations of one entity
pub struct EntityClient<'c, E> {
    client: &'c Client<E>,
    name: &'c str,
}

impl<E: StorageEngine> EntityClient<'_, E> {
    async fn run(&self, operation: Operation, raw: Value) -> Result<Outcome, RequestError> {
        self.client.request(operation, self.name, &raw).await
    }

    pub async fn find_unique(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::FindUnique, raw).await
    }

    pub async fn find_unique_or_throw(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::FindUniqueOrThrow, raw).await
    }

    pub async fn find_first(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::FindFirst, raw).await
    }

    pub async fn find_first_or_throw(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::FindFirstOrThrow, raw).await
    }

    pub async fn find_many(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::FindMany, raw).await
    }

    pub async fn count(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::Count, raw).await
    }

    pub async fn aggregate(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::Aggregate, raw).await
    }

    pub async fn group_by(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::GroupBy, raw).await
    }

    pub async fn create(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::Create, raw).await
    }

    pub async fn create_many(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::CreateMany, raw).await
    }

    pub async fn update(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::Update, raw).await
    }

    pub async fn update_many(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::UpdateMany, raw).await
    }

    pub async fn upsert(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::Upsert, raw).await
    }

    pub async fn delete(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::Delete, raw).await
    }

    pub async fn delete_many(&self, raw: Value) -> Result<Outcome, RequestError> {
        self.run(Operation::DeleteMany, raw).await
    }
}
