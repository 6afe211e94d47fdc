//! Typed query and mutation input validation for relational entity models.
//!
//! A model description is frozen once into a [`Schema`]; every call afterwards is a
//! pure function from an operation and a raw JSON input to either
//! [`ValidatedArgs`] or the complete list of [`ValidationErrors`].

pub mod aggregate;
pub mod args;
pub mod client;
pub mod config;
pub mod constants;
mod context;
pub mod enums;
pub mod error;
pub mod filter;
pub mod model;
pub mod mutation;
pub mod order;
pub mod path;
pub mod predicate;
pub mod projection;
pub mod render;
pub mod unique;
pub mod value;

pub use aggregate::{AggregateOp, AggregateSelection, CountSelection, GroupBy, Having};
pub use args::{Operation, Payload, UnknownOperation, ValidatedArgs};
pub use client::{Client, EntityClient, Outcome, StorageEngine};
pub use config::SchemaOptions;
pub use enums::{NullsOrder, QueryMode, SortOrder};
pub use error::{
    ErrorKind, ModelError, RequestError, StorageError, StorageErrorKind, ValidationError,
    ValidationErrors,
};
pub use filter::{FieldFilter, ListFilter, ScalarFilter};
pub use model::{
    Cardinality, Entity, FieldDef, FieldKind, ModelDef, RelationDef, Schema, SchemaBuilder,
};
pub use mutation::{CreateData, FieldValue, FieldWrite, NestedWrite, UpdateData};
pub use order::{OrderClause, OrderTarget, Pagination};
pub use path::FieldPath;
pub use predicate::{Condition, Predicate, RelationFilter};
pub use projection::Projection;
pub use render::ToInput;
pub use unique::{Identity, UniqueWhere};
pub use value::ScalarValue;
