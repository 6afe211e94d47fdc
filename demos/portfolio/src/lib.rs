//! Portfolio site data model, validated with refract.
//!
//! The model is frozen once per process. Request handlers call [`schema`] and
//! validate raw JSON arguments before anything reaches the database.

pub mod entities;

use once_cell::sync::OnceCell;
use refract::{ModelError, Schema, SchemaOptions};

static SCHEMA: OnceCell<Schema> = OnceCell::new();

/// Page size limit applied to every list query
pub const MAX_PAGE: u64 = 100;

/// Assemble the portfolio model without freezing it
pub fn model() -> refract::SchemaBuilder {
    let builder = Schema::builder().options(SchemaOptions {
        max_take: Some(MAX_PAGE),
        ..SchemaOptions::default()
    });
    let builder = entities::enums(builder);
    let builder = entities::accounts(builder);
    let builder = entities::content(builder);
    entities::resume(builder)
}

/// Build and register the process-wide schema. Later calls return the
/// already-installed schema.
pub fn install() -> Result<&'static Schema, ModelError> {
    SCHEMA.get_or_try_init(|| {
        let schema = model().build()?;
        log::info!(
            "portfolio schema installed with {} entities",
            schema.entities().len()
        );
        Ok(schema)
    })
}

/// The installed schema, if [`install`] has run
pub fn schema() -> Option<&'static Schema> {
    SCHEMA.get()
}
