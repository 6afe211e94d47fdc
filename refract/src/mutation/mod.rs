//! Create and update payloads, with nested writes through relations.

pub mod create;
pub mod nested;
pub mod update;

pub use create::CreateData;
pub use nested::{ConnectOrCreate, NestedOp, NestedUpdate, NestedUpsert, NestedWrite, Target};
pub use update::{FieldWrite, UpdateData};

use crate::context::{Ctx, Object};
use crate::model::{Entity, Field, Relation, Schema};
use crate::value::{coerce_field, coerce_list, ScalarValue};
use heck::ToPascalCase;
use serde_json::Value;

/// A value written to a column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.to_json(),
            Self::List(items) => Value::Array(items.iter().map(ScalarValue::to_json).collect()),
        }
    }
}

/// A nested payload leaves out the relation back to its parent and that relation's
/// foreign key fields, since the parent supplies both.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Omit<'a> {
    relation: Option<&'a Relation>,
}

impl<'a> Omit<'a> {
    pub(crate) fn none() -> Self {
        Self { relation: None }
    }

    /// Omission for a payload written through `parent`
    pub(crate) fn back(schema: &'a Schema, parent: &Relation) -> Self {
        Self {
            relation: schema.opposite(parent),
        }
    }

    pub(crate) fn covers(&self, key: &str) -> bool {
        self.relation
            .is_some_and(|r| r.name == key || r.fields.iter().any(|f| f == key))
    }

    /// Shape name such as `BlogCreateWithoutAuthorInput`
    pub(crate) fn shape(&self, entity: &Entity, kind: &str) -> String {
        match self.relation {
            Some(relation) => format!(
                "{}{}Without{}Input",
                entity.name,
                kind,
                relation.name.to_pascal_case()
            ),
            None => Schema::shape_name(entity, &format!("{}Input", kind)),
        }
    }

    pub(crate) fn without(&self) -> String {
        match self.relation {
            Some(relation) => format!("Without{}", relation.name.to_pascal_case()),
            None => String::new(),
        }
    }
}

/// A full column value: a scalar literal, or an array for list columns
pub(crate) fn parse_field_value(
    ctx: &mut Ctx<'_>,
    field: &Field,
    value: &Value,
) -> Option<FieldValue> {
    if !field.list {
        return coerce_field(ctx, field, value).map(FieldValue::Scalar);
    }
    match value {
        Value::Null if field.nullable => Some(FieldValue::Scalar(ScalarValue::Null)),
        _ => coerce_list(ctx, field.kind, value).map(FieldValue::List),
    }
}

/// Reject payloads that set a foreign key directly and also write the relation it belongs to
pub(crate) fn check_foreign_key_writes(ctx: &mut Ctx<'_>, entity: &Entity, map: &Object) -> bool {
    let mut ok = true;
    for relation in entity.relations.iter().filter(|r| r.has_foreign_key()) {
        if !map.contains_key(&relation.name) {
            continue;
        }
        for fk in &relation.fields {
            if let Some(value) = map.get(fk) {
                ctx.key(fk, |ctx| {
                    ctx.constraint(
                        value,
                        format!(
                            "`{}` is set directly and through the nested write on `{}`; use one or the other",
                            fk, relation.name
                        ),
                    )
                });
                ok = false;
            }
        }
    }
    ok
}
