use super::nested::{self, WriteMode};
use super::{check_foreign_key_writes, parse_field_value, FieldValue, NestedWrite, Omit};
use crate::constants::operations;
use crate::context::Ctx;
use crate::error::ErrorKind;
use crate::model::{Entity, Field, Member};
use serde_json::Value;

/// Validated create payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateData {
    /// Scalar columns, sorted by name
    pub fields: Vec<(String, FieldValue)>,
    pub relations: Vec<NestedWrite>,
}

impl CreateData {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find_map(|(field, value)| (field == name).then_some(value))
    }

    pub fn relation(&self, name: &str) -> Option<&NestedWrite> {
        self.relations.iter().find(|w| w.relation == name)
    }
}

pub(crate) fn parse(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    omit: Omit<'_>,
) -> Option<CreateData> {
    parse_with(ctx, entity, value, omit, true)
}

/// `createMany` rows: scalar columns only
pub(crate) fn parse_scalars(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    omit: Omit<'_>,
) -> Option<CreateData> {
    parse_with(ctx, entity, value, omit, false)
}

fn parse_with(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    omit: Omit<'_>,
    relations_allowed: bool,
) -> Option<CreateData> {
    let shape = omit.shape(entity, if relations_allowed { "Create" } else { "CreateMany" });
    let map = ctx.object(value, &shape)?;
    ctx.nested(value, |ctx| {
        let mut data = CreateData::default();
        let mut complete = true;

        for (key, item) in map {
            if omit.covers(key) {
                ctx.unknown_field_because(
                    key,
                    item,
                    format!("`{}` is implied by the enclosing write", key),
                );
                complete = false;
                continue;
            }
            match entity.member(key) {
                Some(Member::Field(field)) => {
                    match ctx.key(key, |ctx| create_value(ctx, field, item)) {
                        Some(v) => data.fields.push((field.name.clone(), v)),
                        None => complete = false,
                    }
                }
                Some(Member::Relation(_)) if !relations_allowed => {
                    ctx.unknown_field_because(
                        key,
                        item,
                        format!("{} accepts scalar fields only", shape),
                    );
                    complete = false;
                }
                Some(Member::Relation(relation)) if !relation.accepts_writes() => {
                    let reason = nested::inverse_reason(ctx.schema, relation);
                    ctx.unknown_field_because(key, item, reason);
                    complete = false;
                }
                Some(Member::Relation(relation)) => {
                    match ctx.key(key, |ctx| nested::parse(ctx, relation, item, WriteMode::Create)) {
                        Some(write) => data.relations.push(write),
                        None => complete = false,
                    }
                }
                None => {
                    ctx.unknown_field(key, item, &shape);
                    complete = false;
                }
            }
        }

        complete &= check_foreign_key_writes(ctx, entity, map);

        for field in &entity.fields {
            if !field.is_required_on_create()
                || omit.covers(&field.name)
                || map.contains_key(&field.name)
            {
                continue;
            }
            match entity.foreign_key_relation(field) {
                Some(relation) if relations_allowed && map.contains_key(&relation.name) => {}
                Some(relation) if relations_allowed && relation.accepts_writes() => {
                    ctx.key(&field.name, |ctx| {
                        ctx.report(
                            ErrorKind::MissingField,
                            &Value::Null,
                            format!(
                                "{} requires `{}` or a nested write on `{}`",
                                shape, field.name, relation.name
                            ),
                        )
                    });
                    complete = false;
                }
                _ => {
                    ctx.missing(&field.name, &shape);
                    complete = false;
                }
            }
        }

        complete.then_some(data)
    })
}

/// A list column may be given as `["a"]` or as `{set: ["a"]}`
fn create_value(ctx: &mut Ctx<'_>, field: &Field, value: &Value) -> Option<FieldValue> {
    let (true, Value::Object(map)) = (field.list, value) else {
        return parse_field_value(ctx, field, value);
    };
    let shape = format!(
        "{}CreateListInput",
        ctx.schema.kind_name(field.kind)
    );
    let mut out = None;
    let mut complete = true;
    for (key, item) in map {
        if key == operations::SET {
            out = ctx.key(key, |ctx| parse_field_value(ctx, field, item));
            complete &= out.is_some();
        } else {
            ctx.unknown_field(key, item, &shape);
            complete = false;
        }
    }
    if !map.contains_key(operations::SET) {
        ctx.missing(operations::SET, &shape);
        return None;
    }
    if !complete {
        return None;
    }
    out
}
