use super::nested::{self, WriteMode};
use super::{check_foreign_key_writes, parse_field_value, FieldValue, NestedWrite, Omit};
use crate::constants::operations;
use crate::context::{Ctx, Object};
use crate::model::{Entity, Field, Member};
use crate::value::{coerce, ScalarValue};
use serde_json::Value;

/// Write applied to one column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    Set(FieldValue),
    Increment(ScalarValue),
    Decrement(ScalarValue),
    Multiply(ScalarValue),
    Divide(ScalarValue),
    /// Append to a list column
    Push(Vec<ScalarValue>),
}

/// Validated update payload. Every member is optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateData {
    pub fields: Vec<(String, FieldWrite)>,
    pub relations: Vec<NestedWrite>,
}

impl UpdateData {
    pub fn field(&self, name: &str) -> Option<&FieldWrite> {
        self.fields
            .iter()
            .find_map(|(field, write)| (field == name).then_some(write))
    }

    pub fn relation(&self, name: &str) -> Option<&NestedWrite> {
        self.relations.iter().find(|w| w.relation == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.relations.is_empty()
    }
}

pub(crate) fn parse(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    omit: Omit<'_>,
) -> Option<UpdateData> {
    parse_with(ctx, entity, value, omit, true)
}

/// `updateMany` payloads: scalar columns only
pub(crate) fn parse_scalars(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    omit: Omit<'_>,
) -> Option<UpdateData> {
    parse_with(ctx, entity, value, omit, false)
}

fn parse_with(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    omit: Omit<'_>,
    relations_allowed: bool,
) -> Option<UpdateData> {
    let shape = if relations_allowed {
        omit.shape(entity, "Update")
    } else {
        omit.shape(entity, "UpdateManyMutation")
    };
    let map = ctx.object(value, &shape)?;
    ctx.nested(value, |ctx| {
        let mut data = UpdateData::default();
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
                Some(Member::Field(field)) => match ctx.key(key, |ctx| field_write(ctx, field, item)) {
                    Some(write) => data.fields.push((field.name.clone(), write)),
                    None => complete = false,
                },
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
                    match ctx.key(key, |ctx| nested::parse(ctx, relation, item, WriteMode::Update)) {
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
        complete.then_some(data)
    })
}

/// A literal is shorthand for `{set: literal}`
fn field_write(ctx: &mut Ctx<'_>, field: &Field, value: &Value) -> Option<FieldWrite> {
    match value {
        Value::Object(map) => operator(ctx, field, map, value),
        literal => parse_field_value(ctx, field, literal).map(FieldWrite::Set),
    }
}

fn operator(ctx: &mut Ctx<'_>, field: &Field, map: &Object, value: &Value) -> Option<FieldWrite> {
    let kind = ctx.schema.kind_name(field.kind).to_string();
    let shape = if field.list {
        format!("{}ListUpdateInput", kind)
    } else if field.nullable {
        format!("Nullable{}FieldUpdateOperationsInput", kind)
    } else {
        format!("{}FieldUpdateOperationsInput", kind)
    };

    if field.list && map.contains_key(operations::SET) && map.contains_key(operations::PUSH) {
        ctx.constraint(
            value,
            "`set` replaces the list and `push` appends to it; supply only one",
        );
        return None;
    }
    if map.len() != 1 {
        ctx.constraint(
            value,
            format!(
                "{} takes exactly one operator, found {}",
                shape,
                map.len()
            ),
        );
        return None;
    }
    let (key, item) = map.iter().next()?;
    let numeric = field.kind.is_numeric() && !field.list;

    match key.as_str() {
        operations::SET => ctx
            .key(key, |ctx| parse_field_value(ctx, field, item))
            .map(FieldWrite::Set),
        operations::PUSH if field.list => ctx
            .key(key, |ctx| {
                ctx.one_or_many(item, |ctx, element| coerce(ctx, field.kind, false, element))
            })
            .map(FieldWrite::Push),
        operations::INCREMENT
        | operations::DECREMENT
        | operations::MULTIPLY
        | operations::DIVIDE
            if numeric =>
        {
            let operand = ctx.key(key, |ctx| coerce(ctx, field.kind, false, item))?;
            Some(match key.as_str() {
                operations::INCREMENT => FieldWrite::Increment(operand),
                operations::DECREMENT => FieldWrite::Decrement(operand),
                operations::MULTIPLY => FieldWrite::Multiply(operand),
                _ if operand.is_zero() => {
                    ctx.key(key, |ctx| ctx.constraint(item, "division by zero"));
                    return None;
                }
                _ => FieldWrite::Divide(operand),
            })
        }
        operations::PUSH
        | operations::INCREMENT
        | operations::DECREMENT
        | operations::MULTIPLY
        | operations::DIVIDE => {
            ctx.unknown_field_because(
                key,
                item,
                format!("`{}` is not available on {}", key, shape),
            );
            None
        }
        _ => {
            ctx.unknown_field(key, item, &shape);
            None
        }
    }
}
