//! Filters over array-valued columns.

use crate::constants::filters;
use crate::context::Ctx;
use crate::model::Field;
use crate::value::{coerce, coerce_list, ScalarValue};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ListOp {
    /// Whole-array equality; `None` matches a null column
    Equals(Option<Vec<ScalarValue>>),
    Has(ScalarValue),
    HasEvery(Vec<ScalarValue>),
    HasSome(Vec<ScalarValue>),
    IsEmpty(bool),
}

/// Conjunction of list operations. `equals: []` is stored as `isEmpty: true`,
/// so both spellings produce the same filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListFilter {
    pub ops: Vec<ListOp>,
}

pub(crate) fn parse(ctx: &mut Ctx<'_>, field: &Field, value: &Value) -> Option<ListFilter> {
    let map = match value {
        Value::Object(map) => map,
        Value::Array(_) | Value::Null => {
            return equals_operand(ctx, field, value).map(|items| ListFilter {
                ops: vec![canonical_equals(items)],
            })
        }
        other => {
            ctx.type_mismatch("a list filter object or a list", other);
            return None;
        }
    };

    let shape = format!("{}ListFilter", ctx.schema.kind_name(field.kind));
    let mut ops = Vec::new();
    let mut equals = None;
    let mut is_empty = None;
    let mut complete = true;

    for (key, item) in map {
        let parsed = match key.as_str() {
            filters::EQUALS => ctx
                .key(key, |ctx| equals_operand(ctx, field, item))
                .map(|items| equals = Some(items)),
            filters::HAS => ctx
                .key(key, |ctx| coerce(ctx, field.kind, true, item))
                .map(|v| ops.push(ListOp::Has(v))),
            filters::HAS_EVERY => ctx
                .key(key, |ctx| coerce_list(ctx, field.kind, item))
                .map(|items| ops.push(ListOp::HasEvery(items))),
            filters::HAS_SOME => ctx
                .key(key, |ctx| coerce_list(ctx, field.kind, item))
                .map(|items| ops.push(ListOp::HasSome(items))),
            filters::IS_EMPTY => ctx
                .key(key, |ctx| ctx.boolean(item))
                .map(|flag| is_empty = Some(flag)),
            _ => {
                ctx.unknown_field(key, item, &shape);
                None
            }
        };
        complete &= parsed.is_some();
    }

    match (equals, is_empty) {
        (None, None) => {}
        (Some(items), None) => ops.push(canonical_equals(items)),
        (None, Some(flag)) => ops.push(ListOp::IsEmpty(flag)),
        (Some(Some(items)), Some(flag)) if items.is_empty() == flag => {
            ops.push(canonical_equals(Some(items)));
        }
        (Some(items), Some(flag)) => {
            let found = match items {
                None => "null".to_string(),
                Some(items) if items.is_empty() => "an empty list".to_string(),
                Some(items) => format!("a list of {} element(s)", items.len()),
            };
            ctx.constraint(
                value,
                format!(
                    "`isEmpty: {}` contradicts `equals` with {}",
                    flag, found
                ),
            );
            complete = false;
        }
    }

    complete.then_some(ListFilter { ops })
}

fn equals_operand(
    ctx: &mut Ctx<'_>,
    field: &Field,
    value: &Value,
) -> Option<Option<Vec<ScalarValue>>> {
    match value {
        Value::Null if field.nullable => Some(None),
        Value::Null => {
            ctx.type_mismatch("a list", value);
            None
        }
        _ => coerce_list(ctx, field.kind, value).map(Some),
    }
}

fn canonical_equals(items: Option<Vec<ScalarValue>>) -> ListOp {
    match items {
        Some(items) if items.is_empty() => ListOp::IsEmpty(true),
        other => ListOp::Equals(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{FieldKind, Schema};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .entity("Post", |e| {
                e.field("id", FieldKind::Int).id();
                e.field("tags", FieldKind::String).list();
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_is_empty_and_equals_empty_are_equivalent() {
        let schema = schema();
        let tags = schema.entity("Post").unwrap().field("tags").unwrap();
        let mut ctx = Ctx::new(&schema);
        let a = parse(&mut ctx, tags, &json!({ "isEmpty": true })).unwrap();
        let b = parse(&mut ctx, tags, &json!({ "equals": [] })).unwrap();
        let c = parse(&mut ctx, tags, &json!({ "equals": [], "isEmpty": true })).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_contradiction_rejected() {
        let schema = schema();
        let tags = schema.entity("Post").unwrap().field("tags").unwrap();
        let mut ctx = Ctx::new(&schema);
        assert!(parse(&mut ctx, tags, &json!({ "isEmpty": true, "equals": ["x"] })).is_none());
        assert!(parse(&mut ctx, tags, &json!({ "isEmpty": false, "equals": [] })).is_none());
        let errors = ctx.finish(Some(())).unwrap_err();
        assert_eq!(
            errors.kinds(),
            vec![ErrorKind::ConstraintViolation, ErrorKind::ConstraintViolation]
        );
    }

    #[test]
    fn test_non_null_list_rejects_null_equals() {
        let schema = schema();
        let tags = schema.entity("Post").unwrap().field("tags").unwrap();
        let mut ctx = Ctx::new(&schema);
        assert!(parse(&mut ctx, tags, &json!({ "hasSome": ["a", "b"] })).is_some());
        assert!(parse(&mut ctx, tags, &json!(null)).is_none());
        assert_eq!(ctx.error_count(), 1);
    }
}
