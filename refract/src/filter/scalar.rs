//! Filters over one scalar column, and their aggregate variant used in `having`.

use crate::constants::{aggregations, filters};
use crate::context::{Ctx, Object};
use crate::enums::{BuiltinEnum, QueryMode};
use crate::model::{Field, ScalarKind, Schema};
use crate::value::{coerce, ScalarValue};
use serde_json::Value;

/// Generic field operations for filtering
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Equals(ScalarValue),
    In(Vec<ScalarValue>),
    NotIn(Vec<ScalarValue>),
    Lt(ScalarValue),
    Lte(ScalarValue),
    Gt(ScalarValue),
    Gte(ScalarValue),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Not(Negation),
}

/// Operand of `not`: a literal (`not: "x"`) or a nested filter (`not: {in: [...]}`)
#[derive(Debug, Clone, PartialEq)]
pub enum Negation {
    Value(ScalarValue),
    Filter(Box<ScalarFilter>),
}

/// Conjunction of operations on one scalar field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalarFilter {
    pub ops: Vec<FieldOp>,
    pub mode: QueryMode,
}

impl ScalarFilter {
    pub fn equals(value: ScalarValue) -> Self {
        Self {
            ops: vec![FieldOp::Equals(value)],
            mode: QueryMode::Default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Scalar filter plus conditions over the aggregates of a grouped column
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateFilter {
    pub base: ScalarFilter,
    pub count: Option<ScalarFilter>,
    pub avg: Option<ScalarFilter>,
    pub sum: Option<ScalarFilter>,
    pub min: Option<ScalarFilter>,
    pub max: Option<ScalarFilter>,
}

/// Kind and nullability a filter is parameterized by
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ScalarSpec {
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl ScalarSpec {
    pub fn of(field: &Field) -> Self {
        Self {
            kind: field.kind,
            nullable: field.nullable,
        }
    }

    fn non_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    /// Shape name used in messages, e.g. `StringNullableFilter`
    fn shape(&self, schema: &Schema, aggregates: bool) -> String {
        let base = match self.kind {
            ScalarKind::Enum(id) => format!("Enum{}", schema.enum_by_id(id).name),
            kind => schema.kind_name(kind).to_string(),
        };
        format!(
            "{}{}{}Filter",
            base,
            if self.nullable { "Nullable" } else { "" },
            if aggregates { "WithAggregates" } else { "" }
        )
    }
}

pub(crate) fn parse(ctx: &mut Ctx<'_>, spec: ScalarSpec, value: &Value) -> Option<ScalarFilter> {
    match value {
        Value::Object(map) => ctx.nested(value, |ctx| parse_object(ctx, spec, map, None)),
        literal => coerce(ctx, spec.kind, spec.nullable, literal).map(ScalarFilter::equals),
    }
}

pub(crate) fn parse_with_aggregates(
    ctx: &mut Ctx<'_>,
    spec: ScalarSpec,
    value: &Value,
) -> Option<AggregateFilter> {
    match value {
        Value::Object(map) => {
            let mut aggregates = AggregateFilter::default();
            let base = ctx.nested(value, |ctx| {
                parse_object(ctx, spec, map, Some(&mut aggregates))
            })?;
            Some(AggregateFilter { base, ..aggregates })
        }
        literal => coerce(ctx, spec.kind, spec.nullable, literal).map(|v| AggregateFilter {
            base: ScalarFilter::equals(v),
            ..AggregateFilter::default()
        }),
    }
}

fn parse_object(
    ctx: &mut Ctx<'_>,
    spec: ScalarSpec,
    map: &Object,
    mut aggregates: Option<&mut AggregateFilter>,
) -> Option<ScalarFilter> {
    let schema = ctx.schema;
    let shape = spec.shape(schema, aggregates.is_some());
    let ordered = spec.kind.is_ordered();
    let text = spec.kind.is_text();
    let numeric = spec.kind.is_numeric();

    let mut filter = ScalarFilter::default();
    let mut complete = true;

    for (key, value) in map {
        let op = match key.as_str() {
            filters::EQUALS => ctx
                .key(key, |ctx| coerce(ctx, spec.kind, spec.nullable, value))
                .map(FieldOp::Equals),
            filters::IN => ctx
                .key(key, |ctx| values(ctx, spec, value))
                .map(FieldOp::In),
            filters::NOT_IN => ctx
                .key(key, |ctx| values(ctx, spec.non_null(), value))
                .map(FieldOp::NotIn),
            filters::LOWER_THAN
            | filters::LOWER_THAN_OR_EQUAL
            | filters::GREATER_THAN
            | filters::GREATER_THAN_OR_EQUAL
                if ordered =>
            {
                ctx.key(key, |ctx| coerce(ctx, spec.kind, false, value))
                    .map(|v| match key.as_str() {
                        filters::LOWER_THAN => FieldOp::Lt(v),
                        filters::LOWER_THAN_OR_EQUAL => FieldOp::Lte(v),
                        filters::GREATER_THAN => FieldOp::Gt(v),
                        _ => FieldOp::Gte(v),
                    })
            }
            filters::CONTAINS | filters::STARTS_WITH | filters::ENDS_WITH if text => ctx
                .key(key, |ctx| text_operand(ctx, value))
                .map(|s| match key.as_str() {
                    filters::CONTAINS => FieldOp::Contains(s),
                    filters::STARTS_WITH => FieldOp::StartsWith(s),
                    _ => FieldOp::EndsWith(s),
                }),
            filters::MODE if text && schema.options().insensitive_mode => {
                match ctx.key(key, |ctx| QueryMode::parse(ctx, value)) {
                    Some(mode) => filter.mode = mode,
                    None => complete = false,
                }
                continue;
            }
            filters::NOT => ctx.key(key, |ctx| match value {
                Value::Object(_) => parse(ctx, spec, value)
                    .map(|inner| FieldOp::Not(Negation::Filter(Box::new(inner)))),
                literal => coerce(ctx, spec.kind, spec.nullable, literal)
                    .map(|v| FieldOp::Not(Negation::Value(v))),
            }),
            aggregations::UNDERSCORE_COUNT
            | aggregations::UNDERSCORE_AVG
            | aggregations::UNDERSCORE_SUM
            | aggregations::UNDERSCORE_MIN
            | aggregations::UNDERSCORE_MAX
                if aggregates.is_some() =>
            {
                let target_spec = match key.as_str() {
                    aggregations::UNDERSCORE_COUNT => Some(ScalarSpec {
                        kind: ScalarKind::Int,
                        nullable: false,
                    }),
                    aggregations::UNDERSCORE_AVG | aggregations::UNDERSCORE_SUM if numeric => {
                        Some(ScalarSpec {
                            kind: ScalarKind::Float,
                            nullable: true,
                        })
                    }
                    aggregations::UNDERSCORE_MIN | aggregations::UNDERSCORE_MAX if numeric => {
                        Some(ScalarSpec {
                            kind: spec.kind,
                            nullable: true,
                        })
                    }
                    _ => None,
                };
                let Some(target_spec) = target_spec else {
                    ctx.unknown_field_because(
                        key,
                        value,
                        format!("`{}` is only available on numeric fields", key),
                    );
                    complete = false;
                    continue;
                };
                match ctx.key(key, |ctx| parse(ctx, target_spec, value)) {
                    Some(inner) => {
                        if let Some(parts) = aggregates.as_deref_mut() {
                            let slot = match key.as_str() {
                                aggregations::UNDERSCORE_COUNT => &mut parts.count,
                                aggregations::UNDERSCORE_AVG => &mut parts.avg,
                                aggregations::UNDERSCORE_SUM => &mut parts.sum,
                                aggregations::UNDERSCORE_MIN => &mut parts.min,
                                _ => &mut parts.max,
                            };
                            *slot = Some(inner);
                        }
                    }
                    None => complete = false,
                }
                continue;
            }
            filters::LOWER_THAN
            | filters::LOWER_THAN_OR_EQUAL
            | filters::GREATER_THAN
            | filters::GREATER_THAN_OR_EQUAL
            | filters::CONTAINS
            | filters::STARTS_WITH
            | filters::ENDS_WITH
            | filters::MODE => {
                ctx.unknown_field_because(
                    key,
                    value,
                    format!("`{}` is not available on {}", key, shape),
                );
                None
            }
            _ => {
                ctx.unknown_field(key, value, &shape);
                None
            }
        };
        match op {
            Some(op) => filter.ops.push(op),
            None => complete = false,
        }
    }

    complete.then_some(filter)
}

fn values(ctx: &mut Ctx<'_>, spec: ScalarSpec, value: &Value) -> Option<Vec<ScalarValue>> {
    let expected = format!("a list of {}", ctx.schema.kind_name(spec.kind));
    ctx.many(value, &expected, |ctx, item| {
        coerce(ctx, spec.kind, spec.nullable, item)
    })
}

fn text_operand(ctx: &mut Ctx<'_>, value: &Value) -> Option<String> {
    match coerce(ctx, ScalarKind::String, false, value)? {
        ScalarValue::String(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::FieldKind;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .entity("Row", |e| {
                e.field("id", FieldKind::Int).id();
            })
            .build()
            .unwrap()
    }

    const STRING_NULLABLE: ScalarSpec = ScalarSpec {
        kind: ScalarKind::String,
        nullable: true,
    };

    #[test]
    fn test_literal_is_equals_shorthand() {
        let schema = schema();
        let mut ctx = Ctx::new(&schema);
        let filter = parse(&mut ctx, STRING_NULLABLE, &json!("x")).unwrap();
        assert_eq!(
            filter.ops,
            vec![FieldOp::Equals(ScalarValue::String("x".into()))]
        );
    }

    #[test]
    fn test_null_only_in_nullable_in() {
        let schema = schema();
        let mut ctx = Ctx::new(&schema);
        assert!(parse(&mut ctx, STRING_NULLABLE, &json!({ "in": ["a", null] })).is_some());
        assert!(parse(&mut ctx, STRING_NULLABLE, &json!({ "notIn": ["a", null] })).is_none());
        let errors = ctx.finish(Some(())).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().path.to_string(), "notIn[1]");
    }

    #[test]
    fn test_boolean_has_no_ordering() {
        let schema = schema();
        let mut ctx = Ctx::new(&schema);
        let spec = ScalarSpec {
            kind: ScalarKind::Boolean,
            nullable: false,
        };
        assert!(parse(&mut ctx, spec, &json!({ "gt": true })).is_none());
        let errors = ctx.finish(Some(())).unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
    }

    #[test]
    fn test_recursive_not() {
        let schema = schema();
        let mut ctx = Ctx::new(&schema);
        let spec = ScalarSpec {
            kind: ScalarKind::Int,
            nullable: false,
        };
        let filter = parse(&mut ctx, spec, &json!({ "not": { "not": { "gte": 3 } } })).unwrap();
        let FieldOp::Not(Negation::Filter(inner)) = &filter.ops[0] else {
            panic!("expected nested negation");
        };
        assert!(matches!(inner.ops[0], FieldOp::Not(Negation::Filter(_))));
    }

    #[test]
    fn test_aggregate_variant() {
        let schema = schema();
        let mut ctx = Ctx::new(&schema);
        let spec = ScalarSpec {
            kind: ScalarKind::Int,
            nullable: false,
        };
        let filter = parse_with_aggregates(
            &mut ctx,
            spec,
            &json!({ "_avg": { "gt": 2.5 }, "_count": { "gte": 1 } }),
        )
        .unwrap();
        assert!(filter.base.is_empty());
        assert!(filter.avg.is_some() && filter.count.is_some());

        let text = ScalarSpec {
            kind: ScalarKind::String,
            nullable: false,
        };
        assert!(parse_with_aggregates(&mut ctx, text, &json!({ "_sum": { "gt": 1 } })).is_none());
        assert!(parse(&mut ctx, spec, &json!({ "_count": { "gt": 1 } })).is_none());
        let errors = ctx.finish(Some(())).unwrap_err();
        assert_eq!(
            errors.kinds(),
            vec![ErrorKind::UnknownField, ErrorKind::UnknownField]
        );
    }
}
