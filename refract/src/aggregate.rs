//! Aggregate selectors, grouping, and the `having` predicate over grouped rows.

use crate::constants::{aggregations, args, filters};
use crate::context::Ctx;
use crate::error::ErrorKind;
use crate::filter::scalar::{self, ScalarSpec};
use crate::filter::AggregateFilter;
use crate::model::{Entity, Field, Member, Schema};
use crate::order::scalar_field_ref;
use serde::Serialize;
use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AggregateOp {
    #[serde(rename = "_count")]
    Count,
    #[serde(rename = "_avg")]
    Avg,
    #[serde(rename = "_sum")]
    Sum,
    #[serde(rename = "_min")]
    Min,
    #[serde(rename = "_max")]
    Max,
}

impl AggregateOp {
    pub const ALL: [AggregateOp; 5] = [Self::Count, Self::Avg, Self::Sum, Self::Min, Self::Max];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Count => aggregations::UNDERSCORE_COUNT,
            Self::Avg => aggregations::UNDERSCORE_AVG,
            Self::Sum => aggregations::UNDERSCORE_SUM,
            Self::Min => aggregations::UNDERSCORE_MIN,
            Self::Max => aggregations::UNDERSCORE_MAX,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::Avg => "Avg",
            Self::Sum => "Sum",
            Self::Min => "Min",
            Self::Max => "Max",
        }
    }

    /// `_count` applies to every field, the others to numeric scalars only
    pub fn accepts(&self, field: &Field) -> bool {
        match self {
            Self::Count => true,
            _ => field.kind.is_numeric() && !field.list,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountSelection {
    /// `_all`: count rows
    pub all: bool,
    /// Count non-null values of these fields
    pub fields: Vec<String>,
}

/// `_count/_avg/_sum/_min/_max` selectors. Empty lists mean "not selected".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateSelection {
    pub count: Option<CountSelection>,
    pub avg: Vec<String>,
    pub sum: Vec<String>,
    pub min: Vec<String>,
    pub max: Vec<String>,
}

impl AggregateSelection {
    pub fn is_empty(&self) -> bool {
        self.count.is_none()
            && self.avg.is_empty()
            && self.sum.is_empty()
            && self.min.is_empty()
            && self.max.is_empty()
    }

    pub fn fields(&self, op: AggregateOp) -> &[String] {
        match op {
            AggregateOp::Count => match &self.count {
                Some(count) => &count.fields,
                None => &[],
            },
            AggregateOp::Avg => &self.avg,
            AggregateOp::Sum => &self.sum,
            AggregateOp::Min => &self.min,
            AggregateOp::Max => &self.max,
        }
    }
}

/// Grouping payload of a `groupBy` call
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub by: Vec<String>,
    pub having: Option<Having>,
    pub aggregates: AggregateSelection,
}

/// Predicate over grouped rows. Field conditions use the aggregate filter variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Having {
    pub conditions: Vec<HavingCondition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HavingCondition {
    And(Vec<Having>),
    Or(Vec<Having>),
    Not(Vec<Having>),
    Field {
        field: String,
        filter: AggregateFilter,
    },
}

/// Parse one selector key (`_avg: {views: true}`) into `selection`
pub(crate) fn parse_selector(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    op: AggregateOp,
    value: &Value,
    selection: &mut AggregateSelection,
) -> bool {
    if op == AggregateOp::Count {
        return match parse_count_selection(ctx, entity, value) {
            Some(count) => {
                selection.count = Some(count);
                true
            }
            None => false,
        };
    }

    let shape = format!("{}{}AggregateInput", entity.name, op.label());
    let Some(map) = ctx.object(value, &shape) else {
        return false;
    };
    let mut fields = Vec::new();
    let mut complete = true;
    for (key, flag) in map {
        let Some(field) = entity.field(key) else {
            ctx.unknown_field(key, flag, &shape);
            complete = false;
            continue;
        };
        if !op.accepts(field) {
            ctx.unknown_field_because(
                key,
                flag,
                format!("`{}` only applies to numeric fields", op.key()),
            );
            complete = false;
            continue;
        }
        match ctx.key(key, |ctx| ctx.boolean(flag)) {
            Some(true) => fields.push(field.name.clone()),
            Some(false) => {}
            None => complete = false,
        }
    }
    match op {
        AggregateOp::Avg => selection.avg = fields,
        AggregateOp::Sum => selection.sum = fields,
        AggregateOp::Min => selection.min = fields,
        AggregateOp::Max => selection.max = fields,
        AggregateOp::Count => {}
    }
    complete
}

/// `true` (row count) or `{_all?: bool, <field>?: bool}`
pub(crate) fn parse_count_selection(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
) -> Option<CountSelection> {
    let shape = Schema::shape_name(entity, "CountAggregateInput");
    let map = match value {
        Value::Bool(all) => {
            return Some(CountSelection {
                all: *all,
                fields: Vec::new(),
            })
        }
        Value::Object(map) => map,
        other => {
            ctx.type_mismatch(&format!("a boolean or a {}", shape), other);
            return None;
        }
    };
    let mut count = CountSelection::default();
    let mut complete = true;
    for (key, flag) in map {
        if key != aggregations::UNDERSCORE_ALL && entity.field(key).is_none() {
            ctx.unknown_field(key, flag, &shape);
            complete = false;
            continue;
        }
        match ctx.key(key, |ctx| ctx.boolean(flag)) {
            Some(true) if key == aggregations::UNDERSCORE_ALL => count.all = true,
            Some(true) => count.fields.push(key.clone()),
            Some(false) => {}
            None => complete = false,
        }
    }
    complete.then_some(count)
}

/// `by`: a non-empty set of scalar, non-list field names
pub(crate) fn parse_by(ctx: &mut Ctx<'_>, entity: &Entity, value: &Value) -> Option<Vec<String>> {
    let fields = ctx.one_or_many(value, |ctx, item| {
        let field = scalar_field_ref(ctx, entity, item)?;
        if field.list {
            ctx.constraint(item, format!("list field `{}` cannot be grouped", field.name));
            return None;
        }
        Some(field.name.clone())
    })?;
    if fields.is_empty() {
        ctx.constraint(value, "`by` needs at least one field");
        return None;
    }
    let mut seen = Vec::with_capacity(fields.len());
    for name in &fields {
        if seen.contains(&name) {
            ctx.constraint(value, format!("`{}` is grouped more than once", name));
            return None;
        }
        seen.push(name);
    }
    Some(fields)
}

pub(crate) fn parse_having(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    by: &[String],
    value: &Value,
) -> Option<Having> {
    let shape = Schema::shape_name(entity, "ScalarWhereWithAggregatesInput");
    let map = ctx.object(value, &shape)?;
    ctx.nested(value, |ctx| {
        let mut conditions = Vec::new();
        let mut complete = true;
        for (key, item) in map {
            let condition = match key.as_str() {
                filters::AND => ctx
                    .key(key, |ctx| {
                        ctx.one_or_many(item, |ctx, v| parse_having(ctx, entity, by, v))
                    })
                    .map(HavingCondition::And),
                filters::OR => ctx
                    .key(key, |ctx| {
                        ctx.many(item, "a list of having inputs", |ctx, v| {
                            parse_having(ctx, entity, by, v)
                        })
                    })
                    .map(HavingCondition::Or),
                filters::NOT_UPPER => ctx
                    .key(key, |ctx| {
                        ctx.one_or_many(item, |ctx, v| parse_having(ctx, entity, by, v))
                    })
                    .map(HavingCondition::Not),
                name => match entity.member(name) {
                    Some(Member::Field(field)) if !field.list => ctx.key(key, |ctx| {
                        let filter =
                            scalar::parse_with_aggregates(ctx, ScalarSpec::of(field), item)?;
                        if !filter.base.is_empty() && !by.contains(&field.name) {
                            ctx.constraint(
                                item,
                                format!(
                                    "`{}` is not grouped; filter it through an aggregate such as `_count` or `_max`",
                                    field.name
                                ),
                            );
                            return None;
                        }
                        Some(HavingCondition::Field {
                            field: field.name.clone(),
                            filter,
                        })
                    }),
                    Some(Member::Field(field)) => {
                        ctx.unknown_field_because(
                            key,
                            item,
                            format!("list field `{}` cannot be filtered in `having`", field.name),
                        );
                        None
                    }
                    Some(Member::Relation(_)) => {
                        ctx.unknown_field_because(
                            key,
                            item,
                            format!("relation `{}` cannot be filtered in `having`", name),
                        );
                        None
                    }
                    None => {
                        ctx.unknown_field(key, item, &shape);
                        None
                    }
                },
            };
            match condition {
                Some(condition) => conditions.push(condition),
                None => complete = false,
            }
        }
        complete.then_some(Having { conditions })
    })
}

/// `take`/`skip` on grouped rows are only defined relative to an ordering
pub(crate) fn require_order_for_paging(ctx: &mut Ctx<'_>, map: &crate::context::Object) {
    let ordered = match map.get(args::ORDER_BY) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    };
    if ordered {
        return;
    }
    for key in [args::TAKE, args::SKIP] {
        if let Some(value) = map.get(key) {
            ctx.key(key, |ctx| {
                ctx.report(
                    ErrorKind::ConstraintViolation,
                    value,
                    format!("`{}` on grouped rows requires `orderBy`", key),
                )
            });
        }
    }
}
