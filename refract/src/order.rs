//! Ordering clauses and pagination arguments.

use crate::aggregate::AggregateOp;
use crate::constants::{aggregations, args};
use crate::context::{Ctx, Object};
use crate::enums::{BuiltinEnum, NullsOrder, SortOrder};
use crate::error::ErrorKind;
use crate::model::{Entity, Field, Member, Schema};
use crate::unique::UniqueWhere;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Field(String),
    /// Number of related rows of a to-many relation
    RelationCount(String),
    /// A target reached through a to-one relation
    Relation {
        relation: String,
        target: Box<OrderTarget>,
    },
    /// An aggregate of a grouped column
    Aggregate { op: AggregateOp, field: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub target: OrderTarget,
    pub sort: SortOrder,
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pagination {
    pub cursor: Option<UniqueWhere>,
    /// Negative values page backwards from the cursor
    pub take: Option<i64>,
    pub skip: Option<u64>,
    pub distinct: Vec<String>,
}

impl Pagination {
    pub fn is_empty(&self) -> bool {
        self.cursor.is_none() && self.take.is_none() && self.skip.is_none() && self.distinct.is_empty()
    }
}

/// What an ordering clause may refer to
#[derive(Copy, Clone, Debug)]
pub(crate) enum OrderScope<'a> {
    /// Row queries: fields, relation counts, to-one relation fields
    Rows,
    /// Grouped queries: the grouped fields and aggregates
    Groups(&'a [String]),
}

impl OrderScope<'_> {
    fn shape(&self, entity: &Entity) -> String {
        match self {
            Self::Rows => Schema::shape_name(entity, "OrderByWithRelationInput"),
            Self::Groups(_) => Schema::shape_name(entity, "OrderByWithAggregationInput"),
        }
    }
}

/// One clause or a list of clauses; list order is tie-break order
pub(crate) fn parse_order_by(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    scope: OrderScope<'_>,
) -> Option<Vec<OrderClause>> {
    ctx.one_or_many(value, |ctx, item| parse_clause(ctx, entity, item, scope))
}

fn parse_clause(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    scope: OrderScope<'_>,
) -> Option<OrderClause> {
    let shape = scope.shape(entity);
    let map = ctx.object(value, &shape)?;

    // Explicit form: {field, sort, nulls}
    if map.contains_key(args::FIELD) && entity.member(args::FIELD).is_none() {
        return explicit(ctx, entity, map, scope);
    }
    if map.len() != 1 {
        ctx.constraint(
            value,
            format!(
                "an orderBy object takes exactly one key, found {}",
                map.len()
            ),
        );
        return None;
    }
    let (key, item) = map.iter().next()?;

    if let OrderScope::Groups(_) = scope {
        if let Some(op) = AggregateOp::from_key(key) {
            return ctx.key(key, |ctx| aggregate_clause(ctx, entity, op, item));
        }
    }

    match (entity.member(key), scope) {
        (Some(Member::Field(field)), _) => ctx.key(key, |ctx| {
            if !orderable(ctx, field, item, scope) {
                return None;
            }
            let (sort, nulls) = sort_spec(ctx, item, field.nullable)?;
            Some(OrderClause {
                target: OrderTarget::Field(field.name.clone()),
                sort,
                nulls,
            })
        }),
        (Some(Member::Relation(relation)), OrderScope::Rows) if relation.is_to_many() => {
            ctx.key(key, |ctx| {
                let map = ctx.object(item, "a relation count ordering `{_count: sort}`")?;
                let mut sort = None;
                for (inner, dir) in map {
                    if inner == aggregations::UNDERSCORE_COUNT {
                        sort = ctx.key(inner, |ctx| SortOrder::parse(ctx, dir));
                    } else {
                        ctx.unknown_field(inner, dir, "OrderByRelationAggregateInput");
                        return None;
                    }
                }
                match sort {
                    Some(sort) => Some(OrderClause {
                        target: OrderTarget::RelationCount(relation.name.clone()),
                        sort,
                        nulls: None,
                    }),
                    None => {
                        if !map.contains_key(aggregations::UNDERSCORE_COUNT) {
                            ctx.missing(aggregations::UNDERSCORE_COUNT, "OrderByRelationAggregateInput");
                        }
                        None
                    }
                }
            })
        }
        (Some(Member::Relation(relation)), OrderScope::Rows) => ctx.key(key, |ctx| {
            let target = ctx.schema.target(relation);
            let inner = ctx.nested(item, |ctx| parse_clause(ctx, target, item, OrderScope::Rows))?;
            Some(OrderClause {
                target: OrderTarget::Relation {
                    relation: relation.name.clone(),
                    target: Box::new(inner.target),
                },
                sort: inner.sort,
                nulls: inner.nulls,
            })
        }),
        _ => {
            ctx.unknown_field(key, item, &shape);
            None
        }
    }
}

/// Report fields that cannot be ordered by in this scope
fn orderable(ctx: &mut Ctx<'_>, field: &Field, value: &Value, scope: OrderScope<'_>) -> bool {
    if field.list {
        ctx.report(
            ErrorKind::UnknownField,
            value,
            format!("list field `{}` cannot be ordered by", field.name),
        );
        return false;
    }
    if let OrderScope::Groups(by) = scope {
        if !by.contains(&field.name) {
            ctx.constraint(
                value,
                format!(
                    "`{}` is not grouped; order by a field in `by` or by an aggregate",
                    field.name
                ),
            );
            return false;
        }
    }
    true
}

fn explicit(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    map: &Object,
    scope: OrderScope<'_>,
) -> Option<OrderClause> {
    let mut field = None;
    let mut sort = None;
    let mut nulls_raw = None;
    let mut complete = true;
    for (key, item) in map {
        match key.as_str() {
            args::FIELD => match ctx.key(key, |ctx| scalar_field_ref(ctx, entity, item)) {
                Some(f) => {
                    complete &= ctx.key(key, |ctx| orderable(ctx, f, item, scope));
                    field = Some(f);
                }
                None => complete = false,
            },
            args::SORT => {
                sort = ctx.key(key, |ctx| SortOrder::parse(ctx, item));
                complete &= sort.is_some();
            }
            args::NULLS => nulls_raw = Some(item),
            _ => {
                ctx.unknown_field(key, item, "SortOrderInput");
                complete = false;
            }
        }
    }
    if sort.is_none() && !map.contains_key(args::SORT) {
        ctx.missing(args::SORT, "SortOrderInput");
        complete = false;
    }
    let nulls = match (nulls_raw, field) {
        (Some(raw), Some(f)) => {
            let parsed = ctx.key(args::NULLS, |ctx| nulls(ctx, raw, f.nullable));
            complete &= parsed.is_some();
            parsed
        }
        _ => None,
    };
    if !complete {
        return None;
    }
    Some(OrderClause {
        target: OrderTarget::Field(field?.name.clone()),
        sort: sort?,
        nulls,
    })
}

fn aggregate_clause(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    op: AggregateOp,
    value: &Value,
) -> Option<OrderClause> {
    let shape = format!("{}{}OrderByAggregateInput", entity.name, op.label());
    let map = ctx.object(value, &shape)?;
    if map.len() != 1 {
        ctx.constraint(
            value,
            format!(
                "an aggregate ordering takes exactly one field, found {}",
                map.len()
            ),
        );
        return None;
    }
    let (key, item) = map.iter().next()?;
    let Some(field) = entity.field(key) else {
        ctx.unknown_field(key, item, &shape);
        return None;
    };
    if !op.accepts(field) {
        ctx.unknown_field_because(
            key,
            item,
            format!("`{}` is not available on field `{}`", op.key(), key),
        );
        return None;
    }
    let sort = ctx.key(key, |ctx| SortOrder::parse(ctx, item))?;
    Some(OrderClause {
        target: OrderTarget::Aggregate {
            op,
            field: field.name.clone(),
        },
        sort,
        nulls: None,
    })
}

/// `"asc"` or `{sort: "asc", nulls: "last"}`
fn sort_spec(
    ctx: &mut Ctx<'_>,
    value: &Value,
    nullable: bool,
) -> Option<(SortOrder, Option<NullsOrder>)> {
    let map = match value {
        Value::String(_) => return SortOrder::parse(ctx, value).map(|sort| (sort, None)),
        Value::Object(map) => map,
        other => {
            ctx.type_mismatch("a sort order or a SortOrderInput", other);
            return None;
        }
    };
    let mut sort = None;
    let mut nulls_order = None;
    let mut complete = true;
    for (key, item) in map {
        match key.as_str() {
            args::SORT => {
                sort = ctx.key(key, |ctx| SortOrder::parse(ctx, item));
                complete &= sort.is_some();
            }
            args::NULLS => {
                nulls_order = ctx.key(key, |ctx| nulls(ctx, item, nullable));
                complete &= nulls_order.is_some();
            }
            _ => {
                ctx.unknown_field(key, item, "SortOrderInput");
                complete = false;
            }
        }
    }
    if !map.contains_key(args::SORT) {
        ctx.missing(args::SORT, "SortOrderInput");
        return None;
    }
    if !complete {
        return None;
    }
    Some((sort?, nulls_order))
}

fn nulls(ctx: &mut Ctx<'_>, value: &Value, nullable: bool) -> Option<NullsOrder> {
    let parsed = NullsOrder::parse(ctx, value)?;
    if !nullable {
        ctx.constraint(value, "`nulls` only applies to nullable fields");
        return None;
    }
    Some(parsed)
}

/// A scalar field named by value, checked against the entity's field-name domain
pub(crate) fn scalar_field_ref<'e>(
    ctx: &mut Ctx<'_>,
    entity: &'e Entity,
    value: &Value,
) -> Option<&'e Field> {
    let domain = entity.scalar_field_domain();
    let Value::String(name) = value else {
        ctx.type_mismatch(&format!("a {} string", domain), value);
        return None;
    };
    match entity.field(name) {
        Some(field) => Some(field),
        None => {
            let names: Vec<&str> = entity.scalar_field_names().collect();
            ctx.report(
                ErrorKind::EnumDomainViolation,
                value,
                format!(
                    "`{}` is not a variant of {}; expected one of {}",
                    name,
                    domain,
                    names.join(", ")
                ),
            );
            None
        }
    }
}

/// `distinct`: one field name or a list of them
pub(crate) fn parse_distinct(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
) -> Option<Vec<String>> {
    ctx.one_or_many(value, |ctx, item| {
        scalar_field_ref(ctx, entity, item).map(|f| f.name.clone())
    })
}

pub(crate) fn parse_take(ctx: &mut Ctx<'_>, value: &Value) -> Option<i64> {
    let Some(take) = value.as_i64() else {
        ctx.type_mismatch("an Int", value);
        return None;
    };
    if let Some(max) = ctx.schema.options().max_take {
        if take.unsigned_abs() > max {
            ctx.constraint(value, format!("`take` is limited to {} rows", max));
            return None;
        }
    }
    Some(take)
}

pub(crate) fn parse_skip(ctx: &mut Ctx<'_>, value: &Value) -> Option<u64> {
    match value.as_i64() {
        Some(skip) if skip >= 0 => Some(skip.unsigned_abs()),
        Some(_) => {
            ctx.constraint(value, "`skip` must not be negative");
            None
        }
        None => {
            ctx.type_mismatch("an Int", value);
            None
        }
    }
}

/// A cursor only has a direction relative to an ordering
pub(crate) fn require_order_for_cursor(ctx: &mut Ctx<'_>, map: &Object) {
    let Some(cursor) = map.get(args::CURSOR) else {
        return;
    };
    if cursor.is_null() {
        return;
    }
    let ordered = match map.get(args::ORDER_BY) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    };
    if !ordered {
        ctx.key(args::CURSOR, |ctx| {
            ctx.report(
                ErrorKind::AmbiguousCursor,
                cursor,
                "a cursor needs at least one orderBy clause to define the paging direction",
            )
        });
    }
}
