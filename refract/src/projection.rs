//! `select` / `include` projections, including nested reads through relations.

use crate::constants::{aggregations, args};
use crate::context::{Ctx, Object};
use crate::model::{Entity, Member, Relation, Schema};
use crate::order::{self, OrderClause, OrderScope, Pagination};
use crate::predicate::{self, Predicate};
use crate::unique;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Only the listed members
    Select(Selection),
    /// Every scalar field plus the listed relations
    Include(Selection),
}

impl Projection {
    pub fn selection(&self) -> &Selection {
        match self {
            Self::Select(selection) | Self::Include(selection) => selection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub fields: Vec<String>,
    pub relations: Vec<RelationRead>,
    /// To-many relations whose row counts are returned under `_count`
    pub count: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationRead {
    pub relation: String,
    pub args: NestedRead,
}

/// Read arguments of a relation inside a projection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NestedRead {
    pub projection: Option<Projection>,
    pub filter: Option<Predicate>,
    pub order_by: Vec<OrderClause>,
    pub pagination: Pagination,
}

/// `select` and `include` of one level; supplying both is contradictory
pub(crate) fn parse(ctx: &mut Ctx<'_>, entity: &Entity, map: &Object) -> Option<Option<Projection>> {
    match (map.get(args::SELECT), map.get(args::INCLUDE)) {
        (Some(_), Some(include)) => {
            ctx.key(args::INCLUDE, |ctx| {
                ctx.constraint(include, "`select` and `include` cannot be used together")
            });
            None
        }
        (Some(Value::Null), None) | (None, Some(Value::Null)) | (None, None) => Some(None),
        (Some(select), None) => ctx
            .key(args::SELECT, |ctx| selection(ctx, entity, select, true))
            .map(|s| Some(Projection::Select(s))),
        (None, Some(include)) => ctx
            .key(args::INCLUDE, |ctx| selection(ctx, entity, include, false))
            .map(|s| Some(Projection::Include(s))),
    }
}

fn selection(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    value: &Value,
    select: bool,
) -> Option<Selection> {
    let shape = Schema::shape_name(entity, if select { "Select" } else { "Include" });
    let map = ctx.object(value, &shape)?;
    ctx.nested(value, |ctx| {
        let mut out = Selection::default();
        let mut complete = true;
        for (key, item) in map {
            if key == aggregations::UNDERSCORE_COUNT {
                match ctx.key(key, |ctx| count(ctx, entity, item)) {
                    Some(Some(relations)) => out.count = Some(relations),
                    Some(None) => {}
                    None => complete = false,
                }
                continue;
            }
            match entity.member(key) {
                Some(Member::Field(field)) if select => match ctx.key(key, |ctx| ctx.boolean(item)) {
                    Some(true) => out.fields.push(field.name.clone()),
                    Some(false) => {}
                    None => complete = false,
                },
                Some(Member::Field(_)) => {
                    ctx.unknown_field_because(
                        key,
                        item,
                        format!(
                            "scalar fields are always included; use `select` to pick `{}`",
                            key
                        ),
                    );
                    complete = false;
                }
                Some(Member::Relation(relation)) => {
                    match ctx.key(key, |ctx| relation_read(ctx, relation, item)) {
                        Some(Some(read)) => out.relations.push(read),
                        Some(None) => {}
                        None => complete = false,
                    }
                }
                None => {
                    ctx.unknown_field(key, item, &shape);
                    complete = false;
                }
            }
        }
        complete.then_some(out)
    })
}

/// `true`, `false`, or nested read arguments
fn relation_read(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
) -> Option<Option<RelationRead>> {
    let read = match value {
        Value::Bool(false) => return Some(None),
        Value::Bool(true) => NestedRead::default(),
        Value::Object(_) => nested_read(ctx, relation, value)?,
        other => {
            ctx.type_mismatch("a boolean or nested read arguments", other);
            return None;
        }
    };
    Some(Some(RelationRead {
        relation: relation.name.clone(),
        args: read,
    }))
}

fn nested_read(ctx: &mut Ctx<'_>, relation: &Relation, value: &Value) -> Option<NestedRead> {
    let target = ctx.schema.target(relation);
    let many = relation.is_to_many();
    let shape = format!(
        "{}{}Args",
        target.name,
        if many { "FindMany" } else { "Default" }
    );
    let map = ctx.object(value, &shape)?;
    ctx.nested(value, |ctx| {
        let mut read = NestedRead::default();
        let mut complete = true;

        for (key, item) in map {
            let list_arg = matches!(
                key.as_str(),
                args::WHERE
                    | args::ORDER_BY
                    | args::CURSOR
                    | args::TAKE
                    | args::SKIP
                    | args::DISTINCT
            );
            let ok = match key.as_str() {
                args::SELECT | args::INCLUDE => true,
                _ if list_arg && many => match key.as_str() {
                    args::WHERE => {
                        read.filter = ctx.key(key, |ctx| predicate::parse(ctx, target, item));
                        read.filter.is_some()
                    }
                    args::ORDER_BY => match ctx.key(key, |ctx| {
                        order::parse_order_by(ctx, target, item, OrderScope::Rows)
                    }) {
                        Some(clauses) => {
                            read.order_by = clauses;
                            true
                        }
                        None => false,
                    },
                    args::CURSOR => {
                        read.pagination.cursor =
                            ctx.key(key, |ctx| unique::parse(ctx, target, item));
                        read.pagination.cursor.is_some()
                    }
                    args::TAKE => {
                        read.pagination.take = ctx.key(key, |ctx| order::parse_take(ctx, item));
                        read.pagination.take.is_some()
                    }
                    args::SKIP => {
                        read.pagination.skip = ctx.key(key, |ctx| order::parse_skip(ctx, item));
                        read.pagination.skip.is_some()
                    }
                    _ => match ctx.key(key, |ctx| order::parse_distinct(ctx, target, item)) {
                        Some(fields) => {
                            read.pagination.distinct = fields;
                            true
                        }
                        None => false,
                    },
                },
                _ => {
                    ctx.unknown_field(key, item, &shape);
                    false
                }
            };
            complete &= ok;
        }

        match parse(ctx, target, map) {
            Some(projection) => read.projection = projection,
            None => complete = false,
        }
        if many {
            order::require_order_for_cursor(ctx, map);
        }

        complete.then_some(read)
    })
}

/// `_count: true` counts every to-many relation; `_count: {select: {blogs: true}}` picks some
fn count(ctx: &mut Ctx<'_>, entity: &Entity, value: &Value) -> Option<Option<Vec<String>>> {
    let to_many: Vec<&Relation> = entity.relations.iter().filter(|r| r.is_to_many()).collect();
    if to_many.is_empty() {
        ctx.report(
            crate::error::ErrorKind::UnknownField,
            value,
            format!("{} has no to-many relations to count", entity.name),
        );
        return None;
    }
    let shape = Schema::shape_name(entity, "CountOutputTypeArgs");
    match value {
        Value::Bool(false) => Some(None),
        Value::Bool(true) => Some(Some(to_many.iter().map(|r| r.name.clone()).collect())),
        Value::Object(map) => {
            let mut complete = true;
            let mut picked = Vec::new();
            for (key, item) in map {
                if key != args::SELECT {
                    ctx.unknown_field(key, item, &shape);
                    complete = false;
                    continue;
                }
                let inner_shape = Schema::shape_name(entity, "CountOutputTypeSelect");
                let Some(select) = ctx.key(key, |ctx| ctx.object(item, &inner_shape)) else {
                    complete = false;
                    continue;
                };
                for (name, flag) in select {
                    if !to_many.iter().any(|r| &r.name == name) {
                        ctx.key(key, |ctx| ctx.unknown_field(name, flag, &inner_shape));
                        complete = false;
                        continue;
                    }
                    match ctx.key(key, |ctx| ctx.key(name, |ctx| ctx.boolean(flag))) {
                        Some(true) => picked.push(name.clone()),
                        Some(false) => {}
                        None => complete = false,
                    }
                }
            }
            complete.then_some(Some(picked))
        }
        other => {
            ctx.type_mismatch(&format!("a boolean or a {}", shape), other);
            None
        }
    }
}
