//! The recursive `where` tree of an entity.
//!
//! Relation filters reach the target entity through the [`EntityId`](crate::model::EntityId)
//! stored on the relation, so the tree for `User` can mention `Blog` which mentions
//! `User` again without any up-front expansion. Recursion only happens while walking
//! an actual input, and is bounded by `maxDepth`.

use crate::constants::filters;
use crate::context::{Ctx, Object};
use crate::filter::{parse_field_filter, FieldFilter};
use crate::model::{Entity, Member, Relation, Schema};
use serde_json::Value;

/// Implicit conjunction of conditions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Condition on a field, if the predicate carries one at its top level
    pub fn field(&self, name: &str) -> Option<&FieldFilter> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Field { field, filter } if field == name => Some(filter),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Vec<Predicate>),
    Field {
        field: String,
        filter: FieldFilter,
    },
    Relation {
        relation: String,
        filters: Vec<RelationFilter>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationFilter {
    Every(Predicate),
    Some(Predicate),
    None(Predicate),
    /// `None` matches an absent related row
    Is(Option<Predicate>),
    IsNot(Option<Predicate>),
}

pub(crate) fn parse(ctx: &mut Ctx<'_>, entity: &Entity, value: &Value) -> Option<Predicate> {
    let map = ctx.object(value, &Schema::shape_name(entity, "WhereInput"))?;
    ctx.nested(value, |ctx| parse_object(ctx, entity, map, &[]))
}

/// Parse the members of a where object, leaving out the keys in `skip`
pub(crate) fn parse_object(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    map: &Object,
    skip: &[&str],
) -> Option<Predicate> {
    let shape = Schema::shape_name(entity, "WhereInput");
    let mut conditions = Vec::new();
    let mut complete = true;

    for (key, value) in map {
        if skip.contains(&key.as_str()) {
            continue;
        }
        let condition = match key.as_str() {
            filters::AND => ctx
                .key(key, |ctx| {
                    ctx.one_or_many(value, |ctx, item| parse(ctx, entity, item))
                })
                .map(Condition::And),
            filters::OR => ctx
                .key(key, |ctx| {
                    ctx.many(value, "a list of where inputs", |ctx, item| {
                        parse(ctx, entity, item)
                    })
                })
                .map(Condition::Or),
            filters::NOT_UPPER => ctx
                .key(key, |ctx| {
                    ctx.one_or_many(value, |ctx, item| parse(ctx, entity, item))
                })
                .map(Condition::Not),
            name => match entity.member(name) {
                Some(Member::Field(field)) => ctx
                    .key(key, |ctx| parse_field_filter(ctx, field, value))
                    .map(|filter| Condition::Field {
                        field: field.name.clone(),
                        filter,
                    }),
                Some(Member::Relation(relation)) => ctx
                    .key(key, |ctx| parse_relation_filter(ctx, relation, value))
                    .map(|filters| Condition::Relation {
                        relation: relation.name.clone(),
                        filters,
                    }),
                None => {
                    ctx.unknown_field(key, value, &shape);
                    None
                }
            },
        };
        match condition {
            Some(condition) => conditions.push(condition),
            None => complete = false,
        }
    }

    complete.then_some(Predicate { conditions })
}

fn parse_relation_filter(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
) -> Option<Vec<RelationFilter>> {
    let schema = ctx.schema;
    let target = schema.target(relation);

    if relation.is_to_many() {
        let shape = Schema::shape_name(target, "ListRelationFilter");
        let map = ctx.object(value, &shape)?;
        let mut out = Vec::new();
        let mut complete = true;
        for (key, item) in map {
            let filter = match key.as_str() {
                filters::EVERY => ctx
                    .key(key, |ctx| parse(ctx, target, item))
                    .map(RelationFilter::Every),
                filters::SOME => ctx
                    .key(key, |ctx| parse(ctx, target, item))
                    .map(RelationFilter::Some),
                filters::NONE => ctx
                    .key(key, |ctx| parse(ctx, target, item))
                    .map(RelationFilter::None),
                _ => {
                    ctx.unknown_field(key, item, &shape);
                    None
                }
            };
            match filter {
                Some(filter) => out.push(filter),
                None => complete = false,
            }
        }
        return complete.then_some(out);
    }

    let shape = Schema::shape_name(
        target,
        if relation.nullable {
            "NullableRelationFilter"
        } else {
            "RelationFilter"
        },
    );
    match value {
        Value::Object(map)
            if map.contains_key(filters::IS) || map.contains_key(filters::IS_NOT) =>
        {
            let mut out = Vec::new();
            let mut complete = true;
            for (key, item) in map {
                let filter = match key.as_str() {
                    filters::IS => ctx
                        .key(key, |ctx| one_target(ctx, relation, item))
                        .map(RelationFilter::Is),
                    filters::IS_NOT => ctx
                        .key(key, |ctx| one_target(ctx, relation, item))
                        .map(RelationFilter::IsNot),
                    _ => {
                        ctx.unknown_field(key, item, &shape);
                        None
                    }
                };
                match filter {
                    Some(filter) => out.push(filter),
                    None => complete = false,
                }
            }
            complete.then_some(out)
        }
        // `author: {name: "x"}` is shorthand for `author: {is: {name: "x"}}`
        Value::Object(_) | Value::Null => {
            one_target(ctx, relation, value).map(|target| vec![RelationFilter::Is(target)])
        }
        other => {
            ctx.type_mismatch(&format!("a {}", shape), other);
            None
        }
    }
}

fn one_target(ctx: &mut Ctx<'_>, relation: &Relation, value: &Value) -> Option<Option<Predicate>> {
    if value.is_null() {
        if relation.nullable {
            return Some(None);
        }
        ctx.type_mismatch(
            &format!("a where input (`{}` is required)", relation.name),
            value,
        );
        return None;
    }
    let target = ctx.schema.target(relation);
    parse(ctx, target, value).map(Some)
}
