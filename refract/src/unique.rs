//! Point lookups: the `whereUnique` union of identity branches.

use crate::context::{Ctx, Object};
use crate::error::ErrorKind;
use crate::model::{CompoundUniqueKey, Entity, IdentityBranch, Schema};
use crate::predicate::{self, Predicate};
use crate::value::{coerce, ScalarValue};
use serde_json::Value;

/// A satisfied identity branch
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    PrimaryKey {
        field: String,
        value: ScalarValue,
    },
    Unique {
        field: String,
        value: ScalarValue,
    },
    /// Values follow the key's declared field order, whatever the input order was
    Compound {
        key: String,
        primary: bool,
        values: Vec<(String, ScalarValue)>,
    },
}

impl Identity {
    pub fn branch_name(&self) -> &str {
        match self {
            Self::PrimaryKey { field, .. } | Self::Unique { field, .. } => field,
            Self::Compound { key, .. } => key,
        }
    }
}

/// Every identity branch the input satisfies, plus the remaining `where` members
/// as a refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueWhere {
    pub identities: Vec<Identity>,
    pub refinement: Predicate,
}

impl UniqueWhere {
    /// The branch with the highest priority: primary key, unique field, compound key
    pub fn identity(&self) -> Option<&Identity> {
        self.identities.first()
    }
}

enum Attempt {
    Matched(Identity, Vec<String>),
    Missing(String),
    Failed,
}

pub(crate) fn parse(ctx: &mut Ctx<'_>, entity: &Entity, value: &Value) -> Option<UniqueWhere> {
    let shape = Schema::shape_name(entity, "WhereUniqueInput");
    let map = ctx.object(value, &shape)?;
    ctx.nested(value, |ctx| {
        let mut identities = Vec::new();
        let mut consumed: Vec<String> = Vec::new();
        let mut missing = Vec::new();
        let mut failed = false;

        for branch in &entity.branches {
            if let IdentityBranch::Compound { key, .. } = branch {
                // The compound name is never a where member
                consumed.push(key.name.clone());
            }
            match attempt(ctx, entity, branch, map) {
                Attempt::Matched(identity, keys) => {
                    identities.push(identity);
                    consumed.extend(keys);
                }
                Attempt::Missing(reason) => missing.push(reason),
                Attempt::Failed => {
                    failed = true;
                    consumed.extend(branch.fields().into_iter().map(str::to_string));
                }
            }
        }

        let skip: Vec<&str> = consumed.iter().map(String::as_str).collect();
        let refinement = predicate::parse_object(ctx, entity, map, &skip);

        if identities.is_empty() {
            // A branch that was attempted and failed on its value has already been reported
            if !failed {
                ctx.report(
                    ErrorKind::UnionMismatch,
                    value,
                    format!(
                        "{} must satisfy at least one identity branch: {}",
                        shape,
                        missing.join("; ")
                    ),
                );
            }
            return None;
        }
        if failed {
            return None;
        }

        Some(UniqueWhere {
            identities,
            refinement: refinement?,
        })
    })
}

fn attempt(ctx: &mut Ctx<'_>, entity: &Entity, branch: &IdentityBranch, map: &Object) -> Attempt {
    match branch {
        IdentityBranch::PrimaryKey { field } | IdentityBranch::UniqueField { field } => {
            match map.get(field) {
                None => Attempt::Missing(format!("`{}` is missing", field)),
                // A filter object on a unique field is a refinement, not an identity
                Some(Value::Object(_)) => {
                    Attempt::Missing(format!("`{}` needs a literal value, not a filter", field))
                }
                Some(raw) => match ctx.key(field, |ctx| identity_value(ctx, entity, field, raw)) {
                    Some(value) => {
                        let identity = if matches!(branch, IdentityBranch::PrimaryKey { .. }) {
                            Identity::PrimaryKey {
                                field: field.clone(),
                                value,
                            }
                        } else {
                            Identity::Unique {
                                field: field.clone(),
                                value,
                            }
                        };
                        Attempt::Matched(identity, vec![field.clone()])
                    }
                    None => Attempt::Failed,
                },
            }
        }
        IdentityBranch::Compound { key, primary } => match map.get(&key.name) {
            Some(raw) => match ctx.key(&key.name, |ctx| compound(ctx, entity, key, raw)) {
                Some(values) => Attempt::Matched(
                    Identity::Compound {
                        key: key.name.clone(),
                        primary: *primary,
                        values,
                    },
                    Vec::new(),
                ),
                None => Attempt::Failed,
            },
            None => flattened(ctx, entity, key, *primary, map),
        },
    }
}

/// All constituent fields given as top-level literals
fn flattened(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    key: &CompoundUniqueKey,
    primary: bool,
    map: &Object,
) -> Attempt {
    let absent: Vec<&str> = key
        .fields
        .iter()
        .filter(|f| !matches!(map.get(f.as_str()), Some(v) if !v.is_object()))
        .map(String::as_str)
        .collect();
    if !absent.is_empty() {
        return Attempt::Missing(format!(
            "`{}` requires {} (missing {})",
            key.name,
            key.fields.join(", "),
            absent.join(", ")
        ));
    }
    let mut values = Vec::with_capacity(key.fields.len());
    let mut complete = true;
    for field in &key.fields {
        let raw = &map[field.as_str()];
        match ctx.key(field, |ctx| identity_value(ctx, entity, field, raw)) {
            Some(value) => values.push((field.clone(), value)),
            None => complete = false,
        }
    }
    if !complete {
        return Attempt::Failed;
    }
    Attempt::Matched(
        Identity::Compound {
            key: key.name.clone(),
            primary,
            values,
        },
        key.fields.clone(),
    )
}

/// `{provider_providerAccountId: {provider, providerAccountId}}`, keys in any order
fn compound(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    key: &CompoundUniqueKey,
    value: &Value,
) -> Option<Vec<(String, ScalarValue)>> {
    let shape = format!("{}CompoundUniqueInput", key.name);
    let map = ctx.object(value, &shape)?;
    let mut complete = true;
    for (name, item) in map {
        if !key.fields.contains(name) {
            ctx.unknown_field(name, item, &shape);
            complete = false;
        }
    }

    let absent: Vec<&str> = key
        .fields
        .iter()
        .filter(|f| !map.contains_key(f.as_str()))
        .map(String::as_str)
        .collect();
    if !absent.is_empty() {
        ctx.report(
            ErrorKind::UnionMismatch,
            value,
            format!(
                "compound key `{}` must be supplied in full ({}); missing {}",
                key.name,
                key.fields.join(", "),
                absent.join(", ")
            ),
        );
        return None;
    }

    let mut values = Vec::with_capacity(key.fields.len());
    for field in &key.fields {
        let raw = &map[field.as_str()];
        match ctx.key(field, |ctx| identity_value(ctx, entity, field, raw)) {
            Some(value) => values.push((field.clone(), value)),
            None => complete = false,
        }
    }
    complete.then_some(values)
}

/// Identity values are non-null literals of the field's kind
fn identity_value(
    ctx: &mut Ctx<'_>,
    entity: &Entity,
    field: &str,
    raw: &Value,
) -> Option<ScalarValue> {
    match entity.field(field) {
        Some(field) => coerce(ctx, field.kind, false, raw),
        None => {
            ctx.unknown_field(field, raw, &entity.name);
            None
        }
    }
}
