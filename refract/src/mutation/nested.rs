//! Relation writes performed as part of writing the parent row.

use super::{create, update, CreateData, Omit, UpdateData};
use crate::constants::{args, operations};
use crate::context::{Ctx, Object};
use crate::error::ErrorKind;
use crate::model::{Relation, Schema};
use crate::predicate::{self, Predicate};
use crate::unique::{self, UniqueWhere};
use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum WriteMode {
    Create,
    Update,
}

/// Which related rows an operation applies to
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// The row currently linked through a to-one relation
    Linked,
    /// The linked to-one row, if it matches
    Filtered(Predicate),
    Unique(UniqueWhere),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOrCreate {
    pub where_: UniqueWhere,
    pub create: CreateData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedUpsert {
    /// Required on to-many relations; an optional filter on to-one relations
    pub where_: Option<Target>,
    pub create: CreateData,
    pub update: UpdateData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedUpdate {
    pub where_: Target,
    pub data: UpdateData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NestedOp {
    Create(Vec<CreateData>),
    CreateMany {
        data: Vec<CreateData>,
        skip_duplicates: bool,
    },
    Connect(Vec<UniqueWhere>),
    ConnectOrCreate(Vec<ConnectOrCreate>),
    Upsert(Vec<NestedUpsert>),
    Update(Vec<NestedUpdate>),
    UpdateMany(Vec<(Predicate, UpdateData)>),
    Delete(Vec<Target>),
    DeleteMany(Vec<Predicate>),
    Disconnect(Vec<Target>),
    /// Replace the whole to-many set
    Set(Vec<UniqueWhere>),
}

impl NestedOp {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Create(_) => operations::CREATE,
            Self::CreateMany { .. } => operations::CREATE_MANY,
            Self::Connect(_) => operations::CONNECT,
            Self::ConnectOrCreate(_) => operations::CONNECT_OR_CREATE,
            Self::Upsert(_) => operations::UPSERT,
            Self::Update(_) => operations::UPDATE,
            Self::UpdateMany(_) => operations::UPDATE_MANY,
            Self::Delete(_) => operations::DELETE,
            Self::DeleteMany(_) => operations::DELETE_MANY,
            Self::Disconnect(_) => operations::DISCONNECT,
            Self::Set(_) => operations::SET,
        }
    }
}

/// All nested operations on one relation
#[derive(Debug, Clone, PartialEq)]
pub struct NestedWrite {
    pub relation: String,
    pub ops: Vec<NestedOp>,
}

impl NestedWrite {
    pub fn op(&self, key: &str) -> Option<&NestedOp> {
        self.ops.iter().find(|op| op.key() == key)
    }
}

pub(crate) fn inverse_reason(schema: &Schema, relation: &Relation) -> String {
    let target = schema.target(relation);
    match &relation.opposite {
        Some(opposite) => format!(
            "`{}` is the inverse side of its relation; write it through `{}.{}`",
            relation.name, target.name, opposite
        ),
        None => format!(
            "`{}` is the inverse side of its relation and accepts no writes",
            relation.name
        ),
    }
}

pub(crate) fn parse(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
    mode: WriteMode,
) -> Option<NestedWrite> {
    let schema = ctx.schema;
    let target = schema.target(relation);
    let omit = Omit::back(schema, relation);
    let many = relation.is_to_many();
    let shape = format!(
        "{}{}{}{}Input",
        target.name,
        match mode {
            WriteMode::Create => "CreateNested",
            WriteMode::Update => "UpdateNested",
        },
        if many { "Many" } else { "One" },
        omit.without()
    );
    let map = ctx.object(value, &shape)?;

    let mut ops = Vec::new();
    let mut complete = true;

    for (key, item) in map {
        let available = match key.as_str() {
            operations::CREATE | operations::CONNECT | operations::CONNECT_OR_CREATE => true,
            operations::CREATE_MANY => many,
            operations::UPSERT
            | operations::UPDATE
            | operations::DELETE
            | operations::DISCONNECT => mode == WriteMode::Update,
            operations::UPDATE_MANY | operations::DELETE_MANY => {
                mode == WriteMode::Update && many
            }
            operations::SET => mode == WriteMode::Update && (many || relation.is_required_one()),
            _ => false,
        };
        if !available {
            ctx.unknown_field(key, item, &shape);
            complete = false;
            continue;
        }
        if let Some(reason) = removal_violation(schema, relation, key) {
            ctx.key(key, |ctx| {
                ctx.report(ErrorKind::RequiredRelationViolation, item, reason)
            });
            complete = false;
            continue;
        }

        let op = ctx.key(key, |ctx| match key.as_str() {
            operations::CREATE => {
                payloads(ctx, many, item, |ctx, v| create::parse(ctx, target, v, omit))
                    .map(NestedOp::Create)
            }
            operations::CREATE_MANY => create_many(ctx, relation, item, omit),
            operations::CONNECT => {
                payloads(ctx, many, item, |ctx, v| unique::parse(ctx, target, v))
                    .map(NestedOp::Connect)
            }
            operations::CONNECT_OR_CREATE => payloads(ctx, many, item, |ctx, v| {
                connect_or_create(ctx, relation, v, omit)
            })
            .map(NestedOp::ConnectOrCreate),
            operations::UPSERT => {
                payloads(ctx, many, item, |ctx, v| upsert(ctx, relation, v, omit))
                    .map(NestedOp::Upsert)
            }
            operations::UPDATE => payloads(ctx, many, item, |ctx, v| {
                nested_update(ctx, relation, v, omit)
            })
            .map(NestedOp::Update),
            operations::UPDATE_MANY => ctx
                .one_or_many(item, |ctx, v| update_many(ctx, relation, v, omit))
                .map(NestedOp::UpdateMany),
            operations::DELETE => targets(ctx, relation, item).map(NestedOp::Delete),
            operations::DELETE_MANY => ctx
                .one_or_many(item, |ctx, v| predicate::parse(ctx, target, v))
                .map(NestedOp::DeleteMany),
            operations::DISCONNECT => targets(ctx, relation, item).map(NestedOp::Disconnect),
            _ => ctx
                .one_or_many(item, |ctx, v| unique::parse(ctx, target, v))
                .map(NestedOp::Set),
        });
        match op {
            // `disconnect: false` on a to-one relation writes nothing
            Some(NestedOp::Delete(targets) | NestedOp::Disconnect(targets))
                if !many && targets.is_empty() => {}
            Some(op) => ops.push(op),
            None => complete = false,
        }
    }

    complete.then(|| NestedWrite {
        relation: relation.name.clone(),
        ops,
    })
}

/// Operations that would leave a required foreign key without a value
fn removal_violation(schema: &Schema, relation: &Relation, key: &str) -> Option<String> {
    let removes = matches!(
        key,
        operations::DISCONNECT | operations::DELETE | operations::SET
    );
    if !removes {
        return None;
    }
    if relation.is_required_one() {
        return Some(format!(
            "`{}` is a required relation; `{}` would leave its foreign key without a value",
            relation.name, key
        ));
    }
    if relation.is_to_many() && key != operations::DELETE {
        if let Some(opposite) = schema.opposite(relation).filter(|o| o.is_required_one()) {
            return Some(format!(
                "`{}` on `{}` would leave the required relation `{}.{}` of the removed rows without a value",
                key,
                relation.name,
                schema.target(relation).name,
                opposite.name
            ));
        }
    }
    None
}

/// One payload for to-one relations, one or many for to-many relations
fn payloads<R>(
    ctx: &mut Ctx<'_>,
    many: bool,
    value: &Value,
    f: impl FnMut(&mut Ctx<'_>, &Value) -> Option<R>,
) -> Option<Vec<R>> {
    if many {
        ctx.one_or_many(value, f)
    } else {
        let mut f = f;
        f(ctx, value).map(|item| vec![item])
    }
}

/// `true`, `false` or a where input on to-one relations; unique selectors on to-many
fn targets(ctx: &mut Ctx<'_>, relation: &Relation, value: &Value) -> Option<Vec<Target>> {
    let target = ctx.schema.target(relation);
    if relation.is_to_many() {
        return ctx
            .one_or_many(value, |ctx, v| unique::parse(ctx, target, v))
            .map(|items| items.into_iter().map(Target::Unique).collect());
    }
    match value {
        Value::Bool(true) => Some(vec![Target::Linked]),
        Value::Bool(false) => Some(Vec::new()),
        Value::Object(_) => {
            predicate::parse(ctx, target, value).map(|p| vec![Target::Filtered(p)])
        }
        other => {
            ctx.type_mismatch("a boolean or a where input", other);
            None
        }
    }
}

/// Check that `map` has only `allowed` keys and all `required` keys
fn strict_keys(
    ctx: &mut Ctx<'_>,
    map: &Object,
    shape: &str,
    allowed: &[&str],
    required: &[&str],
) -> bool {
    let mut ok = true;
    for (key, item) in map {
        if !allowed.contains(&key.as_str()) {
            ctx.unknown_field(key, item, shape);
            ok = false;
        }
    }
    for key in required {
        if !map.contains_key(*key) {
            ctx.missing(key, shape);
            ok = false;
        }
    }
    ok
}

fn create_many(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
    omit: Omit<'_>,
) -> Option<NestedOp> {
    let target = ctx.schema.target(relation);
    let shape = format!("{}CreateManyEnvelopeInput", omit.shape(target, "CreateMany"));
    let map = ctx.object(value, &shape)?;
    if !strict_keys(
        ctx,
        map,
        &shape,
        &[args::DATA, args::SKIP_DUPLICATES],
        &[args::DATA],
    ) {
        return None;
    }
    let data = ctx.key(args::DATA, |ctx| {
        ctx.one_or_many(&map[args::DATA], |ctx, v| {
            create::parse_scalars(ctx, target, v, omit)
        })
    });
    let skip_duplicates = match map.get(args::SKIP_DUPLICATES) {
        Some(flag) => ctx.key(args::SKIP_DUPLICATES, |ctx| ctx.boolean(flag))?,
        None => false,
    };
    Some(NestedOp::CreateMany {
        data: data?,
        skip_duplicates,
    })
}

fn connect_or_create(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
    omit: Omit<'_>,
) -> Option<ConnectOrCreate> {
    let target = ctx.schema.target(relation);
    let shape = omit.shape(target, "CreateOrConnect");
    let map = ctx.object(value, &shape)?;
    if !strict_keys(
        ctx,
        map,
        &shape,
        &[args::WHERE, args::CREATE],
        &[args::WHERE, args::CREATE],
    ) {
        return None;
    }
    let where_ = ctx.key(args::WHERE, |ctx| unique::parse(ctx, target, &map[args::WHERE]));
    let create = ctx.key(args::CREATE, |ctx| {
        create::parse(ctx, target, &map[args::CREATE], omit)
    });
    Some(ConnectOrCreate {
        where_: where_?,
        create: create?,
    })
}

fn upsert(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
    omit: Omit<'_>,
) -> Option<NestedUpsert> {
    let target = ctx.schema.target(relation);
    let shape = omit.shape(target, "Upsert");
    let map = ctx.object(value, &shape)?;
    let required: &[&str] = if relation.is_to_many() {
        &[args::WHERE, args::CREATE, args::UPDATE]
    } else {
        &[args::CREATE, args::UPDATE]
    };
    if !strict_keys(
        ctx,
        map,
        &shape,
        &[args::WHERE, args::CREATE, args::UPDATE],
        required,
    ) {
        return None;
    }
    let where_ = match map.get(args::WHERE) {
        Some(raw) => Some(ctx.key(args::WHERE, |ctx| selector(ctx, relation, raw))),
        None => None,
    };
    let create = ctx.key(args::CREATE, |ctx| {
        create::parse(ctx, target, &map[args::CREATE], omit)
    });
    let update = ctx.key(args::UPDATE, |ctx| {
        update::parse(ctx, target, &map[args::UPDATE], omit)
    });
    Some(NestedUpsert {
        where_: match where_ {
            Some(parsed) => Some(parsed?),
            None => None,
        },
        create: create?,
        update: update?,
    })
}

/// Unique selector on to-many relations, a where filter on to-one relations
fn selector(ctx: &mut Ctx<'_>, relation: &Relation, value: &Value) -> Option<Target> {
    let target = ctx.schema.target(relation);
    if relation.is_to_many() {
        unique::parse(ctx, target, value).map(Target::Unique)
    } else {
        predicate::parse(ctx, target, value).map(Target::Filtered)
    }
}

/// To-many: `{where, data}`. To-one: the data itself, or `{where?, data}`.
fn nested_update(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
    omit: Omit<'_>,
) -> Option<NestedUpdate> {
    let target = ctx.schema.target(relation);
    let envelope = omit.shape(target, "UpdateWithWhereUnique");
    let wrapped = relation.is_to_many()
        || value
            .as_object()
            .is_some_and(|m| m.contains_key(args::DATA) && target.member(args::DATA).is_none());

    if !wrapped {
        return update::parse(ctx, target, value, omit).map(|data| NestedUpdate {
            where_: Target::Linked,
            data,
        });
    }

    let map = ctx.object(value, &envelope)?;
    let required: &[&str] = if relation.is_to_many() {
        &[args::WHERE, args::DATA]
    } else {
        &[args::DATA]
    };
    if !strict_keys(ctx, map, &envelope, &[args::WHERE, args::DATA], required) {
        return None;
    }
    let where_ = match map.get(args::WHERE) {
        Some(raw) => ctx.key(args::WHERE, |ctx| selector(ctx, relation, raw)),
        None => Some(Target::Linked),
    };
    let data = ctx.key(args::DATA, |ctx| {
        update::parse(ctx, target, &map[args::DATA], omit)
    });
    Some(NestedUpdate {
        where_: where_?,
        data: data?,
    })
}

fn update_many(
    ctx: &mut Ctx<'_>,
    relation: &Relation,
    value: &Value,
    omit: Omit<'_>,
) -> Option<(Predicate, UpdateData)> {
    let target = ctx.schema.target(relation);
    let shape = omit.shape(target, "UpdateManyWithWhere");
    let map = ctx.object(value, &shape)?;
    if !strict_keys(
        ctx,
        map,
        &shape,
        &[args::WHERE, args::DATA],
        &[args::WHERE, args::DATA],
    ) {
        return None;
    }
    let filter = ctx.key(args::WHERE, |ctx| {
        predicate::parse(ctx, target, &map[args::WHERE])
    });
    let data = ctx.key(args::DATA, |ctx| {
        update::parse_scalars(ctx, target, &map[args::DATA], omit)
    });
    Some((filter?, data?))
}
