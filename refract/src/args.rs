//! Operation arguments: one entry point per operation kind, validating the whole
//! argument object before anything reaches the storage engine.

use crate::aggregate::{self, AggregateOp, AggregateSelection, CountSelection, GroupBy};
use crate::constants::{aggregations, args};
use crate::context::{Ctx, Object};
use crate::error::{ErrorKind, ValidationErrors};
use crate::model::{accessor_name, Entity, Schema};
use crate::mutation::{create, update, CreateData, Omit, UpdateData};
use crate::order::{self, OrderClause, OrderScope, Pagination};
use crate::predicate::{self, Predicate};
use crate::projection::{self, Projection};
use crate::unique::{self, UniqueWhere};
use heck::{ToLowerCamelCase, ToPascalCase};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    Count,
    Aggregate,
    GroupBy,
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Upsert,
    Delete,
    DeleteMany,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Self::FindUnique,
        Self::FindUniqueOrThrow,
        Self::FindFirst,
        Self::FindFirstOrThrow,
        Self::FindMany,
        Self::Count,
        Self::Aggregate,
        Self::GroupBy,
        Self::Create,
        Self::CreateMany,
        Self::Update,
        Self::UpdateMany,
        Self::Upsert,
        Self::Delete,
        Self::DeleteMany,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FindUnique => "findUnique",
            Self::FindUniqueOrThrow => "findUniqueOrThrow",
            Self::FindFirst => "findFirst",
            Self::FindFirstOrThrow => "findFirstOrThrow",
            Self::FindMany => "findMany",
            Self::Count => "count",
            Self::Aggregate => "aggregate",
            Self::GroupBy => "groupBy",
            Self::Create => "create",
            Self::CreateMany => "createMany",
            Self::Update => "update",
            Self::UpdateMany => "updateMany",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
            Self::DeleteMany => "deleteMany",
        }
    }

    /// Operations that scan an ordered row set and therefore take `orderBy`
    /// and pagination arguments
    pub fn scans(&self) -> bool {
        matches!(
            self,
            Self::FindFirst
                | Self::FindFirstOrThrow
                | Self::FindMany
                | Self::Count
                | Self::Aggregate
                | Self::GroupBy
        )
    }

    /// `where` is a unique selector rather than a filter
    fn unique_where(&self) -> bool {
        matches!(
            self,
            Self::FindUnique | Self::FindUniqueOrThrow | Self::Update | Self::Upsert | Self::Delete
        )
    }

    fn arguments(&self) -> &'static [&'static str] {
        use aggregations::*;
        use args::*;
        match self {
            Self::FindUnique | Self::FindUniqueOrThrow | Self::Delete => {
                &[WHERE, SELECT, INCLUDE]
            }
            Self::FindFirst | Self::FindFirstOrThrow | Self::FindMany => {
                &[WHERE, ORDER_BY, CURSOR, TAKE, SKIP, DISTINCT, SELECT, INCLUDE]
            }
            Self::Count => &[WHERE, ORDER_BY, CURSOR, TAKE, SKIP, DISTINCT, SELECT],
            Self::Aggregate => &[
                WHERE,
                ORDER_BY,
                CURSOR,
                TAKE,
                SKIP,
                UNDERSCORE_COUNT,
                UNDERSCORE_AVG,
                UNDERSCORE_SUM,
                UNDERSCORE_MIN,
                UNDERSCORE_MAX,
            ],
            Self::GroupBy => &[
                WHERE,
                BY,
                HAVING,
                ORDER_BY,
                TAKE,
                SKIP,
                UNDERSCORE_COUNT,
                UNDERSCORE_AVG,
                UNDERSCORE_SUM,
                UNDERSCORE_MIN,
                UNDERSCORE_MAX,
            ],
            Self::Create => &[DATA, SELECT, INCLUDE],
            Self::CreateMany => &[DATA, SKIP_DUPLICATES],
            Self::Update => &[WHERE, DATA, SELECT, INCLUDE],
            Self::UpdateMany => &[WHERE, DATA],
            Self::Upsert => &[WHERE, CREATE, UPDATE, SELECT, INCLUDE],
            Self::DeleteMany => &[WHERE],
        }
    }

    fn required_arguments(&self) -> &'static [&'static str] {
        use args::*;
        match self {
            Self::FindUnique | Self::FindUniqueOrThrow | Self::Delete => &[WHERE],
            Self::GroupBy => &[BY],
            Self::Create | Self::CreateMany | Self::UpdateMany => &[DATA],
            Self::Update => &[WHERE, DATA],
            Self::Upsert => &[WHERE, CREATE, UPDATE],
            _ => &[],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    /// Accepts `findMany` as well as `find_many`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_lower_camel_case();
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// Operation-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Create(CreateData),
    CreateMany {
        data: Vec<CreateData>,
        skip_duplicates: bool,
    },
    Update(UpdateData),
    Upsert {
        create: CreateData,
        update: UpdateData,
    },
    Count(Option<CountSelection>),
    Aggregate(AggregateSelection),
    GroupBy(GroupBy),
}

/// Arguments that passed validation, ready for the storage engine
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs {
    pub operation: Operation,
    pub entity: String,
    pub projection: Option<Projection>,
    /// `where` of filtering operations
    pub filter: Option<Predicate>,
    /// `where` of point operations
    pub unique: Option<UniqueWhere>,
    pub order_by: Vec<OrderClause>,
    pub pagination: Pagination,
    pub payload: Option<Payload>,
}

impl ValidatedArgs {
    fn new(operation: Operation, entity: &Entity) -> Self {
        Self {
            operation,
            entity: entity.name.clone(),
            projection: None,
            filter: None,
            unique: None,
            order_by: Vec::new(),
            pagination: Pagination::default(),
            payload: None,
        }
    }
}

impl Schema {
    /// Validate the raw arguments of one operation on one entity.
    ///
    /// Pure and deterministic: the same model and input always produce the same
    /// result, and every violation in the input is reported.
    pub fn validate(
        &self,
        operation: Operation,
        entity: &str,
        raw: &Value,
    ) -> Result<ValidatedArgs, ValidationErrors> {
        self.run(entity, |ctx, entity| {
            log::trace!("validating {}.{}", accessor_name(entity), operation);
            compose(ctx, operation, entity, raw)
        })
    }

    pub fn validate_where(&self, entity: &str, raw: &Value) -> Result<Predicate, ValidationErrors> {
        self.run(entity, |ctx, entity| {
            log::trace!("validating {} where input", entity.name);
            predicate::parse(ctx, entity, raw)
        })
    }

    pub fn validate_where_unique(
        &self,
        entity: &str,
        raw: &Value,
    ) -> Result<UniqueWhere, ValidationErrors> {
        self.run(entity, |ctx, entity| {
            log::trace!("validating {} where unique input", entity.name);
            unique::parse(ctx, entity, raw)
        })
    }

    pub fn validate_create(&self, entity: &str, raw: &Value) -> Result<CreateData, ValidationErrors> {
        self.run(entity, |ctx, entity| {
            log::trace!("validating {} create input", entity.name);
            create::parse(ctx, entity, raw, Omit::none())
        })
    }

    pub fn validate_update(&self, entity: &str, raw: &Value) -> Result<UpdateData, ValidationErrors> {
        self.run(entity, |ctx, entity| {
            log::trace!("validating {} update input", entity.name);
            update::parse(ctx, entity, raw, Omit::none())
        })
    }

    pub fn validate_order_by(
        &self,
        entity: &str,
        raw: &Value,
    ) -> Result<Vec<OrderClause>, ValidationErrors> {
        self.run(entity, |ctx, entity| {
            order::parse_order_by(ctx, entity, raw, OrderScope::Rows)
        })
    }

    fn run<T>(
        &self,
        entity: &str,
        f: impl FnOnce(&mut Ctx<'_>, &Entity) -> Option<T>,
    ) -> Result<T, ValidationErrors> {
        let mut ctx = Ctx::new(self);
        let Some(resolved) = self.entity(entity) else {
            ctx.report(
                ErrorKind::UnknownField,
                &Value::String(entity.to_string()),
                format!("`{}` is not an entity of this schema", entity),
            );
            return ctx.finish(None);
        };
        let out = f(&mut ctx, resolved);
        ctx.finish(out)
    }
}

fn compose(
    ctx: &mut Ctx<'_>,
    operation: Operation,
    entity: &Entity,
    raw: &Value,
) -> Option<ValidatedArgs> {
    let shape = format!("{}{}Args", entity.name, operation.name().to_pascal_case());
    let empty = Object::new();
    let map = match raw {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            ctx.type_mismatch(&format!("a {} object", shape), other);
            return None;
        }
    };

    let allowed = operation.arguments();
    let mut complete = true;
    for (key, value) in map {
        if !allowed.contains(&key.as_str()) {
            ctx.unknown_field(key, value, &shape);
            complete = false;
        }
    }
    for key in operation.required_arguments() {
        if !map.contains_key(*key) {
            ctx.missing(key, &shape);
            complete = false;
        }
    }

    let mut out = ValidatedArgs::new(operation, entity);

    // `by` decides what `having` and `orderBy` may refer to
    let by = match (operation, map.get(args::BY)) {
        (Operation::GroupBy, Some(value)) => {
            let parsed = ctx.key(args::BY, |ctx| aggregate::parse_by(ctx, entity, value));
            complete &= parsed.is_some();
            parsed
        }
        _ => None,
    };
    let mut having = None;
    let mut selection = AggregateSelection::default();

    for (key, value) in map {
        if !allowed.contains(&key.as_str()) {
            continue;
        }
        let ok = match key.as_str() {
            args::WHERE if operation.unique_where() => {
                out.unique = ctx.key(key, |ctx| unique::parse(ctx, entity, value));
                out.unique.is_some()
            }
            args::WHERE => {
                out.filter = ctx.key(key, |ctx| predicate::parse(ctx, entity, value));
                out.filter.is_some()
            }
            args::ORDER_BY => {
                let scope = match (operation, &by) {
                    (Operation::GroupBy, Some(by)) => Some(OrderScope::Groups(by.as_slice())),
                    // Grouped ordering cannot be checked against an invalid `by`
                    (Operation::GroupBy, None) => None,
                    _ => Some(OrderScope::Rows),
                };
                match scope {
                    Some(scope) => match ctx
                        .key(key, |ctx| order::parse_order_by(ctx, entity, value, scope))
                    {
                        Some(clauses) => {
                            out.order_by = clauses;
                            true
                        }
                        None => false,
                    },
                    None => false,
                }
            }
            args::CURSOR => {
                out.pagination.cursor = ctx.key(key, |ctx| unique::parse(ctx, entity, value));
                out.pagination.cursor.is_some()
            }
            args::TAKE => {
                out.pagination.take = ctx.key(key, |ctx| order::parse_take(ctx, value));
                out.pagination.take.is_some()
            }
            args::SKIP => {
                out.pagination.skip = ctx.key(key, |ctx| order::parse_skip(ctx, value));
                out.pagination.skip.is_some()
            }
            args::DISTINCT => match ctx.key(key, |ctx| order::parse_distinct(ctx, entity, value)) {
                Some(fields) => {
                    out.pagination.distinct = fields;
                    true
                }
                None => false,
            },
            args::SELECT if operation == Operation::Count => {
                match ctx.key(key, |ctx| aggregate::parse_count_selection(ctx, entity, value)) {
                    Some(count) => {
                        out.payload = Some(Payload::Count(Some(count)));
                        true
                    }
                    None => false,
                }
            }
            // Projections are parsed together below
            args::SELECT | args::INCLUDE => true,
            args::DATA => match data(ctx, operation, entity, map, value) {
                Some(payload) => {
                    out.payload = Some(payload);
                    true
                }
                None => false,
            },
            args::SKIP_DUPLICATES => ctx.key(key, |ctx| ctx.boolean(value)).is_some(),
            // upsert payloads are parsed together below
            args::CREATE | args::UPDATE => true,
            args::BY => true,
            args::HAVING => match &by {
                Some(by) => {
                    having = ctx.key(key, |ctx| aggregate::parse_having(ctx, entity, by, value));
                    having.is_some()
                }
                None => false,
            },
            other => match AggregateOp::from_key(other) {
                Some(op) => ctx.key(key, |ctx| {
                    aggregate::parse_selector(ctx, entity, op, value, &mut selection)
                }),
                None => false,
            },
        };
        complete &= ok;
    }

    if operation == Operation::Upsert {
        if let (Some(create_raw), Some(update_raw)) = (map.get(args::CREATE), map.get(args::UPDATE))
        {
            let create = ctx.key(args::CREATE, |ctx| {
                create::parse(ctx, entity, create_raw, Omit::none())
            });
            let update = ctx.key(args::UPDATE, |ctx| {
                update::parse(ctx, entity, update_raw, Omit::none())
            });
            match (create, update) {
                (Some(create), Some(update)) => {
                    out.payload = Some(Payload::Upsert { create, update })
                }
                _ => complete = false,
            }
        }
    }

    if allowed.contains(&args::INCLUDE) {
        match projection::parse(ctx, entity, map) {
            Some(projection) => out.projection = projection,
            None => complete = false,
        }
    }

    match operation {
        Operation::Count if out.payload.is_none() => out.payload = Some(Payload::Count(None)),
        Operation::Aggregate => out.payload = Some(Payload::Aggregate(selection)),
        Operation::GroupBy => {
            aggregate::require_order_for_paging(ctx, map);
            if let Some(by) = by {
                out.payload = Some(Payload::GroupBy(GroupBy {
                    by,
                    having,
                    aggregates: selection,
                }));
            }
        }
        _ => {}
    }
    if operation.scans() && operation != Operation::GroupBy {
        order::require_order_for_cursor(ctx, map);
    }

    complete.then_some(out)
}

/// `data` of the write operations
fn data(
    ctx: &mut Ctx<'_>,
    operation: Operation,
    entity: &Entity,
    map: &Object,
    value: &Value,
) -> Option<Payload> {
    ctx.key(args::DATA, |ctx| match operation {
        Operation::Create => create::parse(ctx, entity, value, Omit::none()).map(Payload::Create),
        Operation::CreateMany => {
            let data = ctx.one_or_many(value, |ctx, row| {
                create::parse_scalars(ctx, entity, row, Omit::none())
            })?;
            let skip_duplicates = map
                .get(args::SKIP_DUPLICATES)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Some(Payload::CreateMany {
                data,
                skip_duplicates,
            })
        }
        Operation::Update => update::parse(ctx, entity, value, Omit::none()).map(Payload::Update),
        Operation::UpdateMany => {
            update::parse_scalars(ctx, entity, value, Omit::none()).map(Payload::Update)
        }
        _ => None,
    })
}
