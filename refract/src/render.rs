//! Canonical rendering of validated values back into the raw input grammar.
//!
//! Rendering is lossless: feeding the output of [`ToInput::to_input`] back through
//! the matching validation entry point yields an equal value. Shorthands are
//! expanded (`status: "DRAFT"` renders as `status: {equals: "DRAFT"}`).

use crate::aggregate::{AggregateOp, AggregateSelection, CountSelection, GroupBy, Having, HavingCondition};
use crate::args::{Payload, ValidatedArgs};
use crate::constants::{aggregations, args, filters, operations};
use crate::context::Object;
use crate::enums::{BuiltinEnum, QueryMode};
use crate::filter::{AggregateFilter, FieldFilter, FieldOp, ListFilter, ListOp, Negation, ScalarFilter};
use crate::mutation::{
    CreateData, FieldWrite, NestedOp, NestedUpdate, NestedWrite, Target, UpdateData,
};
use crate::order::{OrderClause, OrderTarget, Pagination};
use crate::predicate::{Condition, Predicate, RelationFilter};
use crate::projection::{NestedRead, Projection, Selection};
use crate::unique::{Identity, UniqueWhere};
use crate::value::ScalarValue;
use serde_json::Value;

/// Render a validated value as raw input
pub trait ToInput {
    fn to_input(&self) -> Value;
}

fn list(values: &[ScalarValue]) -> Value {
    Value::Array(values.iter().map(ScalarValue::to_json).collect())
}

/// A single element renders bare, several as an array
fn one_or_many<T>(items: &[T], render: impl Fn(&T) -> Value) -> Value {
    match items {
        [single] => render(single),
        many => Value::Array(many.iter().map(render).collect()),
    }
}

fn merge(into: &mut Object, value: Value) {
    if let Value::Object(map) = value {
        into.extend(map);
    }
}

impl ToInput for ScalarFilter {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        for op in &self.ops {
            let (key, value) = match op {
                FieldOp::Equals(v) => (filters::EQUALS, v.to_json()),
                FieldOp::In(vs) => (filters::IN, list(vs)),
                FieldOp::NotIn(vs) => (filters::NOT_IN, list(vs)),
                FieldOp::Lt(v) => (filters::LOWER_THAN, v.to_json()),
                FieldOp::Lte(v) => (filters::LOWER_THAN_OR_EQUAL, v.to_json()),
                FieldOp::Gt(v) => (filters::GREATER_THAN, v.to_json()),
                FieldOp::Gte(v) => (filters::GREATER_THAN_OR_EQUAL, v.to_json()),
                FieldOp::Contains(s) => (filters::CONTAINS, Value::String(s.clone())),
                FieldOp::StartsWith(s) => (filters::STARTS_WITH, Value::String(s.clone())),
                FieldOp::EndsWith(s) => (filters::ENDS_WITH, Value::String(s.clone())),
                FieldOp::Not(Negation::Value(v)) => (filters::NOT, v.to_json()),
                FieldOp::Not(Negation::Filter(inner)) => (filters::NOT, inner.to_input()),
            };
            map.insert(key.to_string(), value);
        }
        if self.mode == QueryMode::Insensitive {
            map.insert(
                filters::MODE.to_string(),
                Value::String(self.mode.as_str().to_string()),
            );
        }
        Value::Object(map)
    }
}

impl ToInput for ListFilter {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        for op in &self.ops {
            let (key, value) = match op {
                ListOp::Equals(Some(vs)) => (filters::EQUALS, list(vs)),
                ListOp::Equals(None) => (filters::EQUALS, Value::Null),
                ListOp::Has(v) => (filters::HAS, v.to_json()),
                ListOp::HasEvery(vs) => (filters::HAS_EVERY, list(vs)),
                ListOp::HasSome(vs) => (filters::HAS_SOME, list(vs)),
                ListOp::IsEmpty(b) => (filters::IS_EMPTY, Value::Bool(*b)),
            };
            map.insert(key.to_string(), value);
        }
        Value::Object(map)
    }
}

impl ToInput for FieldFilter {
    fn to_input(&self) -> Value {
        match self {
            Self::Scalar(filter) => filter.to_input(),
            Self::List(filter) => filter.to_input(),
        }
    }
}

impl ToInput for AggregateFilter {
    fn to_input(&self) -> Value {
        let mut map = match self.base.to_input() {
            Value::Object(map) => map,
            _ => Object::new(),
        };
        let aggregates = [
            (AggregateOp::Count, &self.count),
            (AggregateOp::Avg, &self.avg),
            (AggregateOp::Sum, &self.sum),
            (AggregateOp::Min, &self.min),
            (AggregateOp::Max, &self.max),
        ];
        for (op, filter) in aggregates {
            if let Some(filter) = filter {
                map.insert(op.key().to_string(), filter.to_input());
            }
        }
        Value::Object(map)
    }
}

fn predicates(items: &[Predicate]) -> Value {
    Value::Array(items.iter().map(ToInput::to_input).collect())
}

impl ToInput for Predicate {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        for condition in &self.conditions {
            let (key, value) = match condition {
                Condition::And(items) => (filters::AND.to_string(), predicates(items)),
                Condition::Or(items) => (filters::OR.to_string(), predicates(items)),
                Condition::Not(items) => (filters::NOT_UPPER.to_string(), predicates(items)),
                Condition::Field { field, filter } => (field.clone(), filter.to_input()),
                Condition::Relation {
                    relation,
                    filters: items,
                } => {
                    let mut inner = Object::new();
                    for filter in items {
                        let (key, value) = relation_filter(filter);
                        inner.insert(key.to_string(), value);
                    }
                    (relation.clone(), Value::Object(inner))
                }
            };
            map.insert(key, value);
        }
        Value::Object(map)
    }
}

fn relation_filter(filter: &RelationFilter) -> (&'static str, Value) {
    let optional = |p: &Option<Predicate>| p.as_ref().map_or(Value::Null, ToInput::to_input);
    match filter {
        RelationFilter::Every(p) => (filters::EVERY, p.to_input()),
        RelationFilter::Some(p) => (filters::SOME, p.to_input()),
        RelationFilter::None(p) => (filters::NONE, p.to_input()),
        RelationFilter::Is(p) => (filters::IS, optional(p)),
        RelationFilter::IsNot(p) => (filters::IS_NOT, optional(p)),
    }
}

impl ToInput for UniqueWhere {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        for identity in &self.identities {
            match identity {
                Identity::PrimaryKey { field, value } | Identity::Unique { field, value } => {
                    map.insert(field.clone(), value.to_json());
                }
                Identity::Compound { key, values, .. } => {
                    let fields = values
                        .iter()
                        .map(|(field, value)| (field.clone(), value.to_json()))
                        .collect();
                    map.insert(key.clone(), Value::Object(fields));
                }
            }
        }
        merge(&mut map, self.refinement.to_input());
        Value::Object(map)
    }
}

fn order_target(target: &OrderTarget, direction: Value) -> Value {
    let mut map = Object::new();
    match target {
        OrderTarget::Field(field) => {
            map.insert(field.clone(), direction);
        }
        OrderTarget::RelationCount(relation) => {
            let mut count = Object::new();
            count.insert(aggregations::UNDERSCORE_COUNT.to_string(), direction);
            map.insert(relation.clone(), Value::Object(count));
        }
        OrderTarget::Relation { relation, target } => {
            map.insert(relation.clone(), order_target(target, direction));
        }
        OrderTarget::Aggregate { op, field } => {
            let mut inner = Object::new();
            inner.insert(field.clone(), direction);
            map.insert(op.key().to_string(), Value::Object(inner));
        }
    }
    Value::Object(map)
}

impl ToInput for OrderClause {
    fn to_input(&self) -> Value {
        let sort = Value::String(self.sort.as_str().to_string());
        let direction = match self.nulls {
            Some(nulls) => {
                let mut map = Object::new();
                map.insert(args::SORT.to_string(), sort);
                map.insert(args::NULLS.to_string(), Value::String(nulls.as_str().to_string()));
                Value::Object(map)
            }
            None => sort,
        };
        order_target(&self.target, direction)
    }
}

fn order_by(clauses: &[OrderClause]) -> Value {
    Value::Array(clauses.iter().map(ToInput::to_input).collect())
}

impl ToInput for Pagination {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        if let Some(cursor) = &self.cursor {
            map.insert(args::CURSOR.to_string(), cursor.to_input());
        }
        if let Some(take) = self.take {
            map.insert(args::TAKE.to_string(), Value::from(take));
        }
        if let Some(skip) = self.skip {
            map.insert(args::SKIP.to_string(), Value::from(skip));
        }
        if !self.distinct.is_empty() {
            map.insert(args::DISTINCT.to_string(), strings(&self.distinct));
        }
        Value::Object(map)
    }
}

fn strings(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn flags(items: &[String]) -> Value {
    Value::Object(
        items
            .iter()
            .map(|name| (name.clone(), Value::Bool(true)))
            .collect(),
    )
}

impl ToInput for NestedRead {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        if let Some(projection) = &self.projection {
            merge(&mut map, projection.to_input());
        }
        if let Some(filter) = &self.filter {
            map.insert(args::WHERE.to_string(), filter.to_input());
        }
        if !self.order_by.is_empty() {
            map.insert(args::ORDER_BY.to_string(), order_by(&self.order_by));
        }
        merge(&mut map, self.pagination.to_input());
        if map.is_empty() {
            return Value::Bool(true);
        }
        Value::Object(map)
    }
}

fn selection(selection: &Selection) -> Value {
    let mut map = match flags(&selection.fields) {
        Value::Object(map) => map,
        _ => Object::new(),
    };
    for read in &selection.relations {
        map.insert(read.relation.clone(), read.args.to_input());
    }
    if let Some(count) = &selection.count {
        let mut select = Object::new();
        select.insert(args::SELECT.to_string(), flags(count));
        map.insert(aggregations::UNDERSCORE_COUNT.to_string(), Value::Object(select));
    }
    Value::Object(map)
}

impl ToInput for Projection {
    /// Renders as an object holding `select` or `include`
    fn to_input(&self) -> Value {
        let (key, inner) = match self {
            Self::Select(s) => (args::SELECT, selection(s)),
            Self::Include(s) => (args::INCLUDE, selection(s)),
        };
        let mut map = Object::new();
        map.insert(key.to_string(), inner);
        Value::Object(map)
    }
}

impl ToInput for CountSelection {
    fn to_input(&self) -> Value {
        if self.fields.is_empty() {
            return Value::Bool(self.all);
        }
        let mut map = match flags(&self.fields) {
            Value::Object(map) => map,
            _ => Object::new(),
        };
        if self.all {
            map.insert(aggregations::UNDERSCORE_ALL.to_string(), Value::Bool(true));
        }
        Value::Object(map)
    }
}

impl ToInput for AggregateSelection {
    /// Renders as an object of selector keys
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        if let Some(count) = &self.count {
            map.insert(aggregations::UNDERSCORE_COUNT.to_string(), count.to_input());
        }
        for op in [AggregateOp::Avg, AggregateOp::Sum, AggregateOp::Min, AggregateOp::Max] {
            let fields = self.fields(op);
            if !fields.is_empty() {
                map.insert(op.key().to_string(), flags(fields));
            }
        }
        Value::Object(map)
    }
}

impl ToInput for Having {
    fn to_input(&self) -> Value {
        let group = |items: &[Having]| Value::Array(items.iter().map(ToInput::to_input).collect());
        let mut map = Object::new();
        for condition in &self.conditions {
            let (key, value) = match condition {
                HavingCondition::And(items) => (filters::AND.to_string(), group(items)),
                HavingCondition::Or(items) => (filters::OR.to_string(), group(items)),
                HavingCondition::Not(items) => (filters::NOT_UPPER.to_string(), group(items)),
                HavingCondition::Field { field, filter } => (field.clone(), filter.to_input()),
            };
            map.insert(key, value);
        }
        Value::Object(map)
    }
}

impl ToInput for GroupBy {
    /// Renders `by`, `having` and the aggregate selectors
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        map.insert(args::BY.to_string(), strings(&self.by));
        if let Some(having) = &self.having {
            map.insert(args::HAVING.to_string(), having.to_input());
        }
        merge(&mut map, self.aggregates.to_input());
        Value::Object(map)
    }
}

impl ToInput for CreateData {
    fn to_input(&self) -> Value {
        let mut map: Object = self
            .fields
            .iter()
            .map(|(field, value)| (field.clone(), value.to_json()))
            .collect();
        for write in &self.relations {
            map.insert(write.relation.clone(), write.to_input());
        }
        Value::Object(map)
    }
}

impl CreateData {
    /// The update input that replaces a row with this payload: every column as
    /// `{set: value}`, nested writes unchanged.
    pub fn to_update_input(&self) -> Value {
        let mut map: Object = self
            .fields
            .iter()
            .map(|(field, value)| {
                let mut set = Object::new();
                set.insert(operations::SET.to_string(), value.to_json());
                (field.clone(), Value::Object(set))
            })
            .collect();
        for write in &self.relations {
            map.insert(write.relation.clone(), write.to_input());
        }
        Value::Object(map)
    }
}

impl ToInput for UpdateData {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        for (field, write) in &self.fields {
            let (key, value) = match write {
                FieldWrite::Set(v) => (operations::SET, v.to_json()),
                FieldWrite::Increment(v) => (operations::INCREMENT, v.to_json()),
                FieldWrite::Decrement(v) => (operations::DECREMENT, v.to_json()),
                FieldWrite::Multiply(v) => (operations::MULTIPLY, v.to_json()),
                FieldWrite::Divide(v) => (operations::DIVIDE, v.to_json()),
                FieldWrite::Push(vs) => (operations::PUSH, list(vs)),
            };
            let mut op = Object::new();
            op.insert(key.to_string(), value);
            map.insert(field.clone(), Value::Object(op));
        }
        for write in &self.relations {
            map.insert(write.relation.clone(), write.to_input());
        }
        Value::Object(map)
    }
}

fn target(target: &Target) -> Value {
    match target {
        Target::Linked => Value::Bool(true),
        Target::Filtered(predicate) => predicate.to_input(),
        Target::Unique(selector) => selector.to_input(),
    }
}

fn nested_update(update: &NestedUpdate) -> Value {
    let mut map = Object::new();
    match &update.where_ {
        Target::Linked => {}
        other => {
            map.insert(args::WHERE.to_string(), target(other));
        }
    }
    map.insert(args::DATA.to_string(), update.data.to_input());
    Value::Object(map)
}

fn nested_op(op: &NestedOp) -> Value {
    match op {
        NestedOp::Create(items) => one_or_many(items, ToInput::to_input),
        NestedOp::CreateMany {
            data,
            skip_duplicates,
        } => {
            let mut map = Object::new();
            map.insert(
                args::DATA.to_string(),
                Value::Array(data.iter().map(ToInput::to_input).collect()),
            );
            if *skip_duplicates {
                map.insert(args::SKIP_DUPLICATES.to_string(), Value::Bool(true));
            }
            Value::Object(map)
        }
        NestedOp::Connect(items) => one_or_many(items, ToInput::to_input),
        NestedOp::Set(items) => Value::Array(items.iter().map(ToInput::to_input).collect()),
        NestedOp::ConnectOrCreate(items) => one_or_many(items, |item| {
            let mut map = Object::new();
            map.insert(args::WHERE.to_string(), item.where_.to_input());
            map.insert(args::CREATE.to_string(), item.create.to_input());
            Value::Object(map)
        }),
        NestedOp::Upsert(items) => one_or_many(items, |item| {
            let mut map = Object::new();
            if let Some(where_) = &item.where_ {
                map.insert(args::WHERE.to_string(), target(where_));
            }
            map.insert(args::CREATE.to_string(), item.create.to_input());
            map.insert(args::UPDATE.to_string(), item.update.to_input());
            Value::Object(map)
        }),
        NestedOp::Update(items) => one_or_many(items, nested_update),
        NestedOp::UpdateMany(items) => one_or_many(items, |(filter, data)| {
            let mut map = Object::new();
            map.insert(args::WHERE.to_string(), filter.to_input());
            map.insert(args::DATA.to_string(), data.to_input());
            Value::Object(map)
        }),
        NestedOp::Delete(items) | NestedOp::Disconnect(items) => one_or_many(items, target),
        NestedOp::DeleteMany(items) => one_or_many(items, ToInput::to_input),
    }
}

impl ToInput for NestedWrite {
    /// Renders the operation object of one relation, e.g. `{connect: {id: 1}}`
    fn to_input(&self) -> Value {
        Value::Object(
            self.ops
                .iter()
                .map(|op| (op.key().to_string(), nested_op(op)))
                .collect(),
        )
    }
}

impl ToInput for ValidatedArgs {
    fn to_input(&self) -> Value {
        let mut map = Object::new();
        if let Some(projection) = &self.projection {
            merge(&mut map, projection.to_input());
        }
        if let Some(filter) = &self.filter {
            map.insert(args::WHERE.to_string(), filter.to_input());
        }
        if let Some(unique) = &self.unique {
            map.insert(args::WHERE.to_string(), unique.to_input());
        }
        if !self.order_by.is_empty() {
            map.insert(args::ORDER_BY.to_string(), order_by(&self.order_by));
        }
        merge(&mut map, self.pagination.to_input());
        match &self.payload {
            Some(Payload::Create(data)) => {
                map.insert(args::DATA.to_string(), data.to_input());
            }
            Some(Payload::CreateMany {
                data,
                skip_duplicates,
            }) => {
                map.insert(
                    args::DATA.to_string(),
                    Value::Array(data.iter().map(ToInput::to_input).collect()),
                );
                if *skip_duplicates {
                    map.insert(args::SKIP_DUPLICATES.to_string(), Value::Bool(true));
                }
            }
            Some(Payload::Update(data)) => {
                map.insert(args::DATA.to_string(), data.to_input());
            }
            Some(Payload::Upsert { create, update }) => {
                map.insert(args::CREATE.to_string(), create.to_input());
                map.insert(args::UPDATE.to_string(), update.to_input());
            }
            Some(Payload::Count(Some(count))) => {
                map.insert(args::SELECT.to_string(), count.to_input());
            }
            Some(Payload::Count(None)) | None => {}
            Some(Payload::Aggregate(selection)) => merge(&mut map, selection.to_input()),
            Some(Payload::GroupBy(group)) => merge(&mut map, group.to_input()),
        }
        Value::Object(map)
    }
}
