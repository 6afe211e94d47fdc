//! Typed scalar values and the coercion of raw JSON into them.

use crate::context::Ctx;
use crate::error::ErrorKind;
use crate::model::{Field, ScalarKind};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::str::FromStr;
use uuid::Uuid;

/// A raw value that has been checked against a scalar kind
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Uuid(Uuid),
    Enum(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Numerically zero, for the `divide` guard
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Decimal(d) => d.is_zero(),
            _ => false,
        }
    }

    /// Canonical JSON rendering
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) | Self::Enum(s) => Value::String(s.clone()),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Decimal(d) => Value::String(d.to_string()),
            Self::Boolean(b) => Value::Bool(*b),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339()),
            Self::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Coerce a raw value against a field's kind and nullability
pub(crate) fn coerce_field(ctx: &mut Ctx<'_>, field: &Field, value: &Value) -> Option<ScalarValue> {
    coerce(ctx, field.kind, field.nullable, value)
}

pub(crate) fn coerce(
    ctx: &mut Ctx<'_>,
    kind: ScalarKind,
    nullable: bool,
    value: &Value,
) -> Option<ScalarValue> {
    let schema = ctx.schema;
    let expected = schema.kind_name(kind);

    if value.is_null() {
        if nullable {
            return Some(ScalarValue::Null);
        }
        ctx.report(
            ErrorKind::TypeMismatch,
            value,
            format!("expected a non-null {}", expected),
        );
        return None;
    }

    let coerced = match (kind, value) {
        (ScalarKind::String, Value::String(s)) => Some(ScalarValue::String(s.clone())),
        (ScalarKind::Int, Value::Number(n)) => n.as_i64().map(ScalarValue::Int),
        (ScalarKind::Float, Value::Number(n)) => n.as_f64().map(ScalarValue::Float),
        (ScalarKind::Decimal, Value::Number(n)) => parse_decimal(&n.to_string()),
        (ScalarKind::Decimal, Value::String(s)) => parse_decimal(s),
        (ScalarKind::Boolean, Value::Bool(b)) => Some(ScalarValue::Boolean(*b)),
        (ScalarKind::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(ScalarValue::DateTime),
        (ScalarKind::Uuid, Value::String(s)) => Uuid::parse_str(s).ok().map(ScalarValue::Uuid),
        (ScalarKind::Enum(id), Value::String(s)) => {
            let domain = schema.enum_by_id(id);
            if !domain.contains(s) {
                ctx.report(
                    ErrorKind::EnumDomainViolation,
                    value,
                    format!(
                        "`{}` is not a variant of {}; expected one of {}",
                        s,
                        domain.name,
                        domain.variants.join(", ")
                    ),
                );
                return None;
            }
            Some(ScalarValue::Enum(s.clone()))
        }
        _ => None,
    };

    if coerced.is_none() {
        let expected = match kind {
            ScalarKind::Int => "an Int (whole number)".to_string(),
            ScalarKind::DateTime => "a DateTime (RFC 3339 string)".to_string(),
            ScalarKind::Uuid => "a Uuid string".to_string(),
            ScalarKind::Decimal => "a Decimal (number or numeric string)".to_string(),
            _ => format!("a {}", expected),
        };
        ctx.type_mismatch(&expected, value);
    }
    coerced
}

fn parse_decimal(raw: &str) -> Option<ScalarValue> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .map(ScalarValue::Decimal)
}

/// Coerce an array of non-null elements of one kind
pub(crate) fn coerce_list(
    ctx: &mut Ctx<'_>,
    kind: ScalarKind,
    value: &Value,
) -> Option<Vec<ScalarValue>> {
    let expected = format!("a list of {}", ctx.schema.kind_name(kind));
    ctx.many(value, &expected, |ctx, item| coerce(ctx, kind, false, item))
}
