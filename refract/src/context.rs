//! Per-call validation state: the current input path and the collected violations.

use crate::error::{ErrorKind, ValidationError, ValidationErrors};
use crate::model::Schema;
use crate::path::{FieldPath, PathSegment};
use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

pub(crate) struct Ctx<'s> {
    pub(crate) schema: &'s Schema,
    path: FieldPath,
    errors: Vec<ValidationError>,
    depth: usize,
}

impl<'s> Ctx<'s> {
    pub(crate) fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            path: FieldPath::root(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Run `f` with `key` appended to the current path
    pub(crate) fn key<R>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(PathSegment::Key(key.to_string()));
        let out = f(self);
        self.path.pop();
        out
    }

    /// Run `f` with `index` appended to the current path
    pub(crate) fn index<R>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(PathSegment::Index(index));
        let out = f(self);
        self.path.pop();
        out
    }

    /// Guard one level of recursion. Input nested deeper than `maxDepth` is rejected
    /// before it is walked.
    pub(crate) fn nested<R>(
        &mut self,
        value: &Value,
        f: impl FnOnce(&mut Self) -> Option<R>,
    ) -> Option<R> {
        let max_depth = self.schema.options().max_depth;
        if self.depth >= max_depth {
            self.report(
                ErrorKind::ConstraintViolation,
                value,
                format!("input nesting exceeds the maximum depth of {}", max_depth),
            );
            return None;
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    pub(crate) fn report(&mut self, kind: ErrorKind, value: &Value, message: impl Into<String>) {
        self.errors.push(ValidationError {
            kind,
            path: self.path.clone(),
            value: value.clone(),
            message: message.into(),
        });
    }

    pub(crate) fn type_mismatch(&mut self, expected: &str, value: &Value) {
        self.report(
            ErrorKind::TypeMismatch,
            value,
            format!("expected {}, found {}", expected, describe(value)),
        );
    }

    pub(crate) fn unknown_field(&mut self, key: &str, value: &Value, shape: &str) {
        self.key(key, |ctx| {
            ctx.report(
                ErrorKind::UnknownField,
                value,
                format!("`{}` is not a field of {}", key, shape),
            )
        });
    }

    pub(crate) fn unknown_field_because(&mut self, key: &str, value: &Value, reason: String) {
        self.key(key, |ctx| ctx.report(ErrorKind::UnknownField, value, reason));
    }

    pub(crate) fn missing(&mut self, key: &str, shape: &str) {
        self.key(key, |ctx| {
            ctx.report(
                ErrorKind::MissingField,
                &Value::Null,
                format!("{} requires `{}`", shape, key),
            )
        });
    }

    pub(crate) fn constraint(&mut self, value: &Value, message: impl Into<String>) {
        self.report(ErrorKind::ConstraintViolation, value, message);
    }

    #[cfg(test)]
    pub(crate) fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn object<'v>(&mut self, value: &'v Value, expected: &str) -> Option<&'v Object> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.type_mismatch(expected, other);
                None
            }
        }
    }

    pub(crate) fn boolean(&mut self, value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                self.type_mismatch("a boolean", other);
                None
            }
        }
    }

    /// Parse `T | T[]`. Every element is visited so that all violations are collected.
    pub(crate) fn one_or_many<R>(
        &mut self,
        value: &Value,
        mut f: impl FnMut(&mut Self, &Value) -> Option<R>,
    ) -> Option<Vec<R>> {
        match value {
            Value::Array(items) => self.each(items, f),
            single => f(self, single).map(|item| vec![item]),
        }
    }

    /// Parse `T[]`
    pub(crate) fn many<R>(
        &mut self,
        value: &Value,
        expected: &str,
        f: impl FnMut(&mut Self, &Value) -> Option<R>,
    ) -> Option<Vec<R>> {
        match value {
            Value::Array(items) => self.each(items, f),
            other => {
                self.type_mismatch(expected, other);
                None
            }
        }
    }

    fn each<R>(
        &mut self,
        items: &[Value],
        mut f: impl FnMut(&mut Self, &Value) -> Option<R>,
    ) -> Option<Vec<R>> {
        let mut out = Vec::with_capacity(items.len());
        let mut complete = true;
        for (i, item) in items.iter().enumerate() {
            match self.index(i, |ctx| f(ctx, item)) {
                Some(parsed) => out.push(parsed),
                None => complete = false,
            }
        }
        complete.then_some(out)
    }

    /// Close the call: a value is only handed out when no violation was collected.
    pub(crate) fn finish<T>(self, out: Option<T>) -> Result<T, ValidationErrors> {
        match out {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ if self.errors.is_empty() => {
                // A parser gave up without reporting; surface it rather than
                // returning a partial value.
                Err(ValidationErrors::new(vec![ValidationError {
                    kind: ErrorKind::TypeMismatch,
                    path: FieldPath::root(),
                    value: Value::Null,
                    message: "input could not be validated".to_string(),
                }]))
            }
            _ => {
                log::debug!("validation failed with {} error(s)", self.errors.len());
                Err(ValidationErrors::new(self.errors))
            }
        }
    }
}

/// Short name of a raw value's JSON type, for messages
pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "an integer",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
