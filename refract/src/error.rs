use crate::path::FieldPath;
use serde::Serialize;
use std::fmt;

/// Classification of a validation failure
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The value's runtime shape does not match the expected scalar, enum or list kind
    TypeMismatch,
    /// A correctly typed string outside the enum's variant set
    EnumDomainViolation,
    /// A key that is not part of the target shape
    UnknownField,
    /// A unique selector satisfying none of its identity branches
    UnionMismatch,
    /// Structurally valid but contradictory input
    ConstraintViolation,
    /// Removing a relation whose foreign key cannot be left empty
    RequiredRelationViolation,
    /// A cursor supplied without any ordering
    AmbiguousCursor,
    /// A required key is absent
    MissingField,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::EnumDomainViolation => "EnumDomainViolation",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::UnionMismatch => "UnionMismatch",
            ErrorKind::ConstraintViolation => "ConstraintViolation",
            ErrorKind::RequiredRelationViolation => "RequiredRelationViolation",
            ErrorKind::AmbiguousCursor => "AmbiguousCursor",
            ErrorKind::MissingField => "MissingField",
        };
        f.write_str(name)
    }
}

/// A single violation, located by its path in the raw input
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{kind} at `{path}`: {message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub path: FieldPath,
    /// The offending raw value
    pub value: serde_json::Value,
    pub message: String,
}

/// Every violation found in one input. Object keys are visited in sorted
/// order, so the list is stable for a given input. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self(errors)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.0.iter().map(|e| e.kind).collect()
    }

    /// Check whether any violation has the given kind
    pub fn has(&self, kind: ErrorKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    /// Find the first violation of a kind
    pub fn find(&self, kind: ErrorKind) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.kind == kind)
    }

    /// Find the first violation reported at a rendered path
    pub fn at(&self, path: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.path.to_string() == path)
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Failures while building a frozen schema from a model description
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid identifier '{name}' for {what}. Identifiers must match [A-Za-z][A-Za-z0-9_]* and must not be reserved.")]
    InvalidIdentifier { what: &'static str, name: String },

    #[error("Entity '{entity}' is declared more than once.")]
    DuplicateEntity { entity: String },

    #[error("Enum '{name}' is declared more than once.")]
    DuplicateEnum { name: String },

    #[error("Enum '{name}' has no variants or repeats a variant.")]
    InvalidEnumVariants { name: String },

    #[error("Entity '{entity}' declares member '{member}' more than once.")]
    DuplicateMember { entity: String, member: String },

    #[error("Field '{entity}.{field}' references unknown enum '{name}'.")]
    UnknownEnum {
        entity: String,
        field: String,
        name: String,
    },

    #[error("Relation '{entity}.{relation}' targets unknown entity '{target}'.")]
    UnknownRelationTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("'{entity}' refers to unknown field '{field}' in {context}.")]
    UnknownKeyField {
        entity: String,
        field: String,
        context: String,
    },

    #[error("'{entity}.{field}' is a list field and cannot take part in {context}.")]
    ListKeyField {
        entity: String,
        field: String,
        context: String,
    },

    #[error("Entity '{entity}' has no primary key. Mark a field with `id` or declare a compound id.")]
    MissingPrimaryKey { entity: String },

    #[error("Entity '{entity}' declares more than one primary key.")]
    MultiplePrimaryKeys { entity: String },

    #[error("Compound key '{name}' on '{entity}' needs at least two fields.")]
    CompoundKeyTooSmall { entity: String, name: String },

    #[error("Relation '{entity}.{relation}' has {fields} foreign key field(s) but {references} reference(s).")]
    ForeignKeyArity {
        entity: String,
        relation: String,
        fields: usize,
        references: usize,
    },

    #[error("Relation '{entity}.{relation}' is to-many and cannot carry foreign key fields.")]
    ForeignKeyOnToMany { entity: String, relation: String },

    #[error("Relation '{entity}.{relation}': {message}")]
    Opposite {
        entity: String,
        relation: String,
        message: String,
    },

    #[error("Failed to read model description '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk model directory '{path}': {message}")]
    Walk { path: String, message: String },

    #[error("Failed to parse model description '{origin}': {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ModelError {
    pub fn invalid_identifier(what: &'static str, name: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            what,
            name: name.into(),
        }
    }

    pub fn unknown_key_field(
        entity: impl Into<String>,
        field: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::UnknownKeyField {
            entity: entity.into(),
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn opposite(
        entity: impl Into<String>,
        relation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Opposite {
            entity: entity.into(),
            relation: relation.into(),
            message: message.into(),
        }
    }
}

/// Classification of a failure reported by the storage engine
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum StorageErrorKind {
    UniqueConstraint,
    ForeignKeyConstraint,
    RecordNotFound,
    Other,
}

/// Failure signalled by the storage engine after a validated request was handed over.
/// Passed through to callers unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("storage engine error ({kind:?}): {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unique_constraint(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::UniqueConstraint, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::RecordNotFound, message)
    }
}

/// Outcome of a request that went through validation and, if valid, the storage engine
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RequestError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Storage(_) => None,
        }
    }
}
