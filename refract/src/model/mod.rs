//! Frozen model metadata: the grammar every validation call is parameterized by.
//!
//! A [`Schema`] is produced once by [`ModelDef::build`] and is immutable afterwards.
//! Relations refer to their target through an [`EntityId`] handle that is only
//! resolved after every entity has been registered, so cyclic entity graphs
//! (User -> Blog -> User) are described without any recursive expansion.

pub mod builder;
pub mod loader;

pub use builder::{
    EntityBuilder, EntityDef, EnumDef, FieldDef, FieldKind, ModelDef, RelationDef, SchemaBuilder,
    UniqueDef,
};

use crate::config::SchemaOptions;
use heck::{ToLowerCamelCase, ToPascalCase};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle of an entity inside a frozen [`Schema`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub(crate) usize);

/// Handle of an enum inside a frozen [`Schema`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumId(pub(crate) usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Decimal,
    Boolean,
    DateTime,
    Uuid,
    Enum(EnumId),
}

impl ScalarKind {
    /// Kinds that support arithmetic update operators and `_avg`/`_sum`
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Decimal)
    }

    /// Kinds that support `lt/lte/gt/gte`
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Int | Self::Float | Self::Decimal | Self::DateTime | Self::Uuid
        )
    }

    /// Kinds that support `contains/startsWith/endsWith` and `mode`
    pub fn is_text(&self) -> bool {
        matches!(self, Self::String)
    }
}

/// Value filled in by the storage engine when a field is omitted at create time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultValue {
    Autoincrement,
    Now,
    Cuid,
    Uuid,
    Value(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: ScalarKind,
    pub id: bool,
    pub unique: bool,
    /// Accepts an explicit `null`
    pub nullable: bool,
    /// May be omitted at create time
    pub optional: bool,
    /// Array-valued column
    pub list: bool,
    pub default: Option<DefaultValue>,
    pub updated_at: bool,
    /// Index of the owning relation this field is a foreign key of
    pub(crate) foreign_key_of: Option<usize>,
}

impl Field {
    /// A create input must supply this field
    pub fn is_required_on_create(&self) -> bool {
        !self.optional && self.default.is_none() && !self.updated_at
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    One,
    Many,
}

/// Which end of a relation may be written through nested mutations.
/// The owning `one` side carries the foreign key; an inverse side only carries filters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationSide {
    Owning,
    Inverse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub target: EntityId,
    pub cardinality: Cardinality,
    /// For `one` relations: the related row may be absent
    pub nullable: bool,
    pub side: RelationSide,
    /// Foreign key fields on this entity (owning `one` side)
    pub fields: Vec<String>,
    /// Referenced fields on the target entity
    pub references: Vec<String>,
    /// Name of the relation on the target entity that points back here
    pub opposite: Option<String>,
}

impl Relation {
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// A to-one relation that can never be absent
    pub fn is_required_one(&self) -> bool {
        self.cardinality == Cardinality::One && !self.nullable
    }

    pub fn has_foreign_key(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn accepts_writes(&self) -> bool {
        self.side == RelationSide::Owning
    }
}

/// Ordered tuple of fields whose combined value identifies a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundUniqueKey {
    /// Name the key is exposed under in unique selectors, e.g. `provider_providerAccountId`
    pub name: String,
    pub fields: Vec<String>,
}

impl CompoundUniqueKey {
    pub fn default_name(fields: &[String]) -> String {
        fields.join("_")
    }
}

/// One way of pinning down a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityBranch {
    PrimaryKey { field: String },
    UniqueField { field: String },
    Compound { key: CompoundUniqueKey, primary: bool },
}

impl IdentityBranch {
    /// Key the branch is exposed under in a unique selector
    pub fn name(&self) -> &str {
        match self {
            Self::PrimaryKey { field } | Self::UniqueField { field } => field,
            Self::Compound { key, .. } => &key.name,
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::PrimaryKey { field } | Self::UniqueField { field } => vec![field.as_str()],
            Self::Compound { key, .. } => key.fields.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MemberIdx {
    Field(usize),
    Relation(usize),
}

/// A named member of an entity
#[derive(Copy, Clone, Debug)]
pub enum Member<'a> {
    Field(&'a Field),
    Relation(&'a Relation),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub fields: Vec<Field>,
    pub relations: Vec<Relation>,
    /// Identity branches in resolution priority: primary key, unique fields, compound keys
    pub branches: Vec<IdentityBranch>,
    pub(crate) members: HashMap<String, MemberIdx>,
}

impl Entity {
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        match self.members.get(name)? {
            MemberIdx::Field(i) => Some(Member::Field(&self.fields[*i])),
            MemberIdx::Relation(i) => Some(Member::Relation(&self.relations[*i])),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        match self.members.get(name)? {
            MemberIdx::Field(i) => Some(&self.fields[*i]),
            MemberIdx::Relation(_) => None,
        }
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        match self.members.get(name)? {
            MemberIdx::Relation(i) => Some(&self.relations[*i]),
            MemberIdx::Field(_) => None,
        }
    }

    /// Owning relation a foreign key field belongs to
    pub fn foreign_key_relation(&self, field: &Field) -> Option<&Relation> {
        field.foreign_key_of.map(|i| &self.relations[i])
    }

    /// Domain name used when a scalar field name is given as a value (`distinct`, `by`)
    pub fn scalar_field_domain(&self) -> String {
        format!("{}ScalarFieldEnum", self.name)
    }

    pub fn scalar_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumType {
    pub fn contains(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

/// The immutable, process-wide model. Shared read-only by every validation call.
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) enums: Vec<EnumType>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) entity_index: HashMap<String, EntityId>,
    pub(crate) options: SchemaOptions,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn enums(&self) -> &[EnumType] {
        &self.enums
    }

    pub fn entity_by_id(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn enum_by_id(&self, id: EnumId) -> &EnumType {
        &self.enums[id.0]
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Look up an entity by name. `SkillCategory`, `skillCategory` and `skill_category`
    /// resolve to the same entity.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        if let Some(id) = self.entity_index.get(name) {
            return Some(self.entity_by_id(*id));
        }
        let pascal = name.to_pascal_case();
        self.entity_index
            .get(&pascal)
            .map(|id| self.entity_by_id(*id))
    }

    /// Target entity of a relation
    pub fn target(&self, relation: &Relation) -> &Entity {
        self.entity_by_id(relation.target)
    }

    /// The relation on the target entity pointing back through `relation`
    pub fn opposite<'a>(&'a self, relation: &Relation) -> Option<&'a Relation> {
        let name = relation.opposite.as_deref()?;
        self.target(relation).relation(name)
    }

    pub fn kind_name(&self, kind: ScalarKind) -> &str {
        match kind {
            ScalarKind::String => "String",
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Uuid => "Uuid",
            ScalarKind::Enum(id) => &self.enum_by_id(id).name,
        }
    }

    /// Human readable type of a field, used in messages
    pub fn type_name(&self, field: &Field) -> String {
        let base = self.kind_name(field.kind);
        match (field.list, field.nullable) {
            (true, _) => format!("{}[]", base),
            (false, true) => format!("{}?", base),
            (false, false) => base.to_string(),
        }
    }

    /// Shape name used in messages, e.g. `BlogWhereInput`
    pub(crate) fn shape_name(entity: &Entity, suffix: &str) -> String {
        format!("{}{}", entity.name, suffix)
    }
}

/// Accessor name of an entity in lower camel case, e.g. `skillCategory`
pub fn accessor_name(entity: &Entity) -> String {
    entity.name.to_lower_camel_case()
}
