//! Model descriptions and the build-then-freeze step that turns them into a [`Schema`].

use super::{
    Cardinality, CompoundUniqueKey, DefaultValue, Entity, EntityId, EnumId, EnumType, Field,
    IdentityBranch, MemberIdx, Relation, RelationSide, ScalarKind, Schema,
};
use crate::config::SchemaOptions;
use crate::error::ModelError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// Names that would collide with combinators in predicate inputs
const RESERVED: &[&str] = &["AND", "OR", "NOT"];

fn check_identifier(what: &'static str, name: &str) -> Result<(), ModelError> {
    if !IDENTIFIER.is_match(name) || RESERVED.contains(&name) {
        return Err(ModelError::invalid_identifier(what, name));
    }
    Ok(())
}

/// Complete model description, as read from a schema file or assembled by [`SchemaBuilder`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelDef {
    #[serde(default)]
    pub options: SchemaOptions,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    /// Compound unique keys
    #[serde(default)]
    pub uniques: Vec<UniqueDef>,
    /// Compound primary key, when no single field is marked `id`
    #[serde(default)]
    pub id: Option<UniqueDef>,
}

/// Scalar kind as written in a model description: `"string"` or `{"enum": "BlogStatus"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    String,
    Int,
    Float,
    Decimal,
    Boolean,
    DateTime,
    Uuid,
    Enum(String),
}

impl FieldKind {
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub updated_at: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            id: false,
            unique: false,
            nullable: false,
            optional: false,
            list: false,
            default: None,
            updated_at: false,
        }
    }

    pub fn id(&mut self) -> &mut Self {
        self.id = true;
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Accept an explicit `null`
    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    /// Allow omission at create time
    pub fn optional(&mut self) -> &mut Self {
        self.optional = true;
        self
    }

    pub fn list(&mut self) -> &mut Self {
        self.list = true;
        self
    }

    pub fn default(&mut self, value: DefaultValue) -> &mut Self {
        self.default = Some(value);
        self
    }

    pub fn updated_at(&mut self) -> &mut Self {
        self.updated_at = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationDef {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
    /// Defaults to the nullability of the foreign key fields
    #[serde(default)]
    pub nullable: Option<bool>,
    /// Defaults to owning, except for a to-one relation without foreign key
    #[serde(default)]
    pub side: Option<RelationSide>,
    #[serde(default)]
    pub opposite: Option<String>,
}

impl RelationDef {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::One,
            fields: Vec::new(),
            references: Vec::new(),
            nullable: None,
            side: None,
            opposite: None,
        }
    }

    pub fn one(&mut self) -> &mut Self {
        self.cardinality = Cardinality::One;
        self
    }

    pub fn many(&mut self) -> &mut Self {
        self.cardinality = Cardinality::Many;
        self
    }

    pub fn fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn references<I, S>(&mut self, references: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    pub fn inverse(&mut self) -> &mut Self {
        self.side = Some(RelationSide::Inverse);
        self
    }

    pub fn owning(&mut self) -> &mut Self {
        self.side = Some(RelationSide::Owning);
        self
    }

    pub fn opposite(&mut self, name: impl Into<String>) -> &mut Self {
        self.opposite = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UniqueDef {
    pub fields: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UniqueDef {
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }
}

/// Fluent construction of a [`ModelDef`]
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    def: ModelDef,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.def.options = options;
        self
    }

    pub fn enumeration<I, S>(mut self, name: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.enums.push(EnumDef {
            name: name.to_string(),
            variants: variants.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn entity(mut self, name: &str, describe: impl FnOnce(&mut EntityBuilder)) -> Self {
        let mut builder = EntityBuilder {
            def: EntityDef {
                name: name.to_string(),
                fields: Vec::new(),
                relations: Vec::new(),
                uniques: Vec::new(),
                id: None,
            },
        };
        describe(&mut builder);
        self.def.entities.push(builder.def);
        self
    }

    pub fn build(self) -> Result<Schema, ModelError> {
        self.def.build()
    }
}

pub struct EntityBuilder {
    def: EntityDef,
}

impl EntityBuilder {
    pub fn field(&mut self, name: &str, kind: FieldKind) -> &mut FieldDef {
        self.def.fields.push(FieldDef::new(name, kind));
        let last = self.def.fields.len() - 1;
        &mut self.def.fields[last]
    }

    pub fn relation(&mut self, name: &str, target: &str) -> &mut RelationDef {
        self.def.relations.push(RelationDef::new(name, target));
        let last = self.def.relations.len() - 1;
        &mut self.def.relations[last]
    }

    pub fn unique<I, S>(&mut self, fields: I) -> &mut UniqueDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.uniques.push(UniqueDef {
            fields: fields.into_iter().map(Into::into).collect(),
            name: None,
        });
        let last = self.def.uniques.len() - 1;
        &mut self.def.uniques[last]
    }

    pub fn compound_id<I, S>(&mut self, fields: I) -> &mut UniqueDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.id.insert(UniqueDef {
            fields: fields.into_iter().map(Into::into).collect(),
            name: None,
        })
    }
}

impl ModelDef {
    /// Merge another description into this one. Options of `other` win when set.
    pub fn merge(&mut self, other: ModelDef) {
        if other.options != SchemaOptions::default() {
            self.options = other.options;
        }
        self.enums.extend(other.enums);
        self.entities.extend(other.entities);
    }

    /// Resolve every named reference and freeze the result.
    ///
    /// This is the only construction path for a [`Schema`]; once it returns, the
    /// schema is never mutated and can be shared across threads.
    pub fn build(self) -> Result<Schema, ModelError> {
        let ModelDef {
            options,
            enums: enum_defs,
            entities: entity_defs,
        } = self;

        let enums = build_enums(enum_defs)?;
        let enum_index: HashMap<&str, EnumId> = enums
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.as_str(), EnumId(i)))
            .collect();

        let mut entity_index = HashMap::new();
        for (i, def) in entity_defs.iter().enumerate() {
            check_identifier("entity", &def.name)?;
            if entity_index
                .insert(def.name.clone(), EntityId(i))
                .is_some()
            {
                return Err(ModelError::DuplicateEntity {
                    entity: def.name.clone(),
                });
            }
        }

        let mut entities = Vec::with_capacity(entity_defs.len());
        for (i, def) in entity_defs.iter().enumerate() {
            entities.push(build_entity(
                EntityId(i),
                def,
                &enum_index,
                &entity_index,
                &entity_defs,
            )?);
        }

        resolve_opposites(&mut entities)?;

        let schema = Schema {
            enums,
            entities,
            entity_index,
            options,
        };
        log::debug!(
            "schema frozen: {} entities, {} enums",
            schema.entities.len(),
            schema.enums.len()
        );
        Ok(schema)
    }
}

fn build_enums(defs: Vec<EnumDef>) -> Result<Vec<EnumType>, ModelError> {
    let mut seen = HashSet::new();
    let mut enums = Vec::with_capacity(defs.len());
    for def in defs {
        check_identifier("enum", &def.name)?;
        if !seen.insert(def.name.clone()) {
            return Err(ModelError::DuplicateEnum { name: def.name });
        }
        let distinct: HashSet<&String> = def.variants.iter().collect();
        if def.variants.is_empty() || distinct.len() != def.variants.len() {
            return Err(ModelError::InvalidEnumVariants { name: def.name });
        }
        for variant in &def.variants {
            if !IDENTIFIER.is_match(variant) {
                return Err(ModelError::invalid_identifier("enum variant", variant.clone()));
            }
        }
        enums.push(EnumType {
            name: def.name,
            variants: def.variants,
        });
    }
    Ok(enums)
}

fn build_entity(
    id: EntityId,
    def: &EntityDef,
    enum_index: &HashMap<&str, EnumId>,
    entity_index: &HashMap<String, EntityId>,
    all: &[EntityDef],
) -> Result<Entity, ModelError> {
    let entity = def.name.as_str();
    let mut members = HashMap::new();

    let mut fields = Vec::with_capacity(def.fields.len());
    for (i, field) in def.fields.iter().enumerate() {
        check_identifier("field", &field.name)?;
        if members
            .insert(field.name.clone(), MemberIdx::Field(i))
            .is_some()
        {
            return Err(ModelError::DuplicateMember {
                entity: entity.to_string(),
                member: field.name.clone(),
            });
        }
        let kind = match &field.kind {
            FieldKind::String => ScalarKind::String,
            FieldKind::Int => ScalarKind::Int,
            FieldKind::Float => ScalarKind::Float,
            FieldKind::Decimal => ScalarKind::Decimal,
            FieldKind::Boolean => ScalarKind::Boolean,
            FieldKind::DateTime => ScalarKind::DateTime,
            FieldKind::Uuid => ScalarKind::Uuid,
            FieldKind::Enum(name) => {
                let enum_id = enum_index.get(name.as_str()).ok_or_else(|| {
                    ModelError::UnknownEnum {
                        entity: entity.to_string(),
                        field: field.name.clone(),
                        name: name.clone(),
                    }
                })?;
                ScalarKind::Enum(*enum_id)
            }
        };
        fields.push(Field {
            name: field.name.clone(),
            kind,
            id: field.id,
            unique: field.unique,
            nullable: field.nullable,
            optional: field.optional,
            list: field.list,
            default: field.default.clone(),
            updated_at: field.updated_at,
            foreign_key_of: None,
        });
    }

    // Identity branches: primary key first, then unique fields, then compound keys
    let mut branches = Vec::new();
    let id_fields: Vec<&Field> = fields.iter().filter(|f| f.id).collect();
    match (id_fields.as_slice(), &def.id) {
        ([], None) => {
            return Err(ModelError::MissingPrimaryKey {
                entity: entity.to_string(),
            })
        }
        ([single], None) => {
            if single.list {
                return Err(ModelError::ListKeyField {
                    entity: entity.to_string(),
                    field: single.name.clone(),
                    context: "the primary key".to_string(),
                });
            }
            branches.push(IdentityBranch::PrimaryKey {
                field: single.name.clone(),
            });
        }
        ([], Some(compound)) => {
            let key = compound_key(entity, compound, "the compound id", &fields)?;
            branches.push(IdentityBranch::Compound { key, primary: true });
        }
        _ => {
            return Err(ModelError::MultiplePrimaryKeys {
                entity: entity.to_string(),
            })
        }
    }

    for field in fields.iter().filter(|f| f.unique && !f.id) {
        if field.list {
            return Err(ModelError::ListKeyField {
                entity: entity.to_string(),
                field: field.name.clone(),
                context: "a unique constraint".to_string(),
            });
        }
        branches.push(IdentityBranch::UniqueField {
            field: field.name.clone(),
        });
    }

    for unique in &def.uniques {
        let key = compound_key(entity, unique, "a compound unique key", &fields)?;
        branches.push(IdentityBranch::Compound {
            key,
            primary: false,
        });
    }

    let mut branch_names = HashSet::new();
    for branch in &branches {
        let name = branch.name();
        let is_member_field = matches!(
            branch,
            IdentityBranch::PrimaryKey { .. } | IdentityBranch::UniqueField { .. }
        );
        if !branch_names.insert(name.to_string()) || (!is_member_field && members.contains_key(name))
        {
            return Err(ModelError::DuplicateMember {
                entity: entity.to_string(),
                member: name.to_string(),
            });
        }
    }

    let mut relations = Vec::with_capacity(def.relations.len());
    let mut foreign_keys = Vec::new();
    for (i, relation) in def.relations.iter().enumerate() {
        check_identifier("relation", &relation.name)?;
        if members
            .insert(relation.name.clone(), MemberIdx::Relation(i))
            .is_some()
            || branch_names.contains(&relation.name)
        {
            return Err(ModelError::DuplicateMember {
                entity: entity.to_string(),
                member: relation.name.clone(),
            });
        }
        let target = *entity_index.get(&relation.target).ok_or_else(|| {
            ModelError::UnknownRelationTarget {
                entity: entity.to_string(),
                relation: relation.name.clone(),
                target: relation.target.clone(),
            }
        })?;

        if relation.cardinality == Cardinality::Many && !relation.fields.is_empty() {
            return Err(ModelError::ForeignKeyOnToMany {
                entity: entity.to_string(),
                relation: relation.name.clone(),
            });
        }
        if relation.fields.len() != relation.references.len() {
            return Err(ModelError::ForeignKeyArity {
                entity: entity.to_string(),
                relation: relation.name.clone(),
                fields: relation.fields.len(),
                references: relation.references.len(),
            });
        }

        let context = format!("relation '{}'", relation.name);
        let mut fk_nullable = false;
        for name in &relation.fields {
            let field = find_field(&fields, entity, name, &context)?;
            fk_nullable |= field.nullable;
            foreign_keys.push((name.clone(), i));
        }
        let target_def = &all[target.0];
        for name in &relation.references {
            if !target_def.fields.iter().any(|f| &f.name == name) {
                return Err(ModelError::unknown_key_field(
                    &target_def.name,
                    name,
                    &context,
                ));
            }
        }

        let has_fk = !relation.fields.is_empty();
        let nullable = relation.nullable.unwrap_or(match relation.cardinality {
            Cardinality::One => !has_fk || fk_nullable,
            Cardinality::Many => false,
        });
        let side = relation.side.unwrap_or(match relation.cardinality {
            Cardinality::One if !has_fk => RelationSide::Inverse,
            _ => RelationSide::Owning,
        });

        relations.push(Relation {
            name: relation.name.clone(),
            target,
            cardinality: relation.cardinality,
            nullable,
            side,
            fields: relation.fields.clone(),
            references: relation.references.clone(),
            opposite: relation.opposite.clone(),
        });
    }

    for (name, relation) in foreign_keys {
        if let Some(field) = fields.iter_mut().find(|f| f.name == name) {
            field.foreign_key_of = Some(relation);
        }
    }

    Ok(Entity {
        id,
        name: entity.to_string(),
        fields,
        relations,
        branches,
        members,
    })
}

fn find_field<'f>(
    fields: &'f [Field],
    entity: &str,
    name: &str,
    context: &str,
) -> Result<&'f Field, ModelError> {
    fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| ModelError::unknown_key_field(entity, name, context))
}

fn compound_key(
    entity: &str,
    def: &UniqueDef,
    context: &str,
    fields: &[Field],
) -> Result<CompoundUniqueKey, ModelError> {
    let name = def
        .name
        .clone()
        .unwrap_or_else(|| CompoundUniqueKey::default_name(&def.fields));
    if def.fields.len() < 2 {
        return Err(ModelError::CompoundKeyTooSmall {
            entity: entity.to_string(),
            name,
        });
    }
    check_identifier("compound key", &name)?;
    for field in &def.fields {
        if find_field(fields, entity, field, context)?.list {
            return Err(ModelError::ListKeyField {
                entity: entity.to_string(),
                field: field.clone(),
                context: context.to_string(),
            });
        }
    }
    Ok(CompoundUniqueKey {
        name,
        fields: def.fields.clone(),
    })
}

/// Pair every relation with the relation on its target that points back.
/// Runs after all entities exist, since the pairing crosses entity boundaries.
fn resolve_opposites(entities: &mut [Entity]) -> Result<(), ModelError> {
    let mut resolved = Vec::new();
    for entity in entities.iter() {
        for (ri, relation) in entity.relations.iter().enumerate() {
            let target = &entities[relation.target.0];
            let opposite = match &relation.opposite {
                Some(name) => {
                    let back = target.relation(name).ok_or_else(|| {
                        ModelError::opposite(
                            &entity.name,
                            &relation.name,
                            format!("opposite '{}' is not a relation of '{}'", name, target.name),
                        )
                    })?;
                    if back.target != entity.id {
                        return Err(ModelError::opposite(
                            &entity.name,
                            &relation.name,
                            format!("opposite '{}.{}' does not point back", target.name, name),
                        ));
                    }
                    Some(name.clone())
                }
                None => {
                    let candidates: Vec<&Relation> = target
                        .relations
                        .iter()
                        .filter(|back| back.target == entity.id)
                        .filter(|back| !(target.id == entity.id && back.name == relation.name))
                        .filter(|back| {
                            back.opposite
                                .as_deref()
                                .map_or(true, |named| named == relation.name)
                        })
                        .collect();
                    match candidates.as_slice() {
                        [] => None,
                        [single] => Some(single.name.clone()),
                        _ => {
                            return Err(ModelError::opposite(
                                &entity.name,
                                &relation.name,
                                format!(
                                    "{} relations on '{}' point back; name the opposite explicitly",
                                    candidates.len(),
                                    target.name
                                ),
                            ))
                        }
                    }
                }
            };
            resolved.push((entity.id, ri, opposite));
        }
    }
    for (entity, relation, opposite) in resolved {
        entities[entity.0].relations[relation].opposite = opposite;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> SchemaBuilder {
        Schema::builder()
            .entity("User", |e| {
                e.field("id", FieldKind::String).id();
                e.relation("posts", "Post").many();
            })
            .entity("Post", |e| {
                e.field("id", FieldKind::Int).id();
                e.field("authorId", FieldKind::String);
                e.relation("author", "User")
                    .fields(["authorId"])
                    .references(["id"]);
            })
    }

    #[test]
    fn test_opposites_are_paired_after_registration() {
        let schema = minimal().build().unwrap();
        let user = schema.entity("User").unwrap();
        let posts = user.relation("posts").unwrap();
        assert_eq!(posts.opposite.as_deref(), Some("author"));
        let author = schema.opposite(posts).unwrap();
        assert_eq!(author.name, "author");
        assert!(author.is_required_one());
        assert_eq!(author.side, RelationSide::Owning);
    }

    #[test]
    fn test_reserved_identifier_rejected() {
        let err = Schema::builder()
            .entity("Thing", |e| {
                e.field("id", FieldKind::Int).id();
                e.field("AND", FieldKind::Int);
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_missing_primary_key() {
        let err = Schema::builder()
            .entity("Thing", |e| {
                e.field("name", FieldKind::String);
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingPrimaryKey { .. }));
    }
}
