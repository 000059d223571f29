use serde::{Deserialize, Serialize};

/// The scalar shape a schema field's value must take (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Email,
    Date,
    Json,
    Number,
}

/// `type_input.key` on a schema field: hints at which input widget the
/// field uses, and — combined with `entity_type` — whether OCR validation
/// must resolve it against the graph (spec §4.5 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeInputKey {
    Entity,
    Faculty,
    Career,
    User,
    Person,
    #[serde(other)]
    Other,
}

/// `entity_type.key` on a schema field: which kind of graph entity this
/// field resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTypeKey {
    Faculty,
    Career,
    Department,
    Entity,
    User,
    Person,
}

impl EntityTypeKey {
    /// True for the two variants that must resolve through the identity
    /// resolver (spec §4.3) rather than the organizational graph.
    pub fn is_person(&self) -> bool {
        matches!(self, EntityTypeKey::User | EntityTypeKey::Person)
    }

    /// Maps a schema `entity_type.key` onto the `entities.type` value it
    /// is expected to match (spec §4.5 step 3 / original `type_map`).
    pub fn graph_entity_type(&self) -> Option<crate::entity::EntityType> {
        use crate::entity::EntityType;
        match self {
            EntityTypeKey::Career => Some(EntityType::Carrera),
            EntityTypeKey::Faculty => Some(EntityType::Facultad),
            EntityTypeKey::Department => Some(EntityType::Departamento),
            EntityTypeKey::Entity => None,
            EntityTypeKey::User | EntityTypeKey::Person => None,
        }
    }
}

/// One field of a `meta_schemas` document (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub field_key: String,
    pub label: String,
    pub data_type: DataType,
    pub is_required: bool,
    pub sort_order: i64,
    pub type_input: Option<TypeInputKeyField>,
    pub entity_type: Option<EntityTypeKeyField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInputKeyField {
    pub key: TypeInputKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeKeyField {
    pub key: EntityTypeKey,
}

impl SchemaField {
    /// True when OCR validation must resolve this field against the graph
    /// (entity/user search) rather than pass it through or regex-validate
    /// it (spec §4.5 step 3, `_is_entity_field` in the original).
    pub fn is_entity_field(&self) -> bool {
        self.entity_type.is_some()
            || matches!(
                self.type_input.as_ref().map(|t| t.key),
                Some(
                    TypeInputKey::Entity
                        | TypeInputKey::Faculty
                        | TypeInputKey::Career
                        | TypeInputKey::User
                        | TypeInputKey::Person
                )
            )
    }

    /// True when this field resolves to a person rather than a structural
    /// entity.
    pub fn is_person_field(&self) -> bool {
        self.entity_type.as_ref().map(|e| e.key.is_person()).unwrap_or(false)
            || matches!(
                self.type_input.as_ref().map(|t| t.key),
                Some(TypeInputKey::User | TypeInputKey::Person)
            )
    }
}

/// A `meta_schemas` vertex (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaSchema {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    pub version: i64,
    pub fields: Vec<SchemaField>,
}

impl MetaSchema {
    pub fn field(&self, field_key: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.field_key == field_key)
    }
}

/// Descriptor returned by the metadata filter catalog (SPEC_FULL §4.1,
/// grounded in `original_source`'s `get_metadata_filter_catalog`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetadataFilterOption {
    pub key: String,
    pub label: String,
    pub data_type: Option<DataType>,
    pub input_type: Option<TypeInputKey>,
    pub entity_type: Option<EntityTypeKey>,
    pub required: bool,
    pub sort_order: i64,
}
