use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type definition within an authorization model
///
/// Relation rewrites are kept as opaque JSON; this store never evaluates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub relations: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TypeDefinition {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relations: BTreeMap::new(),
            metadata: None,
        }
    }
}

/// Immutable, versioned schema for a store
///
/// Written once under `(store, id)` and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationModel {
    pub id: String,
    pub schema_version: String,
    #[serde(default)]
    pub type_definitions: Vec<TypeDefinition>,
    #[serde(default)]
    pub conditions: BTreeMap<String, serde_json::Value>,
}

impl AuthorizationModel {
    pub fn new(id: impl Into<String>, schema_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema_version: schema_version.into(),
            type_definitions: Vec::new(),
            conditions: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, type_definition: TypeDefinition) -> Self {
        self.type_definitions.push(type_definition);
        self
    }
}
