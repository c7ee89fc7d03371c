use super::document::{Extensions, ExternalDocs};
use super::reference::RefOr;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Number, Value};

/// A schema node.
///
/// Every child position holds a [`RefOr`], so a schema may point back at itself
/// directly or through any number of intermediate components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// `$id` (3.1 only).
    pub id: Option<String>,
    pub title: Option<String>,
    pub schema_type: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,

    pub multiple_of: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_maximum: bool,
    pub minimum: Option<Number>,
    pub exclusive_minimum: bool,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub required: IndexSet<String>,
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,

    pub nullable: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub example: Option<Value>,

    pub all_of: Vec<RefOr<Schema>>,
    pub one_of: Vec<RefOr<Schema>>,
    pub any_of: Vec<RefOr<Schema>>,
    pub not: Option<Box<RefOr<Schema>>>,
    pub items: Option<Box<RefOr<Schema>>>,
    pub properties: IndexMap<String, RefOr<Schema>>,
    pub additional_properties: Option<AdditionalProperties>,
    /// 3.1 only.
    pub pattern_properties: IndexMap<String, RefOr<Schema>>,

    pub discriminator: Option<Discriminator>,
    pub external_docs: Option<ExternalDocs>,
    pub extensions: Extensions,
}

impl Schema {
    pub fn of_type(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Default::default()
        }
    }

    pub fn is_type(&self, schema_type: &str) -> bool {
        self.schema_type.as_deref() == Some(schema_type)
    }

    /// `type: string, format: binary`, which 2.0 spells `type: file` in some positions.
    pub fn is_binary(&self) -> bool {
        self.is_type("string") && self.format.as_deref() == Some("binary")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<RefOr<Schema>>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discriminator {
    pub property_name: String,
    pub mapping: IndexMap<String, String>,
}
