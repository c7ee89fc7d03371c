use super::components::{ComponentRef, Components};
use super::operation::{OperationType, Operation, PathItem};
use super::reference::{resolve_location, ComponentKind, RefOr};
use super::security::SecurityRequirement;
use indexmap::IndexMap;
use serde_json::Value;

/// `x-` prefixed vendor extensions, kept verbatim.
pub type Extensions = IndexMap<String, Value>;

/// Root of the object graph for one loaded description.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub info: Info,
    /// `jsonSchemaDialect` (3.1 only).
    pub json_schema_dialect: Option<String>,
    pub servers: Vec<Server>,
    pub paths: IndexMap<String, PathItem>,
    /// Path-shaped entries keyed by name rather than URL template (3.1 only).
    pub webhooks: IndexMap<String, RefOr<PathItem>>,
    pub components: Components,
    pub security: Vec<SecurityRequirement>,
    pub tags: Vec<Tag>,
    pub external_docs: Option<ExternalDocs>,
    pub extensions: Extensions,
    /// Location this document was read from; relative external references resolve against it.
    pub base_uri: Option<String>,
    /// Documents pulled in by full resolution, keyed by absolute location.
    pub external_documents: IndexMap<String, Document>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Finds the document a handle points into, given the document the handle appears in.
    ///
    /// `current` is `self` or one of `self.external_documents`; `location` is the
    /// handle's location as written, relative to `current`.
    pub fn document_for<'a>(&'a self, current: &'a Document, location: Option<&str>) -> Option<&'a Document> {
        let Some(location) = location else {
            return Some(current);
        };
        let absolute = resolve_location(current.base_uri.as_deref(), location);
        if self.base_uri.as_deref() == Some(absolute.as_str()) {
            return Some(self);
        }
        self.external_documents.get(&absolute)
    }

    /// Looks up a component of this document.
    pub fn component(&self, kind: ComponentKind, id: &str) -> Option<ComponentRef<'_>> {
        self.components.get(kind, id)
    }

    /// Every operation under `paths`, in document order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, OperationType, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations
                .iter()
                .map(move |(method, operation)| (path.as_str(), *method, operation))
        })
    }
}

// The base location is where the text came from, not part of the graph.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
            && self.json_schema_dialect == other.json_schema_dialect
            && self.servers == other.servers
            && self.paths == other.paths
            && self.webhooks == other.webhooks
            && self.components == other.components
            && self.security == other.security
            && self.tags == other.tags
            && self.external_docs == other.external_docs
            && self.extensions == other.extensions
            && self.external_documents == other.external_documents
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct License {
    pub name: String,
    /// SPDX identifier (3.1 only).
    pub identifier: Option<String>,
    pub url: Option<String>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
    pub variables: IndexMap<String, ServerVariable>,
    pub extensions: Extensions,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// The URL with every `{variable}` replaced by its default value.
    pub fn expanded_url(&self) -> String {
        self.variables
            .iter()
            .fold(self.url.clone(), |url, (name, variable)| {
                url.replace(&format!("{{{}}}", name), &variable.default)
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerVariable {
    pub default: String,
    pub enum_values: Vec<String>,
    pub description: Option<String>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
    pub external_docs: Option<ExternalDocs>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDocs {
    pub url: String,
    pub description: Option<String>,
    pub extensions: Extensions,
}
