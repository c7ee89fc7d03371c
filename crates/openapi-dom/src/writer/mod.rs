//! Projection of the canonical model onto one wire dialect and text format.
//!
//! One generic writer walks the graph and consults a [`DialectTable`] for every
//! field that differs between dialects. References are either kept as pointers or
//! replaced by their target per [`InlinePolicy`]; a target that is already being
//! written further up the same output path is never expanded again.

mod dialect;
mod openapi;
mod schema;
mod swagger;

pub use dialect::{DialectTable, NullableForm, OPENAPI_3_0, OPENAPI_3_1, SWAGGER_2_0};

use crate::error::DomResult;
use crate::format::{Format, SpecVersion};
use crate::model::{
    escape_segment, resolve_location, Component, ComponentKind, Document, Extensions, Header, Parameter,
    PathItem, RefOr, Reference, RequestBody, Response, Schema, SecurityScheme,
};
use crate::walker::{ComponentKey, VisitedSet};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlinePolicy {
    /// Every reference is written as a `$ref` pointer.
    #[default]
    KeepReferences,
    /// Resolved references into the written document are replaced by their target.
    InlineLocal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriterSettings {
    pub inline: InlinePolicy,
}

impl WriterSettings {
    pub fn serialize(&self, document: &Document, version: SpecVersion, format: Format) -> DomResult<String> {
        serialize(document, version, format, self.inline)
    }
}

/// Writes `document` as text in the given dialect and format.
pub fn serialize(
    document: &Document,
    version: SpecVersion,
    format: Format,
    inline: InlinePolicy,
) -> DomResult<String> {
    let value = to_value(document, version, inline);
    let text = to_text(&value, format)?;
    debug!(
        "Serialized {} document as {} ({} bytes)",
        version,
        format.display_name(),
        text.len()
    );
    Ok(text)
}

/// Projects `document` onto the wire tree of one dialect.
pub fn to_value(document: &Document, version: SpecVersion, inline: InlinePolicy) -> Value {
    Writer::new(document, DialectTable::for_version(version), inline).document()
}

pub fn to_text(value: &Value, format: Format) -> DomResult<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Ordered JSON object builder that skips absent and default-valued fields.
#[derive(Default)]
pub(crate) struct Obj(Map<String, Value>);

impl Obj {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn maybe(&mut self, key: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn text(&mut self, key: &str, value: Option<&String>) {
        self.maybe(key, value.cloned());
    }

    /// Sets a string only when it is non-empty.
    pub fn string(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.set(key, value);
        }
    }

    pub fn flag(&mut self, key: &str, value: bool) {
        if value {
            self.set(key, true);
        }
    }

    pub fn list(&mut self, key: &str, values: Vec<Value>) {
        if !values.is_empty() {
            self.set(key, Value::Array(values));
        }
    }

    pub fn map(&mut self, key: &str, values: Map<String, Value>) {
        if !values.is_empty() {
            self.set(key, Value::Object(values));
        }
    }

    pub fn extensions(&mut self, extensions: &Extensions) {
        for (key, value) in extensions {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn merge(&mut self, fields: Map<String, Value>) {
        self.0.extend(fields);
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn build(self) -> Value {
        Value::Object(self.0)
    }
}

/// A node type the writer knows how to project.
pub(crate) trait Emit: Component {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value;
}

impl Emit for Schema {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        schema::schema(writer, item)
    }
}

impl Emit for Parameter {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        if writer.table.body_parameters {
            swagger::parameter(writer, item)
        } else {
            openapi::parameter(writer, item)
        }
    }
}

impl Emit for RequestBody {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        if writer.table.body_parameters {
            swagger::body_parameter(writer, item, "body")
        } else {
            openapi::request_body(writer, item)
        }
    }
}

impl Emit for Response {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        if writer.table.flat_components {
            swagger::response(writer, item)
        } else {
            openapi::response(writer, item)
        }
    }
}

impl Emit for Header {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        if writer.table.flat_components {
            swagger::header(writer, item)
        } else {
            openapi::header(writer, item)
        }
    }
}

impl Emit for SecurityScheme {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        if writer.table.flat_components {
            swagger::security_scheme(item).unwrap_or_else(|| json!({}))
        } else {
            openapi::security_scheme(item)
        }
    }
}

impl Emit for PathItem {
    fn emit<'a>(writer: &mut Writer<'a>, item: &'a Self) -> Value {
        if writer.table.flat_components {
            swagger::path_item(writer, item)
        } else {
            openapi::path_item(writer, item)
        }
    }
}

pub(crate) struct Writer<'a> {
    root: &'a Document,
    table: &'static DialectTable,
    inline: InlinePolicy,
    docs: Vec<&'a Document>,
    /// Components being expanded on the current output path.
    in_progress: VisitedSet,
}

impl<'a> Writer<'a> {
    fn new(root: &'a Document, table: &'static DialectTable, inline: InlinePolicy) -> Self {
        Self {
            root,
            table,
            inline,
            docs: Vec::new(),
            in_progress: VisitedSet::new(),
        }
    }

    fn document(&mut self) -> Value {
        if self.table.flat_components {
            swagger::document(self)
        } else {
            openapi::document(self)
        }
    }

    pub(crate) fn current(&self) -> &'a Document {
        self.docs.last().copied().unwrap_or(self.root)
    }

    /// Runs `f` with references resolving relative to `document`.
    pub(crate) fn within<R>(&mut self, document: &'a Document, f: impl FnOnce(&mut Self) -> R) -> R {
        self.docs.push(document);
        let result = f(self);
        self.docs.pop();
        result
    }

    pub(crate) fn entry<T: Emit>(&mut self, entry: &'a RefOr<T>) -> Value {
        match entry {
            RefOr::Item(item) => T::emit(self, item),
            RefOr::Ref(reference) => self.reference::<T>(reference),
        }
    }

    fn reference<T: Emit + 'a>(&mut self, reference: &'a Reference) -> Value {
        let Some((document, id, entry)) = self.target::<T>(reference) else {
            return self.pointer_value(reference);
        };
        let forced = self.table.section(T::KIND).is_none() || self.body_shadowed(reference);
        let local = std::ptr::eq(document, self.root);
        if !forced && !(self.inline == InlinePolicy::InlineLocal && local) {
            return self.pointer_value(reference);
        }
        let key = ComponentKey::new(document.base_uri.clone(), T::KIND, id);
        if !self.in_progress.insert(key.clone()) {
            // Re-entry: a kind without a section has no pointer to fall back to.
            return if forced {
                json!({})
            } else {
                self.pointer_value(reference)
            };
        }
        let value = self.within(document, |w| w.entry(entry));
        self.in_progress.remove(&key);
        value
    }

    fn target<T: Component + 'a>(&self, reference: &Reference) -> Option<(&'a Document, &'a str, &'a RefOr<T>)> {
        let handle = reference.handle()?;
        let document = self.root.document_for(self.current(), handle.location())?;
        let (id, entry) = T::entries(&document.components).get_key_value(handle.id())?;
        Some((document, id.as_str(), entry))
    }

    /// Follows aliases down to an inline node, together with the document it lives in.
    pub(crate) fn resolve_item<T: Component>(&self, entry: &'a RefOr<T>) -> Option<(&'a Document, &'a T)> {
        let mut document = self.current();
        let mut entry = entry;
        let mut seen = VisitedSet::new();
        loop {
            match entry {
                RefOr::Item(item) => return Some((document, item)),
                RefOr::Ref(reference) => {
                    let handle = reference.handle()?;
                    let next = self.root.document_for(document, handle.location())?;
                    let key = ComponentKey::new(next.base_uri.clone(), T::KIND, handle.id());
                    if !seen.insert(key) {
                        return None;
                    }
                    entry = T::entries(&next.components).get(handle.id())?;
                    document = next;
                }
            }
        }
    }

    /// Whether a resolved reference would be replaced by its target.
    pub(crate) fn inlines(&self, reference: &Reference) -> bool {
        self.inline == InlinePolicy::InlineLocal
            && reference.handle().is_some_and(|handle| {
                self.root
                    .document_for(self.current(), handle.location())
                    .is_some_and(|document| std::ptr::eq(document, self.root))
            })
    }

    /// 2.0 keeps request bodies in `parameters`. A body whose id is taken by a
    /// parameter has no entry there and is written at every use instead.
    pub(crate) fn body_shadowed(&self, reference: &Reference) -> bool {
        self.table.flat_components
            && reference.kind() == ComponentKind::RequestBody
            && reference.handle().is_some_and(|handle| {
                self.root
                    .document_for(self.current(), handle.location())
                    .is_some_and(|document| document.components.parameters.contains_key(handle.id()))
            })
    }

    pub(crate) fn pointer_value(&self, reference: &Reference) -> Value {
        json!({ "$ref": self.pointer(reference) })
    }

    pub(crate) fn pointer(&self, reference: &Reference) -> String {
        let location = self.pointer_location(reference.location());
        let id = reference.id();
        if id.is_empty() {
            return location;
        }
        let kind = reference.kind();
        let section = self
            .table
            .section(kind)
            .unwrap_or_else(|| format!("components/{}", kind.section()));
        format!("{}#/{}/{}", location, section, escape_segment(id))
    }

    fn pointer_location(&self, location: Option<&str>) -> String {
        let current = self.current();
        if std::ptr::eq(current, self.root) {
            return location.unwrap_or_default().to_string();
        }
        let absolute = match location {
            Some(location) => resolve_location(current.base_uri.as_deref(), location),
            None => current.base_uri.clone().unwrap_or_default(),
        };
        if self.root.base_uri.as_deref() == Some(absolute.as_str()) {
            String::new()
        } else {
            absolute
        }
    }

    /// One component section of the written document.
    pub(crate) fn component_entries<T: Emit>(&mut self, entries: &'a IndexMap<String, RefOr<T>>) -> Map<String, Value> {
        let mut section = Map::new();
        for (id, entry) in entries {
            let value = match entry {
                RefOr::Ref(reference) if is_self_alias::<T>(reference, id) => json!({}),
                _ => {
                    let key = ComponentKey::new(self.root.base_uri.clone(), T::KIND, id.as_str());
                    let fresh = self.in_progress.insert(key.clone());
                    let value = self.entry(entry);
                    if fresh {
                        self.in_progress.remove(&key);
                    }
                    value
                }
            };
            section.insert(id.clone(), value);
        }
        section
    }
}

fn is_self_alias<T: Component>(reference: &Reference, id: &str) -> bool {
    reference.kind() == T::KIND && reference.location().is_none() && reference.id() == id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::load;
    use crate::workspace::ReferenceResolution;

    const CYCLIC: &str = r#"
openapi: 3.0.1
info:
  title: Tree
  version: 1.0.0
paths:
  /nodes:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Node'
components:
  schemas:
    Node:
      type: object
      properties:
        children:
          type: array
          items:
            $ref: '#/components/schemas/Node'
"#;

    #[test]
    fn inline_local_stops_at_cycle_re_entry() {
        let document = load(CYCLIC, ReferenceResolution::Local).unwrap().document;
        let value = to_value(&document, SpecVersion::V3_0, InlinePolicy::InlineLocal);
        let schema = &value["paths"]["/nodes"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(
            schema["properties"]["children"]["items"],
            json!({"$ref": "#/components/schemas/Node"})
        );
        let component = &value["components"]["schemas"]["Node"];
        assert_eq!(
            component["properties"]["children"]["items"],
            json!({"$ref": "#/components/schemas/Node"})
        );
    }

    #[test]
    fn keep_references_writes_pointers() {
        let document = load(CYCLIC, ReferenceResolution::Local).unwrap().document;
        let value = to_value(&document, SpecVersion::V2_0, InlinePolicy::KeepReferences);
        assert_eq!(
            value["paths"]["/nodes"]["get"]["responses"]["200"]["schema"],
            json!({"$ref": "#/definitions/Node"})
        );
        assert_eq!(value["swagger"], json!("2.0"));
    }

    #[test]
    fn unresolved_references_stay_pointers() {
        let document = load(CYCLIC, ReferenceResolution::None).unwrap().document;
        let value = to_value(&document, SpecVersion::V3_1, InlinePolicy::InlineLocal);
        assert_eq!(
            value["components"]["schemas"]["Node"]["properties"]["children"]["items"],
            json!({"$ref": "#/components/schemas/Node"})
        );
    }

    #[test]
    fn empty_documents_still_carry_paths() {
        let text = serialize(&Document::new(), SpecVersion::V3_0, Format::Json, InlinePolicy::KeepReferences).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"openapi": "3.0.1", "info": {}, "paths": {}}));
    }
}
