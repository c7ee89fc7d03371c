//! Reference resolution across the documents of one load.
//!
//! Resolution only records identity: an `Unresolved` reference becomes a
//! `Resolved` handle naming a components entry. Targets are never expanded, so
//! self and mutual cycles resolve in one pass over the reference sites.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::{DomError, DomResult};
use crate::format::SpecVersion;
use crate::model::{
    resolve_location, ComponentHandle, ComponentKind, Document, Header, MediaType, Operation,
    Parameter, PathItem, RefOr, Reference, RequestBody, Response, Schema,
};
use crate::model::AdditionalProperties;
use crate::reader;
use crate::walker::{self, ComponentKey, Node, Visitor, WalkContext};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How far resolution reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceResolution {
    /// Leave every reference unresolved.
    None,
    /// Resolve references into the document being loaded.
    #[default]
    Local,
    /// Also fetch and resolve references into other documents.
    All,
}

/// Retrieves the raw bytes of an external document.
///
/// Implementations report transport failures as [`DomError::Fetch`].
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, location: &str) -> DomResult<Vec<u8>>;
}

/// Serves documents from memory, keyed by absolute location.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(location, content);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.documents.insert(location.into(), content.into());
    }
}

impl DocumentFetcher for MemoryFetcher {
    fn fetch(&self, location: &str) -> DomResult<Vec<u8>> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| DomError::fetch(location, "document not found"))
    }
}

/// Registry of every component known to one load.
///
/// Created per load and dropped when the load finishes; never shared between loads.
#[derive(Default)]
pub struct Workspace {
    fetcher: Option<Arc<dyn DocumentFetcher>>,
    keys: HashSet<ComponentKey>,
    schema_ids: HashMap<String, ComponentKey>,
    documents: IndexMap<String, Document>,
    failed: HashMap<String, String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
            ..Self::default()
        }
    }

    /// Records every component of `document` under its base location.
    pub fn register(&mut self, document: &Document) {
        let base = document.base_uri.clone();
        for (kind, id, _) in document.components.iter() {
            self.keys.insert(ComponentKey::new(base.clone(), kind, id));
        }
        for (id, entry) in &document.components.schemas {
            if let Some(schema_id) = entry.item().and_then(|schema| schema.id.as_deref()) {
                let uri = resolve_location(base.as_deref(), schema_id);
                self.schema_ids
                    .insert(uri, ComponentKey::new(base.clone(), ComponentKind::Schema, id));
            }
        }
    }

    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The component registered for a schema `$id` URI.
    pub fn schema_by_id(&self, uri: &str) -> Option<&ComponentKey> {
        self.schema_ids.get(uri)
    }

    /// Fetch failure recorded for a location, if any.
    pub fn fetch_failure(&self, location: &str) -> Option<&str> {
        self.failed.get(location).map(String::as_str)
    }

    fn handle_for(
        &self,
        key: &ComponentKey,
        reference: &Reference,
        base: Option<&str>,
    ) -> Option<ComponentHandle> {
        if key.id.is_empty() && key.kind == ComponentKind::Schema {
            if let Some(target) = key.location.as_deref().and_then(|uri| self.schema_ids.get(uri)) {
                let location = match target.location.as_deref() {
                    location if location == base => None,
                    Some(location) => Some(relative_location(base, location)?),
                    None => return None,
                };
                return Some(ComponentHandle::new(
                    ComponentKind::Schema,
                    target.id.clone(),
                    location,
                ));
            }
        }
        self.keys.contains(key).then(|| {
            ComponentHandle::new(
                key.kind,
                key.id.clone(),
                reference.location().map(str::to_string),
            )
        })
    }

    /// Breadth-first retrieval of every document reachable from `root`.
    fn load_externals(&mut self, root: &Document, diagnostic: &mut Diagnostic) -> DomResult<()> {
        let version = diagnostic.spec_version().unwrap_or(SpecVersion::V3_0);
        let mut queue: VecDeque<String> = self.external_locations(root).into_iter().collect();
        while let Some(location) = queue.pop_front() {
            if self.documents.contains_key(&location)
                || self.failed.contains_key(&location)
                || root.base_uri.as_deref() == Some(location.as_str())
            {
                continue;
            }
            let fetched = match &self.fetcher {
                Some(fetcher) => fetcher.fetch(&location),
                None => Err(DomError::fetch(&location, "no document fetcher configured")),
            };
            match fetched {
                Ok(bytes) => {
                    debug!("Fetched external document {} ({} bytes)", location, bytes.len());
                    let document = reader::parse_external(&bytes, &location, version, diagnostic)?;
                    self.register(&document);
                    queue.extend(self.external_locations(&document));
                    self.documents.insert(location, document);
                }
                Err(err) => {
                    let message = match err {
                        DomError::Fetch { message, .. } => message,
                        other => other.to_string(),
                    };
                    warn!("Failed to fetch {}: {}", location, message);
                    diagnostic.error(DiagnosticKind::Fetch, location.as_str(), message.as_str());
                    self.failed.insert(location, message);
                }
            }
        }
        Ok(())
    }

    fn external_locations(&self, document: &Document) -> IndexSet<String> {
        let mut collector = ExternalLocations {
            schema_ids: &self.schema_ids,
            locations: IndexSet::new(),
        };
        walker::walk(document, &mut collector);
        collector.locations
    }
}

struct ExternalLocations<'w> {
    schema_ids: &'w HashMap<String, ComponentKey>,
    locations: IndexSet<String>,
}

impl<'a> Visitor<'a> for ExternalLocations<'_> {
    fn enter(&mut self, node: Node<'a>, ctx: &WalkContext<'_>) {
        let Node::Reference(reference) = node else {
            return;
        };
        if reference.is_resolved() || !reference.is_external() {
            return;
        }
        let key = ctx.key_for(reference);
        if let Some(location) = key.location {
            if key.id.is_empty() && self.schema_ids.contains_key(&location) {
                return;
            }
            self.locations.insert(location);
        }
    }
}

/// Resolves the references of `document` and, under [`ReferenceResolution::All`],
/// of every document it reaches. Fetched documents end up in
/// `document.external_documents`.
pub fn resolve(
    document: &mut Document,
    workspace: &mut Workspace,
    mode: ReferenceResolution,
    diagnostic: &mut Diagnostic,
) -> DomResult<()> {
    if mode == ReferenceResolution::None {
        debug!("Reference resolution disabled");
        return Ok(());
    }

    workspace.register(document);
    if mode == ReferenceResolution::All {
        workspace.load_externals(document, diagnostic)?;
    }

    let mut resolved = resolve_document(document, false, workspace, mode, diagnostic)?;
    let mut externals = std::mem::take(&mut workspace.documents);
    for external in externals.values_mut() {
        resolved += resolve_document(external, true, workspace, mode, diagnostic)?;
    }
    info!(
        "Resolved {} references across {} document(s)",
        resolved,
        externals.len() + 1
    );
    document.external_documents.extend(externals);
    Ok(())
}

fn resolve_document(
    document: &mut Document,
    external: bool,
    workspace: &Workspace,
    mode: ReferenceResolution,
    diagnostic: &mut Diagnostic,
) -> DomResult<usize> {
    let base = document.base_uri.clone();
    let prefix = if external { base.clone().unwrap_or_default() } else { String::new() };
    let mut resolved = 0;

    for Site { pointer, reference } in reference_sites(document) {
        if reference.is_resolved() {
            continue;
        }
        let key = ComponentKey::relative_to(reference, base.as_deref());
        if let Some(handle) = workspace.handle_for(&key, reference, base.as_deref()) {
            debug!("Resolved {} -> {}/{}", pointer, handle.kind(), handle.id());
            reference.resolve_to(handle);
            resolved += 1;
            continue;
        }

        let pointer = format!("{}{}", prefix, pointer);
        let target = describe(&key);
        match mode {
            ReferenceResolution::All => {
                let failure = key
                    .location
                    .as_deref()
                    .and_then(|location| workspace.fetch_failure(location).map(|m| (location, m)));
                return Err(match failure {
                    Some((location, message)) => DomError::fetch(location, message),
                    None => DomError::unresolved(format!("{} (at {})", target, pointer)),
                });
            }
            _ if reference.is_external() => {
                warn!("External reference {} left unresolved", target);
                diagnostic.warning(
                    DiagnosticKind::UnresolvedReference,
                    pointer,
                    format!("External reference {} was not resolved", target),
                );
            }
            _ => diagnostic.error(
                DiagnosticKind::UnresolvedReference,
                pointer,
                format!("Reference {} could not be resolved", target),
            ),
        }
    }
    Ok(resolved)
}

fn describe(key: &ComponentKey) -> String {
    let location = key.location.as_deref().unwrap_or("");
    if key.id.is_empty() {
        location.to_string()
    } else {
        format!("{}#/components/{}/{}", location, key.kind.section(), key.id)
    }
}

/// Expresses an absolute location relative to `base`, if possible.
fn relative_location(base: Option<&str>, target: &str) -> Option<String> {
    if resolve_location(base, target) == target {
        return Some(target.to_string());
    }
    let parent = Path::new(base?).parent()?.to_string_lossy().replace('\\', "/");
    let candidate = target.strip_prefix(&format!("{}/", parent))?.to_string();
    (resolve_location(base, &candidate) == target).then_some(candidate)
}

struct Site<'d> {
    pointer: String,
    reference: &'d mut Reference,
}

/// Every reference position of one document, mutably borrowed.
fn reference_sites(document: &mut Document) -> Vec<Site<'_>> {
    let mut sites = Sites::default();
    let Document {
        paths,
        webhooks,
        components,
        ..
    } = document;

    for (path, item) in paths.iter_mut() {
        sites.push_segments(&["paths", path.as_str()]);
        sites.path_item(item);
        sites.pop_segments(2);
    }
    for (name, entry) in webhooks.iter_mut() {
        sites.push_segments(&["webhooks", name.as_str()]);
        sites.entry(entry, Sites::path_item);
        sites.pop_segments(2);
    }

    macro_rules! section {
        ($field:ident, $kind:ident, $visit:expr) => {
            for (id, entry) in components.$field.iter_mut() {
                sites.push_segments(&["components", ComponentKind::$kind.section(), id.as_str()]);
                sites.entry(entry, $visit);
                sites.pop_segments(3);
            }
        };
    }
    section!(schemas, Schema, Sites::schema);
    section!(responses, Response, Sites::response);
    section!(parameters, Parameter, Sites::parameter);
    section!(request_bodies, RequestBody, Sites::request_body);
    section!(headers, Header, Sites::header);
    section!(security_schemes, SecurityScheme, |_, _| {});
    section!(path_items, PathItem, Sites::path_item);

    sites.sites
}

#[derive(Default)]
struct Sites<'d> {
    segments: Vec<String>,
    sites: Vec<Site<'d>>,
}

impl<'d> Sites<'d> {
    fn push_segments(&mut self, segments: &[&str]) {
        self.segments.extend(segments.iter().map(|s| s.to_string()));
    }

    fn pop_segments(&mut self, count: usize) {
        let depth = self.segments.len().saturating_sub(count);
        self.segments.truncate(depth);
    }

    fn pointer(&self) -> String {
        let mut pointer = String::from("#");
        for segment in &self.segments {
            pointer.push('/');
            pointer.push_str(&crate::model::escape_segment(segment));
        }
        pointer
    }

    fn entry<T>(&mut self, entry: &'d mut RefOr<T>, visit: impl FnOnce(&mut Self, &'d mut T)) {
        match entry {
            RefOr::Ref(reference) => {
                let pointer = self.pointer();
                self.sites.push(Site { pointer, reference });
            }
            RefOr::Item(item) => visit(self, item),
        }
    }

    fn path_item(&mut self, item: &'d mut PathItem) {
        for (index, parameter) in item.parameters.iter_mut().enumerate() {
            self.push_segments(&["parameters", index.to_string().as_str()]);
            self.entry(parameter, Self::parameter);
            self.pop_segments(2);
        }
        for (method, operation) in item.operations.iter_mut() {
            self.push_segments(&[method.as_str()]);
            self.operation(operation);
            self.pop_segments(1);
        }
    }

    fn operation(&mut self, operation: &'d mut Operation) {
        for (index, parameter) in operation.parameters.iter_mut().enumerate() {
            self.push_segments(&["parameters", index.to_string().as_str()]);
            self.entry(parameter, Self::parameter);
            self.pop_segments(2);
        }
        if let Some(body) = operation.request_body.as_mut() {
            self.push_segments(&["requestBody"]);
            self.entry(body, Self::request_body);
            self.pop_segments(1);
        }
        for (status, response) in operation.responses.iter_mut() {
            self.push_segments(&["responses", status.as_str()]);
            self.entry(response, Self::response);
            self.pop_segments(2);
        }
    }

    fn parameter(&mut self, parameter: &'d mut Parameter) {
        if let Some(schema) = parameter.schema.as_mut() {
            self.push_segments(&["schema"]);
            self.entry(schema, Self::schema);
            self.pop_segments(1);
        }
        self.content(&mut parameter.content);
    }

    fn request_body(&mut self, body: &'d mut RequestBody) {
        self.content(&mut body.content);
    }

    fn response(&mut self, response: &'d mut Response) {
        for (name, header) in response.headers.iter_mut() {
            self.push_segments(&["headers", name.as_str()]);
            self.entry(header, Self::header);
            self.pop_segments(2);
        }
        self.content(&mut response.content);
    }

    fn header(&mut self, header: &'d mut Header) {
        if let Some(schema) = header.schema.as_mut() {
            self.push_segments(&["schema"]);
            self.entry(schema, Self::schema);
            self.pop_segments(1);
        }
    }

    fn content(&mut self, content: &'d mut IndexMap<String, MediaType>) {
        for (media_type, media) in content.iter_mut() {
            if let Some(schema) = media.schema.as_mut() {
                self.push_segments(&["content", media_type.as_str(), "schema"]);
                self.entry(schema, Self::schema);
                self.pop_segments(3);
            }
        }
    }

    fn schema(&mut self, schema: &'d mut Schema) {
        let Schema {
            all_of,
            one_of,
            any_of,
            not,
            items,
            properties,
            additional_properties,
            pattern_properties,
            ..
        } = schema;

        for (keyword, list) in [("allOf", all_of), ("oneOf", one_of), ("anyOf", any_of)] {
            for (index, child) in list.iter_mut().enumerate() {
                self.push_segments(&[keyword, index.to_string().as_str()]);
                self.entry(child, Self::schema);
                self.pop_segments(2);
            }
        }
        if let Some(not) = not.as_deref_mut() {
            self.push_segments(&["not"]);
            self.entry(not, Self::schema);
            self.pop_segments(1);
        }
        if let Some(items) = items.as_deref_mut() {
            self.push_segments(&["items"]);
            self.entry(items, Self::schema);
            self.pop_segments(1);
        }
        for (name, property) in properties.iter_mut() {
            self.push_segments(&["properties", name.as_str()]);
            self.entry(property, Self::schema);
            self.pop_segments(2);
        }
        if let Some(AdditionalProperties::Schema(additional)) = additional_properties.as_mut() {
            self.push_segments(&["additionalProperties"]);
            self.entry(&mut **additional, Self::schema);
            self.pop_segments(1);
        }
        for (pattern, property) in pattern_properties.iter_mut() {
            self.push_segments(&["patternProperties", pattern.as_str()]);
            self.entry(property, Self::schema);
            self.pop_segments(2);
        }
    }
}
