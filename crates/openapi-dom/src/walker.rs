//! Cycle-safe traversal over a resolved document.
//!
//! The walker follows resolved references into their targets. A target is always
//! announced to the visitor, but its children are only descended into the first
//! time its identity is reached during one walk, so any finite graph terminates.

use crate::model::{
    ComponentKind, ComponentRef, Components, Document, Header, Info, MediaType, Operation,
    OperationType, Parameter, PathItem, RefOr, Reference, RequestBody, Response, Schema,
    SecurityRequirement, SecurityScheme, Server, Tag,
};
use crate::model::{escape_segment, resolve_location, AdditionalProperties};
use std::collections::HashSet;

/// Every node kind the walker announces.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Document(&'a Document),
    Info(&'a Info),
    Server(&'a Server),
    Tag(&'a Tag),
    Components(&'a Components),
    PathItem(&'a PathItem),
    Operation(OperationType, &'a Operation),
    Parameter(&'a Parameter),
    RequestBody(&'a RequestBody),
    Response(&'a Response),
    Header(&'a Header),
    MediaType(&'a MediaType),
    Schema(&'a Schema),
    SecurityScheme(&'a SecurityScheme),
    SecurityRequirement(&'a SecurityRequirement),
    /// A reference site, announced before the walker follows it.
    Reference(&'a Reference),
}

/// Receives `enter`/`leave` for every node of one walk.
pub trait Visitor<'a> {
    fn enter(&mut self, _node: Node<'a>, _ctx: &WalkContext<'_>) {}

    fn leave(&mut self, _node: Node<'a>, _ctx: &WalkContext<'_>) {}
}

/// Where the walker currently is.
pub struct WalkContext<'w> {
    root: &'w Document,
    document: &'w Document,
    segments: &'w [String],
    path: Option<&'w str>,
}

impl<'w> WalkContext<'w> {
    /// JSON pointer of the current node. Inside a followed component this is the
    /// component's own location, not the path of arrival.
    pub fn pointer(&self) -> String {
        let mut pointer = String::from("#");
        for segment in self.segments {
            pointer.push('/');
            pointer.push_str(&escape_segment(segment));
        }
        pointer
    }

    pub fn segments(&self) -> &[String] {
        self.segments
    }

    pub fn root(&self) -> &Document {
        self.root
    }

    /// The document the current node lives in.
    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn is_external(&self) -> bool {
        !std::ptr::eq(self.root, self.document)
    }

    /// URL template of the enclosing `paths` entry.
    pub fn path(&self) -> Option<&str> {
        self.path
    }

    /// Identity of the component a reference at this position points at.
    pub fn key_for(&self, reference: &Reference) -> ComponentKey {
        ComponentKey::of(reference, self.document)
    }
}

/// Identity of a component across every document of one load: absolute document
/// location (`None` for a root without a location), kind and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    pub location: Option<String>,
    pub kind: ComponentKind,
    pub id: String,
}

impl ComponentKey {
    pub fn new(location: Option<String>, kind: ComponentKind, id: impl Into<String>) -> Self {
        Self {
            location,
            kind,
            id: id.into(),
        }
    }

    /// The key a reference written inside `current` points at.
    pub fn of(reference: &Reference, current: &Document) -> Self {
        Self::relative_to(reference, current.base_uri.as_deref())
    }

    /// Same as [`ComponentKey::of`], given only the base location of the current document.
    pub fn relative_to(reference: &Reference, base: Option<&str>) -> Self {
        let location = match reference.location() {
            Some(location) => Some(resolve_location(base, location)),
            None => base.map(str::to_string),
        };
        Self::new(location, reference.kind(), reference.id())
    }
}

/// Identities reached during one traversal. Never shared between walks.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    keys: HashSet<ComponentKey>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is inserted.
    pub fn insert(&mut self, key: ComponentKey) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &ComponentKey) -> bool {
        self.keys.remove(key)
    }
}

/// Runs several visitors over a single walk.
#[derive(Default)]
pub struct Visitors<'v, 'a> {
    visitors: Vec<&'v mut dyn Visitor<'a>>,
}

impl<'v, 'a> Visitors<'v, 'a> {
    pub fn new() -> Self {
        Self {
            visitors: Vec::new(),
        }
    }

    pub fn with(mut self, visitor: &'v mut dyn Visitor<'a>) -> Self {
        self.visitors.push(visitor);
        self
    }
}

impl<'a> Visitor<'a> for Visitors<'_, 'a> {
    fn enter(&mut self, node: Node<'a>, ctx: &WalkContext<'_>) {
        for visitor in self.visitors.iter_mut() {
            visitor.enter(node, ctx);
        }
    }

    fn leave(&mut self, node: Node<'a>, ctx: &WalkContext<'_>) {
        for visitor in self.visitors.iter_mut() {
            visitor.leave(node, ctx);
        }
    }
}

/// Walks the whole document once.
pub fn walk<'a, V: Visitor<'a> + ?Sized>(document: &'a Document, visitor: &mut V) {
    Walker::new(document, visitor).walk_document();
}

pub struct Walker<'a, 'v, V: Visitor<'a> + ?Sized> {
    root: &'a Document,
    docs: Vec<&'a Document>,
    segments: Vec<String>,
    path: Option<&'a str>,
    visited: VisitedSet,
    visitor: &'v mut V,
}

impl<'a, 'v, V: Visitor<'a> + ?Sized> Walker<'a, 'v, V> {
    /// `root` is the document references are resolved against.
    pub fn new(root: &'a Document, visitor: &'v mut V) -> Self {
        Self {
            root,
            docs: Vec::new(),
            segments: Vec::new(),
            path: None,
            visited: VisitedSet::new(),
            visitor,
        }
    }

    pub fn walk_document(&mut self) {
        let document = self.root;
        self.notify(Node::Document(document), true);
        self.at(&["info"], |w| w.leaf(Node::Info(&document.info)));
        for (index, server) in document.servers.iter().enumerate() {
            let index = index.to_string();
            self.at(&["servers", index.as_str()], |w| w.leaf(Node::Server(server)));
        }
        for (path, item) in &document.paths {
            self.path = Some(path.as_str());
            self.at(&["paths", path.as_str()], |w| w.path_item(item, true));
            self.path = None;
        }
        for (name, entry) in &document.webhooks {
            self.at(&["webhooks", name.as_str()], |w| w.entry(entry, Self::path_item));
        }
        self.components(&document.components);
        for (index, requirement) in document.security.iter().enumerate() {
            let index = index.to_string();
            self.at(&["security", index.as_str()], |w| {
                w.leaf(Node::SecurityRequirement(requirement))
            });
        }
        for (index, tag) in document.tags.iter().enumerate() {
            let index = index.to_string();
            self.at(&["tags", index.as_str()], |w| w.leaf(Node::Tag(tag)));
        }
        self.notify(Node::Document(document), false);
    }

    /// Walks one path item of the root document, keyed by its URL template.
    pub fn walk_path_item(&mut self, path: &'a str, item: &'a PathItem) {
        self.path = Some(path);
        self.at(&["paths", path], |w| w.path_item(item, true));
        self.path = None;
    }

    pub fn walk_webhook(&mut self, name: &'a str, entry: &'a RefOr<PathItem>) {
        self.at(&["webhooks", name], |w| w.entry(entry, Self::path_item));
    }

    pub fn walk_security_requirement(&mut self, requirement: &'a SecurityRequirement) {
        self.leaf(Node::SecurityRequirement(requirement));
    }

    fn current(&self) -> &'a Document {
        self.docs.last().copied().unwrap_or(self.root)
    }

    fn notify(&mut self, node: Node<'a>, entering: bool) {
        let document = self.current();
        let ctx = WalkContext {
            root: self.root,
            document,
            segments: &self.segments,
            path: self.path,
        };
        if entering {
            self.visitor.enter(node, &ctx);
        } else {
            self.visitor.leave(node, &ctx);
        }
    }

    fn leaf(&mut self, node: Node<'a>) {
        self.notify(node, true);
        self.notify(node, false);
    }

    fn at(&mut self, segments: &[&str], f: impl FnOnce(&mut Self)) {
        let depth = self.segments.len();
        self.segments.extend(segments.iter().map(|s| s.to_string()));
        f(self);
        self.segments.truncate(depth);
    }

    fn entry<T>(&mut self, entry: &'a RefOr<T>, visit: fn(&mut Self, &'a T, bool)) {
        match entry {
            RefOr::Ref(reference) => self.follow(reference),
            RefOr::Item(item) => visit(self, item, true),
        }
    }

    fn follow(&mut self, reference: &'a Reference) {
        self.notify(Node::Reference(reference), true);
        if let Some(handle) = reference.handle() {
            let current = self.current();
            let target = self
                .root
                .document_for(current, handle.location())
                .and_then(|document| {
                    document
                        .components
                        .get(handle.kind(), handle.id())
                        .map(|entry| (document, entry))
                });
            if let Some((document, entry)) = target {
                let key = ComponentKey::new(
                    document.base_uri.clone(),
                    handle.kind(),
                    handle.id(),
                );
                let first = self.visited.insert(key);
                let arrival = std::mem::replace(
                    &mut self.segments,
                    vec![
                        "components".to_string(),
                        handle.kind().section().to_string(),
                        handle.id().to_string(),
                    ],
                );
                self.docs.push(document);
                match entry.reference() {
                    Some(next) => {
                        if first {
                            self.follow(next);
                        }
                    }
                    None => self.component_item(entry, first),
                }
                self.docs.pop();
                self.segments = arrival;
            }
        }
        self.notify(Node::Reference(reference), false);
    }

    fn components(&mut self, components: &'a Components) {
        self.notify(Node::Components(components), true);
        for (kind, id, entry) in components.iter() {
            self.at(&["components", kind.section(), id], |w| {
                let key = ComponentKey::new(w.current().base_uri.clone(), kind, id);
                let first = w.visited.insert(key);
                match entry.reference() {
                    Some(reference) if first => w.follow(reference),
                    Some(reference) => w.leaf(Node::Reference(reference)),
                    None => w.component_item(entry, first),
                }
            });
        }
        self.notify(Node::Components(components), false);
    }

    fn component_item(&mut self, entry: ComponentRef<'a>, descend: bool) {
        match entry {
            ComponentRef::Schema(RefOr::Item(item)) => self.schema(item, descend),
            ComponentRef::Response(RefOr::Item(item)) => self.response(item, descend),
            ComponentRef::Parameter(RefOr::Item(item)) => self.parameter(item, descend),
            ComponentRef::RequestBody(RefOr::Item(item)) => self.request_body(item, descend),
            ComponentRef::Header(RefOr::Item(item)) => self.header(item, descend),
            ComponentRef::SecurityScheme(RefOr::Item(item)) => {
                self.leaf(Node::SecurityScheme(item))
            }
            ComponentRef::PathItem(RefOr::Item(item)) => self.path_item(item, descend),
            _ => {}
        }
    }

    fn path_item(&mut self, item: &'a PathItem, descend: bool) {
        self.notify(Node::PathItem(item), true);
        if descend {
            for (index, server) in item.servers.iter().enumerate() {
                let index = index.to_string();
                self.at(&["servers", index.as_str()], |w| w.leaf(Node::Server(server)));
            }
            for (index, parameter) in item.parameters.iter().enumerate() {
                let index = index.to_string();
                self.at(&["parameters", index.as_str()], |w| w.entry(parameter, Self::parameter));
            }
            for (method, operation) in &item.operations {
                self.at(&[method.as_str()], |w| w.operation(*method, operation));
            }
        }
        self.notify(Node::PathItem(item), false);
    }

    fn operation(&mut self, method: OperationType, operation: &'a Operation) {
        self.notify(Node::Operation(method, operation), true);
        for (index, parameter) in operation.parameters.iter().enumerate() {
            let index = index.to_string();
            self.at(&["parameters", index.as_str()], |w| w.entry(parameter, Self::parameter));
        }
        if let Some(body) = &operation.request_body {
            self.at(&["requestBody"], |w| w.entry(body, Self::request_body));
        }
        for (status, response) in &operation.responses {
            self.at(&["responses", status.as_str()], |w| w.entry(response, Self::response));
        }
        for (index, requirement) in operation.security.iter().flatten().enumerate() {
            let index = index.to_string();
            self.at(&["security", index.as_str()], |w| {
                w.leaf(Node::SecurityRequirement(requirement))
            });
        }
        for (index, server) in operation.servers.iter().enumerate() {
            let index = index.to_string();
            self.at(&["servers", index.as_str()], |w| w.leaf(Node::Server(server)));
        }
        self.notify(Node::Operation(method, operation), false);
    }

    fn parameter(&mut self, parameter: &'a Parameter, descend: bool) {
        self.notify(Node::Parameter(parameter), true);
        if descend {
            if let Some(schema) = &parameter.schema {
                self.at(&["schema"], |w| w.entry(schema, Self::schema));
            }
            self.content(&parameter.content);
        }
        self.notify(Node::Parameter(parameter), false);
    }

    fn request_body(&mut self, body: &'a RequestBody, descend: bool) {
        self.notify(Node::RequestBody(body), true);
        if descend {
            self.content(&body.content);
        }
        self.notify(Node::RequestBody(body), false);
    }

    fn response(&mut self, response: &'a Response, descend: bool) {
        self.notify(Node::Response(response), true);
        if descend {
            for (name, header) in &response.headers {
                self.at(&["headers", name.as_str()], |w| w.entry(header, Self::header));
            }
            self.content(&response.content);
        }
        self.notify(Node::Response(response), false);
    }

    fn header(&mut self, header: &'a Header, descend: bool) {
        self.notify(Node::Header(header), true);
        if descend {
            if let Some(schema) = &header.schema {
                self.at(&["schema"], |w| w.entry(schema, Self::schema));
            }
        }
        self.notify(Node::Header(header), false);
    }

    fn content(&mut self, content: &'a indexmap::IndexMap<String, MediaType>) {
        for (media_type, media) in content {
            self.at(&["content", media_type.as_str()], |w| {
                w.notify(Node::MediaType(media), true);
                if let Some(schema) = &media.schema {
                    w.at(&["schema"], |w| w.entry(schema, Self::schema));
                }
                w.notify(Node::MediaType(media), false);
            });
        }
    }

    fn schema(&mut self, schema: &'a Schema, descend: bool) {
        self.notify(Node::Schema(schema), true);
        if descend {
            for (keyword, list) in [
                ("allOf", &schema.all_of),
                ("oneOf", &schema.one_of),
                ("anyOf", &schema.any_of),
            ] {
                for (index, child) in list.iter().enumerate() {
                    let index = index.to_string();
                    self.at(&[keyword, index.as_str()], |w| w.entry(child, Self::schema));
                }
            }
            if let Some(not) = &schema.not {
                self.at(&["not"], |w| w.entry(not, Self::schema));
            }
            if let Some(items) = &schema.items {
                self.at(&["items"], |w| w.entry(items, Self::schema));
            }
            for (name, property) in &schema.properties {
                self.at(&["properties", name.as_str()], |w| w.entry(property, Self::schema));
            }
            if let Some(AdditionalProperties::Schema(additional)) = &schema.additional_properties {
                self.at(&["additionalProperties"], |w| w.entry(additional, Self::schema));
            }
            for (pattern, property) in &schema.pattern_properties {
                self.at(&["patternProperties", pattern.as_str()], |w| {
                    w.entry(property, Self::schema)
                });
            }
        }
        self.notify(Node::Schema(schema), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentHandle, MediaType};

    fn resolved(id: &str) -> RefOr<Schema> {
        RefOr::Ref(Reference::Resolved(ComponentHandle::new(
            ComponentKind::Schema,
            id,
            None,
        )))
    }

    fn cyclic_document() -> Document {
        let mut document = Document::new();
        let mut node = Schema::of_type("object");
        node.properties.insert("next".into(), resolved("Node"));
        document.components.schemas.insert("Node".into(), node.into());

        // A -> B -> C -> A
        for (id, next) in [("A", "B"), ("B", "C"), ("C", "A")] {
            let mut schema = Schema::of_type("object");
            schema.properties.insert("link".into(), resolved(next));
            document.components.schemas.insert(id.into(), schema.into());
        }

        let mut operation = Operation::default();
        operation.responses.insert(
            "200".into(),
            RefOr::Item(Response {
                description: Some("ok".into()),
                content: [("application/json".to_string(), MediaType::with_schema(resolved("A")))]
                    .into_iter()
                    .collect(),
                ..Default::default()
            }),
        );
        let mut item = PathItem::default();
        item.operations.insert(OperationType::Get, operation);
        document.paths.insert("/nodes".into(), item);
        document
    }

    #[derive(Default)]
    struct Counter {
        schemas: usize,
        references: usize,
        leaves: usize,
        pointers: Vec<String>,
    }

    impl<'a> Visitor<'a> for Counter {
        fn enter(&mut self, node: Node<'a>, ctx: &WalkContext<'_>) {
            match node {
                Node::Schema(_) => {
                    self.schemas += 1;
                    self.pointers.push(ctx.pointer());
                }
                Node::Reference(_) => self.references += 1,
                _ => {}
            }
        }

        fn leave(&mut self, node: Node<'a>, _ctx: &WalkContext<'_>) {
            if matches!(node, Node::Schema(_)) {
                self.leaves += 1;
            }
        }
    }

    #[test]
    fn cycles_terminate_and_every_arrival_is_announced() {
        let document = cyclic_document();
        let mut counter = Counter::default();
        walk(&document, &mut counter);

        assert_eq!(counter.schemas, counter.leaves);
        // Response path: A, B, C, then A again without descent.
        // Components: Node, its self arrival, and A, B, C re-announced without descent.
        assert_eq!(counter.references, 5);
        assert_eq!(counter.schemas, 4 + 1 + 1 + 3);
        assert!(counter
            .pointers
            .iter()
            .all(|pointer| pointer.starts_with("#/components/schemas/")));
    }

    #[test]
    fn separate_visitors_share_one_walk() {
        let document = cyclic_document();
        let mut first = Counter::default();
        let mut second = Counter::default();
        {
            let mut visitors = Visitors::new().with(&mut first).with(&mut second);
            walk(&document, &mut visitors);
        }
        assert_eq!(first.schemas, second.schemas);
        assert_eq!(first.references, second.references);
    }

    #[test]
    fn alias_loops_between_component_entries_terminate() {
        let mut document = Document::new();
        document.components.schemas.insert("Left".into(), resolved("Right"));
        document.components.schemas.insert("Right".into(), resolved("Left"));
        let mut counter = Counter::default();
        walk(&document, &mut counter);
        assert_eq!(counter.schemas, 0);
        assert!(counter.references >= 2);
    }

    #[test]
    fn keys_resolve_relative_to_the_current_document() {
        let document = Document::new().with_base_uri("specs/api.yaml");
        let reference = Reference::external(ComponentKind::Schema, "Pet", "common/pet.yaml");
        let key = ComponentKey::of(&reference, &document);
        assert_eq!(key.location.as_deref(), Some("specs/common/pet.yaml"));

        let local = ComponentKey::of(&Reference::local(ComponentKind::Schema, "Pet"), &document);
        assert_eq!(local.location.as_deref(), Some("specs/api.yaml"));
    }
}
