//! Slicing a document down to an operation subset plus the components it still needs.

use crate::error::{DomError, DomResult};
use crate::model::{
    ComponentKind, Components, Document, Operation, OperationType, PathItem, RefOr, Server,
};
use crate::walker::{ComponentKey, Node, Visitor, WalkContext, Walker};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

/// Decides whether an operation is kept: `(path or webhook name, method, operation)`.
pub type Predicate = Box<dyn Fn(&str, OperationType, &Operation) -> bool + Send + Sync>;

/// Requests taken from a request collection: raw URL mapped to HTTP methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestCollection {
    pub name: String,
    pub requests: IndexMap<String, Vec<String>>,
}

impl RequestCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: IndexMap::new(),
        }
    }

    pub fn with_request(mut self, url: impl Into<String>, method: impl Into<String>) -> Self {
        self.add(url, method);
        self
    }

    pub fn add(&mut self, url: impl Into<String>, method: impl Into<String>) {
        let methods = self.requests.entry(url.into()).or_default();
        let method = method.into().to_uppercase();
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
}

/// Selector groups for [`create_predicate`]. Exactly one group must be set.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub operation_ids: Vec<String>,
    pub tags: Vec<String>,
    pub collection: Option<RequestCollection>,
}

impl FilterCriteria {
    /// Comma-separated operation ids; `*` keeps every operation.
    pub fn operation_ids(mut self, list: &str) -> Self {
        self.operation_ids = split_list(list);
        self
    }

    /// Comma-separated tags. A single tag is matched as a regular expression.
    pub fn tags(mut self, list: &str) -> Self {
        self.tags = split_list(list);
        self
    }

    pub fn collection(mut self, collection: RequestCollection) -> Self {
        self.collection = Some(collection);
        self
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds the predicate for one selector group.
///
/// A collection is checked against `source` up front: every URL/method pair has to
/// name an operation of the document.
pub fn create_predicate(criteria: &FilterCriteria, source: &Document) -> DomResult<Predicate> {
    if !criteria.operation_ids.is_empty() && !criteria.tags.is_empty() {
        return Err(DomError::filter_config(
            "Cannot specify both operationIds and tags at the same time.",
        ));
    }
    if criteria.collection.is_some()
        && (!criteria.operation_ids.is_empty() || !criteria.tags.is_empty())
    {
        return Err(DomError::filter_config(
            "Cannot specify a Postman collection together with operationIds or tags.",
        ));
    }

    if !criteria.operation_ids.is_empty() {
        if criteria.operation_ids.iter().any(|id| id == "*") {
            return Ok(Box::new(|_, _, _| true));
        }
        let ids: HashSet<String> = criteria.operation_ids.iter().cloned().collect();
        return Ok(Box::new(move |_, _, operation| {
            operation
                .operation_id
                .as_ref()
                .is_some_and(|id| ids.contains(id))
        }));
    }

    if !criteria.tags.is_empty() {
        if let [single] = criteria.tags.as_slice() {
            let pattern = Regex::new(single).map_err(|err| {
                DomError::filter_config(format!("Invalid tag pattern '{}': {}", single, err))
            })?;
            return Ok(Box::new(move |_, _, operation| {
                operation.tags.iter().any(|tag| pattern.is_match(tag))
            }));
        }
        let tags: HashSet<String> = criteria.tags.iter().cloned().collect();
        return Ok(Box::new(move |_, _, operation| {
            operation.tags.iter().any(|tag| tags.contains(tag))
        }));
    }

    if let Some(collection) = &criteria.collection {
        if collection.requests.is_empty() {
            return Err(DomError::filter_config(format!(
                "The Postman collection '{}' contains no requests.",
                collection.name
            )));
        }
        let selected = match_collection(collection, source)?;
        return Ok(Box::new(move |path, method, _| {
            selected.contains(&(normalize_path(path), method))
        }));
    }

    Err(DomError::filter_config(
        "Either operationId(s),tag(s) or Postman collection need to be specified.",
    ))
}

/// Maps every collection request onto `(normalized path, method)` of the source.
fn match_collection(
    collection: &RequestCollection,
    source: &Document,
) -> DomResult<HashSet<(String, OperationType)>> {
    let templates: IndexMap<String, &PathItem> = source
        .paths
        .iter()
        .map(|(path, item)| (normalize_path(path), item))
        .collect();

    let mut selected = HashSet::new();
    let mut missing = Vec::new();
    for (url, methods) in &collection.requests {
        let path = normalize_path(&request_path(url, &source.servers));
        for method in methods {
            let found = method
                .parse::<OperationType>()
                .ok()
                .filter(|method| {
                    templates
                        .get(&path)
                        .is_some_and(|item| item.operations.contains_key(method))
                });
            match found {
                Some(method) => {
                    selected.insert((path.clone(), method));
                }
                None => missing.push(format!("{} {}", method.to_uppercase(), url)),
            }
        }
    }

    if !missing.is_empty() {
        return Err(DomError::filter_config(format!(
            "The urls in the Postman collection '{}' could not be found: {}",
            collection.name,
            missing.join(", ")
        )));
    }
    debug!(
        "Collection '{}' selects {} operations",
        collection.name,
        selected.len()
    );
    Ok(selected)
}

/// The path part of a collection URL, with any server prefix removed.
fn request_path(raw: &str, servers: &[Server]) -> String {
    let raw = raw.split(['?', '#']).next().unwrap_or(raw);
    for server in servers {
        let base = server.expanded_url();
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            continue;
        }
        if let (Some(head), Some(rest)) = (raw.get(..base.len()), raw.get(base.len()..)) {
            if head.eq_ignore_ascii_case(base) {
                return rest.to_string();
            }
        }
    }
    if let Ok(url) = Url::parse(raw) {
        if url.has_host() {
            let path = url.path();
            return urlencoding::decode(path)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| path.to_string());
        }
    }
    // Collection variables such as `{{baseUrl}}` stand in for the server.
    match raw.strip_prefix("{{").and_then(|rest| rest.split_once("}}")) {
        Some((_, rest)) => rest.to_string(),
        None => raw.to_string(),
    }
}

/// Path template with parameter names erased: `/pets/{id}` and `/pets/:petId` both
/// become `/pets/{}`.
pub(crate) fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let template = segment.starts_with('{') && segment.ends_with('}');
            if template || segment.starts_with(':') {
                "{}"
            } else {
                segment
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// A new document holding the operations `predicate` keeps, and exactly the
/// components reachable from them.
pub fn create_filtered_document(source: &Document, predicate: &Predicate) -> Document {
    let mut filtered = Document {
        info: source.info.clone(),
        json_schema_dialect: source.json_schema_dialect.clone(),
        servers: source.servers.clone(),
        security: source.security.clone(),
        external_docs: source.external_docs.clone(),
        extensions: source.extensions.clone(),
        base_uri: source.base_uri.clone(),
        ..Document::default()
    };

    for (path, item) in &source.paths {
        if let Some(kept) = filter_path_item(path, item, predicate) {
            filtered.paths.insert(path.clone(), kept);
        }
    }
    for (name, entry) in &source.webhooks {
        if let Some(kept) = filter_webhook(source, name, entry, predicate) {
            filtered.webhooks.insert(name.clone(), kept);
        }
    }

    let reached = closure(source, &filtered);
    filtered.components = copy_reached(source, &reached);
    filtered.external_documents = source
        .external_documents
        .iter()
        .filter(|(location, _)| {
            reached
                .iter()
                .any(|key| key.location.as_deref() == Some(location.as_str()))
        })
        .map(|(location, document)| (location.clone(), document.clone()))
        .collect();

    let used_tags: HashSet<&str> = filtered
        .paths
        .values()
        .chain(filtered.webhooks.values().filter_map(RefOr::item))
        .flat_map(|item| item.operations.values())
        .flat_map(|operation| operation.tags.iter().map(String::as_str))
        .collect();
    filtered.tags = source
        .tags
        .iter()
        .filter(|tag| used_tags.contains(tag.name.as_str()))
        .cloned()
        .collect();

    let operations: usize = filtered
        .paths
        .values()
        .chain(filtered.webhooks.values().filter_map(RefOr::item))
        .map(|item| item.operations.len())
        .sum();
    info!(
        "Filtered document keeps {} operations and {} components",
        operations,
        filtered.components.len()
    );
    filtered
}

fn filter_path_item(name: &str, item: &PathItem, predicate: &Predicate) -> Option<PathItem> {
    let operations: IndexMap<OperationType, Operation> = item
        .operations
        .iter()
        .filter(|(method, operation)| predicate(name, **method, operation))
        .map(|(method, operation)| (*method, operation.clone()))
        .collect();
    if operations.is_empty() {
        return None;
    }
    Some(PathItem {
        summary: item.summary.clone(),
        description: item.description.clone(),
        operations,
        servers: item.servers.clone(),
        parameters: item.parameters.clone(),
        extensions: item.extensions.clone(),
    })
}

/// Local path-item references are materialised so the kept entry holds only the
/// kept operations. External ones are kept as written.
fn filter_webhook(
    source: &Document,
    name: &str,
    entry: &RefOr<PathItem>,
    predicate: &Predicate,
) -> Option<RefOr<PathItem>> {
    match entry {
        RefOr::Item(item) => filter_path_item(name, item, predicate).map(RefOr::Item),
        RefOr::Ref(reference) if reference.is_external() => {
            let document = source.document_for(source, reference.location())?;
            let item = local_path_item(document, reference.id())?;
            item.operations
                .iter()
                .any(|(method, operation)| predicate(name, *method, operation))
                .then(|| entry.clone())
        }
        RefOr::Ref(reference) => {
            let item = local_path_item(source, reference.id())?;
            filter_path_item(name, item, predicate).map(RefOr::Item)
        }
    }
}

fn local_path_item<'a>(document: &'a Document, id: &str) -> Option<&'a PathItem> {
    let mut current = document.components.path_items.get(id)?;
    let mut seen = HashSet::new();
    loop {
        match current {
            RefOr::Item(item) => return Some(item),
            RefOr::Ref(reference) if !reference.is_external() && seen.insert(reference.id()) => {
                current = document.components.path_items.get(reference.id())?;
            }
            RefOr::Ref(_) => return None,
        }
    }
}

/// Collects the identity of every component reached from the kept entries.
#[derive(Default)]
struct ClosureVisitor {
    reached: IndexSet<ComponentKey>,
}

impl<'a> Visitor<'a> for ClosureVisitor {
    fn enter(&mut self, node: Node<'a>, ctx: &WalkContext<'_>) {
        match node {
            Node::Reference(reference) => {
                self.reached.insert(ctx.key_for(reference));
            }
            Node::SecurityRequirement(requirement) => {
                let location = ctx.document().base_uri.clone();
                for scheme in requirement.schemes() {
                    self.reached.insert(ComponentKey::new(
                        location.clone(),
                        ComponentKind::SecurityScheme,
                        scheme,
                    ));
                }
            }
            _ => {}
        }
    }
}

fn closure(source: &Document, filtered: &Document) -> IndexSet<ComponentKey> {
    let mut visitor = ClosureVisitor::default();
    {
        let mut walker = Walker::new(source, &mut visitor);
        for (path, item) in &filtered.paths {
            walker.walk_path_item(path, item);
        }
        for (name, entry) in &filtered.webhooks {
            walker.walk_webhook(name, entry);
        }
        for requirement in &filtered.security {
            walker.walk_security_requirement(requirement);
        }
    }
    let mut reached = visitor.reached;

    // Security schemes are named, not referenced, so aliases among them are
    // followed here rather than by the walk.
    let mut pending: Vec<ComponentKey> = reached
        .iter()
        .filter(|key| key.kind == ComponentKind::SecurityScheme)
        .cloned()
        .collect();
    while let Some(key) = pending.pop() {
        let Some(document) = owning_document(source, key.location.as_deref()) else {
            continue;
        };
        let alias = document
            .components
            .security_schemes
            .get(&key.id)
            .and_then(RefOr::reference);
        if let Some(alias) = alias {
            let next = ComponentKey::of(alias, document);
            if reached.insert(next.clone()) {
                pending.push(next);
            }
        }
    }
    reached
}

fn owning_document<'a>(source: &'a Document, location: Option<&str>) -> Option<&'a Document> {
    if location == source.base_uri.as_deref() {
        return Some(source);
    }
    source.external_documents.get(location?)
}

/// Root-document entries in `reached`, in source order.
fn copy_reached(source: &Document, reached: &IndexSet<ComponentKey>) -> Components {
    let mut components = Components {
        extensions: source.components.extensions.clone(),
        ..Components::default()
    };
    for (kind, id, _) in source.components.iter() {
        let key = ComponentKey::new(source.base_uri.clone(), kind, id);
        if reached.contains(&key) {
            components.copy_from(&source.components, kind, id);
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_normalize_across_template_styles() {
        assert_eq!(normalize_path("/pets/{petId}/"), "/pets/{}");
        assert_eq!(normalize_path("pets/:id"), "/pets/{}");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn request_paths_drop_the_server() {
        let servers = vec![Server::new("https://api.example.com/v1")];
        assert_eq!(
            request_path("https://api.example.com/v1/pets?limit=3", &servers),
            "/pets"
        );
        assert_eq!(request_path("https://other.example.com/x/pets", &servers), "/x/pets");
        assert_eq!(request_path("{{baseUrl}}/pets/:id", &[]), "/pets/:id");
    }

    #[test]
    fn lists_are_comma_separated() {
        let criteria = FilterCriteria::default().operation_ids(" listPets, ,getPet ");
        assert_eq!(criteria.operation_ids, vec!["listPets", "getPet"]);
    }

    #[test]
    fn selector_groups_are_exclusive() {
        let source = Document::new();
        let both = FilterCriteria::default().operation_ids("a").tags("b");
        let err = create_predicate(&both, &source).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Filter configuration error: Cannot specify both operationIds and tags at the same time."
        );
        let none = create_predicate(&FilterCriteria::default(), &source).err().unwrap();
        assert!(matches!(none, DomError::FilterConfiguration(_)));
    }

    #[test]
    fn bad_tag_pattern_is_a_configuration_error() {
        let err = create_predicate(&FilterCriteria::default().tags("pets("), &Document::new())
            .err()
            .unwrap();
        assert!(matches!(err, DomError::FilterConfiguration(_)));
    }
}
