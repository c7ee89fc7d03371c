use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Kinds of reusable component a reference can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Schema,
    Response,
    Parameter,
    RequestBody,
    Header,
    SecurityScheme,
    PathItem,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Schema,
        ComponentKind::Response,
        ComponentKind::Parameter,
        ComponentKind::RequestBody,
        ComponentKind::Header,
        ComponentKind::SecurityScheme,
        ComponentKind::PathItem,
    ];

    /// Section name under `components` in 3.x documents.
    pub fn section(&self) -> &'static str {
        match self {
            ComponentKind::Schema => "schemas",
            ComponentKind::Response => "responses",
            ComponentKind::Parameter => "parameters",
            ComponentKind::RequestBody => "requestBodies",
            ComponentKind::Header => "headers",
            ComponentKind::SecurityScheme => "securitySchemes",
            ComponentKind::PathItem => "pathItems",
        }
    }

    pub fn from_section(section: &str) -> Option<Self> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.section() == section)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// Non-owning relation to an entry in some document's components.
///
/// `location` is kept exactly as written in the source pointer and is relative to
/// the document the reference appears in; `None` means that same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    kind: ComponentKind,
    id: String,
    location: Option<String>,
}

impl ComponentHandle {
    pub(crate) fn new(kind: ComponentKind, id: impl Into<String>, location: Option<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            location,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_local(&self) -> bool {
        self.location.is_none()
    }
}

/// A symbolic pointer to a component, before or after resolution.
///
/// Resolution turns `Unresolved` into `Resolved` exactly once; there is no way back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Unresolved {
        kind: ComponentKind,
        /// Empty when the pointer names a whole resource (a schema `$id` URI).
        id: String,
        location: Option<String>,
    },
    Resolved(ComponentHandle),
}

impl Reference {
    /// A reference into the components of the document it appears in.
    pub fn local(kind: ComponentKind, id: impl Into<String>) -> Self {
        Reference::Unresolved {
            kind,
            id: id.into(),
            location: None,
        }
    }

    /// A reference into the components of another document.
    pub fn external(kind: ComponentKind, id: impl Into<String>, location: impl Into<String>) -> Self {
        Reference::Unresolved {
            kind,
            id: id.into(),
            location: Some(location.into()),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Reference::Unresolved { kind, .. } => *kind,
            Reference::Resolved(handle) => handle.kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Reference::Unresolved { id, .. } => id,
            Reference::Resolved(handle) => &handle.id,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Reference::Unresolved { location, .. } => location.as_deref(),
            Reference::Resolved(handle) => handle.location(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    pub fn is_external(&self) -> bool {
        self.location().is_some()
    }

    pub fn handle(&self) -> Option<&ComponentHandle> {
        match self {
            Reference::Resolved(handle) => Some(handle),
            Reference::Unresolved { .. } => None,
        }
    }

    /// Records the identity relation found by the resolver. A no-op on an already
    /// resolved reference.
    pub(crate) fn resolve_to(&mut self, handle: ComponentHandle) {
        if let Reference::Unresolved { kind, .. } = self {
            debug_assert_eq!(*kind, handle.kind);
            *self = Reference::Resolved(handle);
        }
    }
}

/// A position that holds either an inline node or a reference to a component.
#[derive(Debug, Clone, PartialEq)]
pub enum RefOr<T> {
    Ref(Reference),
    Item(T),
}

impl<T> RefOr<T> {
    pub fn item(&self) -> Option<&T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref(_) => None,
        }
    }

    pub fn item_mut(&mut self) -> Option<&mut T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref(_) => None,
        }
    }

    pub fn reference(&self) -> Option<&Reference> {
        match self {
            RefOr::Ref(reference) => Some(reference),
            RefOr::Item(_) => None,
        }
    }
}

impl<T> From<T> for RefOr<T> {
    fn from(item: T) -> Self {
        RefOr::Item(item)
    }
}

/// A `$ref` string split into the resource location and the decoded fragment segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    pub location: Option<String>,
    pub segments: Vec<String>,
}

impl Pointer {
    pub fn parse(raw: &str) -> Self {
        let (location, fragment) = match raw.split_once('#') {
            Some((location, fragment)) => (location, fragment),
            None => (raw, ""),
        };
        let location = (!location.is_empty()).then(|| location.to_string());
        let segments = fragment
            .split('/')
            .skip(1)
            .map(unescape_segment)
            .collect();
        Self { location, segments }
    }
}

fn unescape_segment(segment: &str) -> String {
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    decoded.replace("~1", "/").replace("~0", "~")
}

/// Escapes a component id for use as a JSON-pointer segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Resolves `reference` against the location of the document it appears in.
///
/// URLs are joined with URL semantics; anything else is treated as a filesystem
/// path relative to the directory of `base`.
pub fn resolve_location(base: Option<&str>, reference: &str) -> String {
    if let Ok(url) = Url::parse(reference) {
        if url.scheme().len() > 1 {
            return url.to_string();
        }
    }
    let Some(base) = base else {
        return normalize_path(Path::new(reference));
    };
    if let Ok(base_url) = Url::parse(base) {
        if base_url.scheme().len() > 1 {
            return base_url
                .join(reference)
                .map(|joined| joined.to_string())
                .unwrap_or_else(|_| reference.to_string());
        }
    }
    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&parent.join(reference))
}

fn normalize_path(path: &Path) -> String {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_parses_local_and_external_forms() {
        let local = Pointer::parse("#/components/schemas/Pet");
        assert_eq!(local.location, None);
        assert_eq!(local.segments, vec!["components", "schemas", "Pet"]);

        let external = Pointer::parse("common.yaml#/definitions/Error");
        assert_eq!(external.location.as_deref(), Some("common.yaml"));
        assert_eq!(external.segments, vec!["definitions", "Error"]);

        let whole = Pointer::parse("https://example.com/schemas/resource.json");
        assert_eq!(
            whole.location.as_deref(),
            Some("https://example.com/schemas/resource.json")
        );
        assert!(whole.segments.is_empty());
    }

    #[test]
    fn pointer_unescapes_segments() {
        let pointer = Pointer::parse("#/components/schemas/a~1b~0c%20d");
        assert_eq!(pointer.segments[2], "a/b~c d");
        assert_eq!(escape_segment("a/b~c"), "a~1b~0c");
    }

    #[test]
    fn locations_resolve_against_paths_and_urls() {
        assert_eq!(
            resolve_location(Some("specs/api/openapi.yaml"), "../common/pet.yaml"),
            "specs/common/pet.yaml"
        );
        assert_eq!(
            resolve_location(Some("https://example.com/api/openapi.yaml"), "pet.yaml"),
            "https://example.com/api/pet.yaml"
        );
        assert_eq!(
            resolve_location(Some("specs/openapi.yaml"), "https://example.com/pet.yaml"),
            "https://example.com/pet.yaml"
        );
        assert_eq!(resolve_location(None, "./pet.yaml"), "pet.yaml");
    }

    #[test]
    fn resolution_only_moves_forward() {
        let mut reference = Reference::local(ComponentKind::Schema, "Pet");
        assert!(!reference.is_resolved());
        reference.resolve_to(ComponentHandle::new(ComponentKind::Schema, "Pet", None));
        assert!(reference.is_resolved());
        assert_eq!(reference.id(), "Pet");
        assert_eq!(reference.kind(), ComponentKind::Schema);
    }
}
