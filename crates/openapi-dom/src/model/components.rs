use super::document::Extensions;
use super::operation::{Header, Parameter, PathItem, RequestBody, Response};
use super::reference::{ComponentKind, RefOr, Reference};
use super::schema::Schema;
use super::security::SecurityScheme;
use indexmap::IndexMap;

/// Reusable components, keyed by kind and then by local id.
///
/// Entries are themselves [`RefOr`] so a component may simply alias another one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    pub schemas: IndexMap<String, RefOr<Schema>>,
    pub responses: IndexMap<String, RefOr<Response>>,
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
    pub headers: IndexMap<String, RefOr<Header>>,
    pub security_schemes: IndexMap<String, RefOr<SecurityScheme>>,
    /// 3.1 only.
    pub path_items: IndexMap<String, RefOr<PathItem>>,
    pub extensions: Extensions,
}

/// A borrowed component entry of any kind.
#[derive(Debug, Clone, Copy)]
pub enum ComponentRef<'a> {
    Schema(&'a RefOr<Schema>),
    Response(&'a RefOr<Response>),
    Parameter(&'a RefOr<Parameter>),
    RequestBody(&'a RefOr<RequestBody>),
    Header(&'a RefOr<Header>),
    SecurityScheme(&'a RefOr<SecurityScheme>),
    PathItem(&'a RefOr<PathItem>),
}

impl<'a> ComponentRef<'a> {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentRef::Schema(_) => ComponentKind::Schema,
            ComponentRef::Response(_) => ComponentKind::Response,
            ComponentRef::Parameter(_) => ComponentKind::Parameter,
            ComponentRef::RequestBody(_) => ComponentKind::RequestBody,
            ComponentRef::Header(_) => ComponentKind::Header,
            ComponentRef::SecurityScheme(_) => ComponentKind::SecurityScheme,
            ComponentRef::PathItem(_) => ComponentKind::PathItem,
        }
    }

    /// The reference held by an aliasing entry.
    pub fn reference(&self) -> Option<&'a Reference> {
        match *self {
            ComponentRef::Schema(entry) => entry.reference(),
            ComponentRef::Response(entry) => entry.reference(),
            ComponentRef::Parameter(entry) => entry.reference(),
            ComponentRef::RequestBody(entry) => entry.reference(),
            ComponentRef::Header(entry) => entry.reference(),
            ComponentRef::SecurityScheme(entry) => entry.reference(),
            ComponentRef::PathItem(entry) => entry.reference(),
        }
    }
}

/// Node types that can live in [`Components`].
pub trait Component: Sized {
    const KIND: ComponentKind;

    fn entries(components: &Components) -> &IndexMap<String, RefOr<Self>>;

    fn entries_mut(components: &mut Components) -> &mut IndexMap<String, RefOr<Self>>;
}

macro_rules! component {
    ($node:ty, $kind:ident, $field:ident) => {
        impl Component for $node {
            const KIND: ComponentKind = ComponentKind::$kind;

            fn entries(components: &Components) -> &IndexMap<String, RefOr<Self>> {
                &components.$field
            }

            fn entries_mut(components: &mut Components) -> &mut IndexMap<String, RefOr<Self>> {
                &mut components.$field
            }
        }
    };
}

component!(Schema, Schema, schemas);
component!(Response, Response, responses);
component!(Parameter, Parameter, parameters);
component!(RequestBody, RequestBody, request_bodies);
component!(Header, Header, headers);
component!(SecurityScheme, SecurityScheme, security_schemes);
component!(PathItem, PathItem, path_items);

impl Components {
    pub fn get(&self, kind: ComponentKind, id: &str) -> Option<ComponentRef<'_>> {
        match kind {
            ComponentKind::Schema => self.schemas.get(id).map(ComponentRef::Schema),
            ComponentKind::Response => self.responses.get(id).map(ComponentRef::Response),
            ComponentKind::Parameter => self.parameters.get(id).map(ComponentRef::Parameter),
            ComponentKind::RequestBody => self.request_bodies.get(id).map(ComponentRef::RequestBody),
            ComponentKind::Header => self.headers.get(id).map(ComponentRef::Header),
            ComponentKind::SecurityScheme => {
                self.security_schemes.get(id).map(ComponentRef::SecurityScheme)
            }
            ComponentKind::PathItem => self.path_items.get(id).map(ComponentRef::PathItem),
        }
    }

    /// Typed lookup.
    pub fn entry<T: Component>(&self, id: &str) -> Option<&RefOr<T>> {
        T::entries(self).get(id)
    }

    pub fn contains(&self, kind: ComponentKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Ids of one kind, in document order.
    pub fn ids(&self, kind: ComponentKind) -> Vec<&str> {
        fn keys<T>(map: &IndexMap<String, T>) -> Vec<&str> {
            map.keys().map(String::as_str).collect()
        }
        match kind {
            ComponentKind::Schema => keys(&self.schemas),
            ComponentKind::Response => keys(&self.responses),
            ComponentKind::Parameter => keys(&self.parameters),
            ComponentKind::RequestBody => keys(&self.request_bodies),
            ComponentKind::Header => keys(&self.headers),
            ComponentKind::SecurityScheme => keys(&self.security_schemes),
            ComponentKind::PathItem => keys(&self.path_items),
        }
    }

    /// Every entry as `(kind, id, entry)`, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, &str, ComponentRef<'_>)> {
        ComponentKind::ALL.into_iter().flat_map(move |kind| {
            self.ids(kind)
                .into_iter()
                .filter_map(move |id| self.get(kind, id).map(|entry| (kind, id, entry)))
        })
    }

    pub fn len(&self) -> usize {
        ComponentKind::ALL
            .into_iter()
            .map(|kind| self.ids(kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.extensions.is_empty()
    }

    /// Copies one entry from `source`, keeping its position relative to other copied entries.
    pub fn copy_from(&mut self, source: &Components, kind: ComponentKind, id: &str) -> bool {
        fn copy<T: Component + Clone>(target: &mut Components, source: &Components, id: &str) -> bool {
            match T::entries(source).get(id) {
                Some(entry) => {
                    T::entries_mut(target).insert(id.to_string(), entry.clone());
                    true
                }
                None => false,
            }
        }
        match kind {
            ComponentKind::Schema => copy::<Schema>(self, source, id),
            ComponentKind::Response => copy::<Response>(self, source, id),
            ComponentKind::Parameter => copy::<Parameter>(self, source, id),
            ComponentKind::RequestBody => copy::<RequestBody>(self, source, id),
            ComponentKind::Header => copy::<Header>(self, source, id),
            ComponentKind::SecurityScheme => copy::<SecurityScheme>(self, source, id),
            ComponentKind::PathItem => copy::<PathItem>(self, source, id),
        }
    }
}
