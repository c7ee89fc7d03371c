//! Canonical, dialect-independent node graph.
//!
//! Nodes carry data only. Reading, resolving, walking and writing live in their
//! own modules so a new wire dialect never touches these types.

pub mod components;
pub mod document;
pub mod operation;
pub mod reference;
pub mod schema;
pub mod security;

pub use components::{Component, ComponentRef, Components};
pub use document::{
    Contact, Document, Extensions, ExternalDocs, Info, License, Server, ServerVariable, Tag,
};
pub use operation::{
    Header, MediaType, Operation, OperationType, Parameter, ParameterLocation, ParameterStyle,
    PathItem, RequestBody, Response,
};
pub use reference::{
    escape_segment, resolve_location, ComponentHandle, ComponentKind, Pointer, RefOr, Reference,
};
pub use schema::{AdditionalProperties, Discriminator, Schema};
pub use security::{OAuthFlow, OAuthFlows, SecurityRequirement, SecurityScheme, SecuritySchemeType};
