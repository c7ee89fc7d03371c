//! Upgrades a 2.0 document into the canonical model.
//!
//! Body and form parameters become request bodies, `consumes`/`produces` become
//! media-type maps, `host`/`basePath`/`schemes` become servers, and primitive
//! parameter fields become a schema.

use super::common::{
    boolean, document_metadata, entries, extensions, external_docs, list, object,
    parse_reference, ref_or, schema, schema_entry, security_requirement, string, string_list,
    Object,
};
use super::context::ParseContext;
use super::v3::oauth_flow;
use crate::model::{
    Components, ComponentKind, Document, Header, MediaType, OAuthFlows, Operation, OperationType,
    Parameter, ParameterLocation, ParameterStyle, PathItem, RefOr, Reference, RequestBody,
    Response, Schema, SecurityScheme, SecuritySchemeType, Server,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Fields of a 2.0 parameter, header or items object that describe its schema.
const SCHEMA_FIELDS: [&str; 17] = [
    "type",
    "format",
    "items",
    "default",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "enum",
    "multipleOf",
    "x-nullable",
];

pub(crate) fn is_form_media_type(media_type: &str) -> bool {
    media_type == FORM_URLENCODED || media_type == MULTIPART
}

pub(crate) fn read_document(root: &Object, ctx: &mut ParseContext<'_>) -> Document {
    let mut document = Document::new();
    document_metadata(root, &mut document, ctx);
    document.servers = servers(root);
    ctx.consumes = string_list(root, "consumes");
    ctx.produces = string_list(root, "produces");

    if let Some(parameters) = root.get("parameters").and_then(Value::as_object) {
        for (name, value) in parameters {
            match value.get("in").and_then(Value::as_str) {
                Some("body") => {
                    ctx.body_parameters.insert(name.clone());
                }
                Some("formData") => {
                    ctx.form_parameters.insert(name.clone(), value.clone());
                }
                _ => {}
            }
        }
    }

    match root.get("paths") {
        Some(_) => document.paths = entries(root, "paths", ctx, |_, value, ctx| path_item(value, ctx)),
        None => ctx.error("paths is required"),
    }
    document.components = components(root, ctx);
    document
}

fn servers(root: &Object) -> Vec<Server> {
    let host = string(root, "host").map(|host| {
        host.trim_start_matches("//").trim_end_matches('/').to_string()
    });
    let base = string(root, "basePath").unwrap_or_default();
    let base = match base.trim_end_matches('/') {
        "" => String::new(),
        trimmed if trimmed.starts_with('/') => trimmed.to_string(),
        trimmed => format!("/{}", trimmed),
    };
    let schemes = string_list(root, "schemes");

    match host {
        None if base.is_empty() => Vec::new(),
        None => vec![Server::new(base)],
        Some(host) if schemes.is_empty() => vec![Server::new(format!("//{}{}", host, base))],
        Some(host) => schemes
            .iter()
            .map(|scheme| Server::new(format!("{}://{}{}", scheme, host, base)))
            .collect(),
    }
}

fn components(root: &Object, ctx: &mut ParseContext<'_>) -> Components {
    let consumes = ctx.consumes.clone();
    let produces = ctx.produces.clone();
    Components {
        schemas: entries(root, "definitions", ctx, |_, value, ctx| schema_entry(value, ctx)),
        parameters: entries(root, "parameters", ctx, |_, value, ctx| {
            match value.get("in").and_then(Value::as_str) {
                Some("body") | Some("formData") => None,
                _ => ref_or(value, ComponentKind::Parameter, ctx, parameter),
            }
        }),
        request_bodies: entries(root, "parameters", ctx, |_, value, ctx| {
            match value.get("in").and_then(Value::as_str) {
                Some("body") => ref_or(value, ComponentKind::RequestBody, ctx, |map, ctx| {
                    Some(body(map, &consumes, ctx))
                }),
                _ => None,
            }
        }),
        responses: entries(root, "responses", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Response, ctx, |map, ctx| {
                Some(response(map, &produces, ctx))
            })
        }),
        security_schemes: entries(root, "securityDefinitions", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::SecurityScheme, ctx, security_scheme)
        }),
        ..Default::default()
    }
}

/// Parameters split by where they end up in the canonical model.
#[derive(Default, Clone)]
struct ParameterSet {
    parameters: Vec<RefOr<Parameter>>,
    body: Option<RefOr<RequestBody>>,
    form: Vec<Object>,
}

fn parameter_set(map: &Object, consumes: &[String], ctx: &mut ParseContext<'_>) -> ParameterSet {
    let mut set = ParameterSet::default();
    let Some(values) = map.get("parameters") else {
        return set;
    };
    let Some(values) = values.as_array() else {
        ctx.at("parameters", |ctx| ctx.error("parameters must be an array"));
        return set;
    };

    ctx.at("parameters", |ctx| {
        for (index, value) in values.iter().enumerate() {
            ctx.at(&index.to_string(), |ctx| {
                let Some(param) = object(value, ctx, "parameter") else {
                    return;
                };
                if let Some(raw_ref) = param.get("$ref").and_then(Value::as_str) {
                    let reference = parse_reference(raw_ref, ComponentKind::Parameter, ctx);
                    let local = reference.location().is_none();
                    let id = reference.id().to_string();
                    if local && ctx.body_parameters.contains(&id) {
                        set.body = Some(RefOr::Ref(Reference::local(ComponentKind::RequestBody, id)));
                    } else if let Some(form) = ctx.form_parameters.get(&id).filter(|_| local) {
                        if let Some(form) = form.as_object() {
                            set.form.push(form.clone());
                        }
                    } else {
                        set.parameters.push(RefOr::Ref(reference));
                    }
                    return;
                }
                match param.get("in").and_then(Value::as_str) {
                    Some("body") => set.body = Some(RefOr::Item(body(param, consumes, ctx))),
                    Some("formData") => set.form.push(param.clone()),
                    _ => {
                        if let Some(parameter) = parameter(param, ctx) {
                            set.parameters.push(RefOr::Item(parameter));
                        }
                    }
                }
            });
        }
    });
    set
}

fn path_item(value: &Value, ctx: &mut ParseContext<'_>) -> Option<PathItem> {
    let map = object(value, ctx, "path item")?;
    if map.contains_key("$ref") {
        ctx.warning("path item references under paths are not supported and were skipped");
        return None;
    }
    let consumes = ctx.consumes.clone();
    let shared = parameter_set(map, &consumes, ctx);
    let mut item = PathItem {
        parameters: shared.parameters.clone(),
        extensions: extensions(map),
        ..Default::default()
    };
    for method in OperationType::ALL {
        if method == OperationType::Trace {
            continue;
        }
        if let Some(value) = map.get(method.as_str()) {
            let operation = ctx.at(method.as_str(), |ctx| {
                object(value, ctx, "operation").map(|map| operation(map, &shared, ctx))
            });
            if let Some(operation) = operation {
                item.operations.insert(method, operation);
            }
        }
    }
    Some(item)
}

fn operation(map: &Object, shared: &ParameterSet, ctx: &mut ParseContext<'_>) -> Operation {
    let consumes = match string_list(map, "consumes") {
        own if !own.is_empty() => own,
        _ => ctx.consumes.clone(),
    };
    let produces = match string_list(map, "produces") {
        own if !own.is_empty() => own,
        _ => ctx.produces.clone(),
    };
    let set = parameter_set(map, &consumes, ctx);
    let form: Vec<Object> = shared.form.iter().chain(set.form.iter()).cloned().collect();
    let request_body = match set.body.or_else(|| shared.body.clone()) {
        Some(body) => Some(body),
        None if !form.is_empty() => Some(RefOr::Item(form_body(&form, &consumes, ctx))),
        None => None,
    };

    Operation {
        tags: string_list(map, "tags"),
        summary: string(map, "summary"),
        description: string(map, "description"),
        external_docs: map.get("externalDocs").and_then(Value::as_object).map(external_docs),
        operation_id: string(map, "operationId"),
        parameters: set.parameters,
        request_body,
        responses: entries(map, "responses", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Response, ctx, |map, ctx| {
                Some(response(map, &produces, ctx))
            })
        }),
        deprecated: boolean(map, "deprecated"),
        security: map
            .contains_key("security")
            .then(|| list(map, "security", ctx, security_requirement)),
        servers: Vec::new(),
        extensions: extensions(map),
    }
}

/// The schema spelled by primitive fields (`type`, `format`, `items`, ...).
fn primitive_schema(map: &Object, ctx: &mut ParseContext<'_>) -> Option<Schema> {
    let fields: Map<String, Value> = SCHEMA_FIELDS
        .iter()
        .filter_map(|key| map.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect();
    (!fields.is_empty()).then(|| schema(&fields, ctx))
}

fn collection_format(map: &Object, location: Option<ParameterLocation>) -> (Option<ParameterStyle>, Option<bool>) {
    match string(map, "collectionFormat").as_deref() {
        Some("csv") => match location {
            Some(ParameterLocation::Path) | Some(ParameterLocation::Header) => {
                (Some(ParameterStyle::Simple), None)
            }
            _ => (Some(ParameterStyle::Form), Some(false)),
        },
        Some("multi") => (Some(ParameterStyle::Form), Some(true)),
        Some("ssv") => (Some(ParameterStyle::SpaceDelimited), None),
        Some("pipes") => (Some(ParameterStyle::PipeDelimited), None),
        _ => (None, None),
    }
}

fn parameter(map: &Object, ctx: &mut ParseContext<'_>) -> Option<Parameter> {
    let location = match string(map, "in") {
        Some(raw) => match ParameterLocation::parse(&raw) {
            Some(location) => Some(location),
            None => {
                ctx.error(format!("unknown parameter location '{}'", raw));
                return None;
            }
        },
        None => {
            ctx.error("parameter location 'in' is required");
            None
        }
    };
    let (style, explode) = collection_format(map, location);
    let mut extensions = extensions(map);
    extensions.shift_remove("x-nullable");
    Some(Parameter {
        name: string(map, "name").unwrap_or_else(|| {
            ctx.error("parameter name is required");
            String::new()
        }),
        location,
        description: string(map, "description"),
        required: boolean(map, "required"),
        allow_empty_value: boolean(map, "allowEmptyValue"),
        style,
        explode,
        schema: primitive_schema(map, ctx).map(RefOr::Item),
        extensions,
        ..Default::default()
    })
}

fn media_types(types: &[String], fallback: &str, schema: Option<RefOr<Schema>>) -> IndexMap<String, MediaType> {
    let fallback = [fallback.to_string()];
    let types = if types.is_empty() { &fallback[..] } else { types };
    types
        .iter()
        .map(|media_type| {
            (
                media_type.clone(),
                MediaType {
                    schema: schema.clone(),
                    ..Default::default()
                },
            )
        })
        .collect()
}

fn body(map: &Object, consumes: &[String], ctx: &mut ParseContext<'_>) -> RequestBody {
    let schema = map
        .get("schema")
        .and_then(|value| ctx.at("schema", |ctx| schema_entry(value, ctx)));
    let mut extensions = extensions(map);
    if let Some(name) = string(map, "name") {
        extensions.insert("x-bodyName".to_string(), Value::String(name));
    }
    let types: Vec<String> = consumes
        .iter()
        .filter(|media_type| !is_form_media_type(media_type))
        .cloned()
        .collect();
    RequestBody {
        description: string(map, "description"),
        content: media_types(&types, DEFAULT_MEDIA_TYPE, schema),
        required: boolean(map, "required"),
        extensions,
    }
}

fn form_body(parameters: &[Object], consumes: &[String], ctx: &mut ParseContext<'_>) -> RequestBody {
    let mut form = Schema::of_type("object");
    for map in parameters {
        let name = string(map, "name").unwrap_or_default();
        let mut property = primitive_schema(map, ctx).unwrap_or_default();
        property.description = string(map, "description");
        if boolean(map, "required") {
            form.required.insert(name.clone());
        }
        form.properties.insert(name, RefOr::Item(property));
    }
    let types: Vec<String> = consumes
        .iter()
        .filter(|media_type| is_form_media_type(media_type))
        .cloned()
        .collect();
    RequestBody {
        required: !form.required.is_empty(),
        content: media_types(&types, FORM_URLENCODED, Some(RefOr::Item(form))),
        ..Default::default()
    }
}

fn response(map: &Object, produces: &[String], ctx: &mut ParseContext<'_>) -> Response {
    let schema = map
        .get("schema")
        .and_then(|value| ctx.at("schema", |ctx| schema_entry(value, ctx)));
    let mut content = match schema {
        Some(schema) => media_types(produces, DEFAULT_MEDIA_TYPE, Some(schema)),
        None => IndexMap::new(),
    };
    if let Some(examples) = map.get("examples").and_then(Value::as_object) {
        for (media_type, example) in examples {
            content
                .entry(media_type.clone())
                .or_default()
                .example = Some(example.clone());
        }
    }
    Response {
        description: string(map, "description"),
        headers: entries(map, "headers", ctx, |_, value, ctx| {
            object(value, ctx, "header").map(|header_map| RefOr::Item(header(header_map, ctx)))
        }),
        content,
        extensions: extensions(map),
    }
}

fn header(map: &Object, ctx: &mut ParseContext<'_>) -> Header {
    let (style, explode) = collection_format(map, Some(ParameterLocation::Header));
    let mut extensions = extensions(map);
    extensions.shift_remove("x-nullable");
    Header {
        description: string(map, "description"),
        style,
        explode,
        schema: primitive_schema(map, ctx).map(RefOr::Item),
        extensions,
        ..Default::default()
    }
}

fn security_scheme(map: &Object, ctx: &mut ParseContext<'_>) -> Option<SecurityScheme> {
    let raw = string(map, "type").unwrap_or_default();
    let mut scheme = match raw.as_str() {
        "basic" => {
            let mut scheme = SecurityScheme::new(SecuritySchemeType::Http);
            scheme.scheme = Some("basic".to_string());
            scheme
        }
        "apiKey" => {
            let mut scheme = SecurityScheme::new(SecuritySchemeType::ApiKey);
            scheme.name = string(map, "name");
            scheme.location = string(map, "in");
            scheme
        }
        "oauth2" => {
            let mut scheme = SecurityScheme::new(SecuritySchemeType::OAuth2);
            let mut flow = oauth_flow(map);
            flow.extensions.clear();
            let mut flows = OAuthFlows::default();
            match string(map, "flow").as_deref() {
                Some("implicit") => flows.implicit = Some(flow),
                Some("password") => flows.password = Some(flow),
                Some("application") => flows.client_credentials = Some(flow),
                Some("accessCode") => flows.authorization_code = Some(flow),
                other => ctx.error(format!("unknown oauth2 flow '{}'", other.unwrap_or_default())),
            }
            scheme.flows = Some(flows);
            scheme
        }
        _ => {
            ctx.error(format!("unknown security scheme type '{}'", raw));
            return None;
        }
    };
    scheme.description = string(map, "description");
    scheme.extensions = extensions(map);
    Some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::format::SpecVersion;
    use serde_json::json;

    fn read(value: Value) -> (Document, Diagnostic) {
        let mut diagnostic = Diagnostic::new();
        let document = {
            let mut ctx = ParseContext::new(SpecVersion::V2_0, &mut diagnostic, "");
            read_document(value.as_object().unwrap(), &mut ctx)
        };
        (document, diagnostic)
    }

    #[test]
    fn host_base_path_and_schemes_become_servers() {
        let (document, _) = read(json!({
            "swagger": "2.0", "info": {"title": "t", "version": "1"}, "paths": {},
            "host": "api.example.com", "basePath": "/v1", "schemes": ["https", "http"]
        }));
        let urls: Vec<_> = document.servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://api.example.com/v1", "http://api.example.com/v1"]);

        let (relative, _) = read(json!({
            "swagger": "2.0", "info": {}, "paths": {}, "host": "//example.org", "basePath": "/"
        }));
        assert_eq!(relative.servers[0].url, "//example.org");
    }

    #[test]
    fn body_and_form_parameters_become_request_bodies() {
        let (document, diagnostic) = read(json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "consumes": ["application/json"],
            "paths": {
                "/pets": {
                    "post": {
                        "parameters": [
                            {"in": "body", "name": "pet", "required": true, "schema": {"$ref": "#/definitions/Pet"}},
                            {"in": "query", "name": "tags", "type": "array", "items": {"type": "string"}, "collectionFormat": "multi"}
                        ],
                        "responses": {"200": {"description": "ok", "schema": {"type": "file"}}}
                    },
                    "put": {
                        "consumes": ["multipart/form-data"],
                        "parameters": [
                            {"in": "formData", "name": "file", "type": "file", "required": true},
                            {"in": "formData", "name": "note", "type": "string", "description": "free text"}
                        ],
                        "responses": {}
                    }
                }
            },
            "definitions": {"Pet": {"type": "object"}}
        }));
        assert!(!diagnostic.has_errors());
        let item = &document.paths["/pets"];

        let post = &item.operations[&OperationType::Post];
        let body = post.request_body.as_ref().unwrap().item().unwrap();
        assert!(body.required);
        assert_eq!(body.extensions["x-bodyName"], json!("pet"));
        let schema = body.content["application/json"].schema.as_ref().unwrap();
        assert_eq!(schema.reference().unwrap().id(), "Pet");
        let tags = post.parameters[0].item().unwrap();
        assert_eq!(tags.style, Some(ParameterStyle::Form));
        assert_eq!(tags.explode, Some(true));
        let file = post.responses["200"].item().unwrap().content["application/json"]
            .schema
            .as_ref()
            .unwrap()
            .item()
            .unwrap();
        assert!(file.is_binary());

        let put = &item.operations[&OperationType::Put];
        let form = put.request_body.as_ref().unwrap().item().unwrap();
        let schema = form.content["multipart/form-data"].schema.as_ref().unwrap().item().unwrap();
        assert!(schema.properties["file"].item().unwrap().is_binary());
        assert_eq!(
            schema.properties["note"].item().unwrap().description.as_deref(),
            Some("free text")
        );
        assert!(schema.required.contains("file"));
    }

    #[test]
    fn body_parameter_references_become_request_body_references() {
        let (document, _) = read(json!({
            "swagger": "2.0",
            "info": {"title": "t", "version": "1"},
            "parameters": {
                "PetBody": {"in": "body", "name": "pet", "schema": {"type": "object"}},
                "Limit": {"in": "query", "name": "limit", "type": "integer"}
            },
            "paths": {
                "/pets": {"post": {
                    "parameters": [{"$ref": "#/parameters/PetBody"}, {"$ref": "#/parameters/Limit"}],
                    "responses": {}
                }}
            }
        }));
        let post = &document.paths["/pets"].operations[&OperationType::Post];
        let body = post.request_body.as_ref().unwrap().reference().unwrap();
        assert_eq!(body.kind(), ComponentKind::RequestBody);
        assert_eq!(body.id(), "PetBody");
        assert_eq!(post.parameters[0].reference().unwrap().kind(), ComponentKind::Parameter);
        assert!(document.components.request_bodies.contains_key("PetBody"));
        assert!(document.components.parameters.contains_key("Limit"));
        assert!(!document.components.parameters.contains_key("PetBody"));
    }

    #[test]
    fn security_definitions_map_to_schemes() {
        let (document, diagnostic) = read(json!({
            "swagger": "2.0", "info": {"title": "t", "version": "1"}, "paths": {},
            "securityDefinitions": {
                "basic": {"type": "basic"},
                "key": {"type": "apiKey", "name": "X-Key", "in": "header"},
                "oauth": {"type": "oauth2", "flow": "accessCode",
                          "authorizationUrl": "https://a", "tokenUrl": "https://t",
                          "scopes": {"read": "Read"}}
            }
        }));
        assert!(!diagnostic.has_errors());
        let schemes = &document.components.security_schemes;
        assert_eq!(schemes["basic"].item().unwrap().scheme.as_deref(), Some("basic"));
        assert_eq!(schemes["key"].item().unwrap().location.as_deref(), Some("header"));
        let flows = schemes["oauth"].item().unwrap().flows.as_ref().unwrap();
        assert_eq!(flows.authorization_code.as_ref().unwrap().scopes["read"], "Read");
    }
}
