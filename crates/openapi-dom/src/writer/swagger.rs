//! 2.0 projections: host/basePath, body and formData parameters, flat sections.

use super::openapi::{external_docs, info, metadata_tail, paths, scopes, security_requirement};
use super::{Obj, Writer};
use crate::model::{
    Header, MediaType, Operation, OperationType, Parameter, ParameterStyle, PathItem, RefOr, RequestBody,
    Response, Schema, SecurityScheme, SecuritySchemeType, Server,
};
use crate::reader::is_form_media_type;
use indexmap::IndexSet;
use serde_json::{json, Map, Value};
use url::Url;

const PRIMITIVE_FIELDS: [&str; 15] = [
    "type",
    "format",
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
];

pub(super) fn document<'a>(w: &mut Writer<'a>) -> Value {
    let document = w.root;
    let mut obj = Obj::new();
    obj.set(w.table.discriminator.0, w.table.discriminator.1);
    obj.set("info", info(w.table, &document.info));

    let servers = HostProjection::of(&document.servers);
    obj.maybe("host", servers.host);
    obj.maybe("basePath", servers.base_path);
    obj.list("schemes", servers.schemes.into_iter().map(Value::String).collect());

    obj.set("paths", paths(w, &document.paths));

    let components = &document.components;
    obj.map("definitions", w.component_entries(&components.schemas));
    let mut parameters = w.component_entries(&components.parameters);
    for (id, entry) in &components.request_bodies {
        if parameters.contains_key(id) {
            continue;
        }
        if let Some(value) = body_component(w, id, entry) {
            parameters.insert(id.clone(), value);
        }
    }
    obj.map("parameters", parameters);
    obj.map("responses", w.component_entries(&components.responses));

    let mut definitions = Map::new();
    for (id, entry) in &components.security_schemes {
        let value = match entry {
            RefOr::Item(scheme) => security_scheme(scheme),
            RefOr::Ref(_) => w.resolve_item(entry).and_then(|(_, scheme)| security_scheme(scheme)),
        };
        if let Some(value) = value {
            definitions.insert(id.clone(), value);
        }
    }
    obj.map("securityDefinitions", definitions);

    metadata_tail(&mut obj, document);
    obj.build()
}

/// `host`, `basePath` and `schemes` derived from the server list.
#[derive(Debug, Default, PartialEq)]
struct HostProjection {
    host: Option<String>,
    base_path: Option<String>,
    schemes: Vec<String>,
}

impl HostProjection {
    fn of(servers: &[Server]) -> Self {
        let Some(first) = servers.first() else {
            return Self::default();
        };
        let (_, host, base_path) = split_server_url(&first.expanded_url());
        let mut schemes = IndexSet::new();
        for server in servers {
            let (scheme, other_host, other_base) = split_server_url(&server.expanded_url());
            if other_host == host && other_base == base_path {
                schemes.extend(scheme);
            }
        }
        let base_path = Some(base_path).filter(|path| !path.is_empty() && path != "/");
        Self {
            host,
            base_path,
            schemes: schemes.into_iter().collect(),
        }
    }
}

/// Splits a server URL into scheme, host (with port) and path.
///
/// A scheme-relative URL keeps its `//` prefix on the host.
fn split_server_url(url: &str) -> (Option<String>, Option<String>, String) {
    if let Some(rest) = url.strip_prefix("//") {
        let (host, path) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        return (None, Some(format!("//{}", host)), path.to_string());
    }
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            let host = match parsed.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            return (Some(parsed.scheme().to_string()), Some(host), parsed.path().to_string());
        }
    }
    (None, None, url.to_string())
}

pub(super) fn path_item<'a>(w: &mut Writer<'a>, item: &'a PathItem) -> Value {
    let mut obj = Obj::new();
    for (method, operation) in &item.operations {
        if w.table.trace || *method != OperationType::Trace {
            obj.set(method.as_str(), self::operation(w, operation));
        }
    }
    obj.list("parameters", item.parameters.iter().map(|p| w.entry(p)).collect());
    obj.extensions(&item.extensions);
    obj.build()
}

fn operation<'a>(w: &mut Writer<'a>, operation: &'a Operation) -> Value {
    let mut obj = Obj::new();
    obj.list("tags", operation.tags.iter().map(|tag| json!(tag)).collect());
    obj.text("summary", operation.summary.as_ref());
    obj.text("description", operation.description.as_ref());
    obj.maybe("externalDocs", operation.external_docs.as_ref().map(external_docs));
    obj.text("operationId", operation.operation_id.as_ref());

    let consumes: Vec<Value> = operation
        .request_body
        .as_ref()
        .and_then(|body| w.resolve_item(body))
        .map(|(_, body)| body.content.keys().map(|key| json!(key)).collect())
        .unwrap_or_default();
    obj.list("consumes", consumes);
    let mut produces = IndexSet::new();
    for response in operation.responses.values() {
        if let Some((_, response)) = w.resolve_item(response) {
            produces.extend(response.content.keys().cloned());
        }
    }
    obj.list("produces", produces.into_iter().map(Value::String).collect());

    let mut parameters: Vec<Value> = operation.parameters.iter().map(|p| w.entry(p)).collect();
    if let Some(body) = &operation.request_body {
        parameters.extend(body_parameters(w, body));
    }
    obj.list("parameters", parameters);

    let responses: Map<String, Value> = operation
        .responses
        .iter()
        .map(|(status, response)| (status.clone(), w.entry(response)))
        .collect();
    obj.set("responses", Value::Object(responses));
    obj.flag("deprecated", operation.deprecated);
    if let Some(security) = &operation.security {
        obj.set("security", Value::Array(security.iter().map(security_requirement).collect()));
    }
    obj.extensions(&operation.extensions);
    obj.build()
}

pub(super) fn parameter<'a>(w: &mut Writer<'a>, parameter: &'a Parameter) -> Value {
    let mut obj = Obj::new();
    obj.maybe("in", parameter.location.map(|location| location.as_str()));
    obj.string("name", &parameter.name);
    obj.text("description", parameter.description.as_ref());
    obj.flag("required", parameter.required);
    let schema = parameter
        .schema
        .as_ref()
        .or_else(|| parameter.content.values().find_map(|media| media.schema.as_ref()));
    if let Some((document, schema)) = schema.and_then(|schema| w.resolve_item(schema)) {
        obj.merge(w.within(document, |w| primitive(w, schema)));
        if schema.is_type("array") {
            obj.maybe("collectionFormat", collection_format(parameter.style, parameter.explode));
        }
    }
    obj.flag("allowEmptyValue", parameter.allow_empty_value);
    obj.extensions(&parameter.extensions);
    obj.build()
}

/// The fields a non-body parameter, header or `items` object can carry.
fn primitive<'a>(w: &mut Writer<'a>, schema: &'a Schema) -> Map<String, Value> {
    let mut fields: Map<String, Value> = match super::schema::schema(w, schema) {
        Value::Object(full) => full
            .into_iter()
            .filter(|(key, _)| PRIMITIVE_FIELDS.contains(&key.as_str()))
            .collect(),
        _ => Map::new(),
    };
    if let Some((document, items)) = schema.items.as_deref().and_then(|items| w.resolve_item(items)) {
        let items = w.within(document, |w| primitive(w, items));
        fields.insert("items".to_string(), Value::Object(items));
    }
    fields
}

fn file_type(fields: &mut Map<String, Value>, schema: &Schema) {
    if schema.is_binary() {
        fields.insert("type".to_string(), json!("file"));
        fields.remove("format");
    }
}

fn collection_format(style: Option<ParameterStyle>, explode: Option<bool>) -> Option<&'static str> {
    match style? {
        ParameterStyle::Form if explode.unwrap_or(true) => Some("multi"),
        ParameterStyle::Form | ParameterStyle::Simple => Some("csv"),
        ParameterStyle::SpaceDelimited => Some("ssv"),
        ParameterStyle::PipeDelimited => Some("pipes"),
        _ => None,
    }
}

fn is_form_body(body: &RequestBody) -> bool {
    body.content.keys().next().is_some_and(|media_type| is_form_media_type(media_type))
}

/// The parameters an operation's request body turns into.
fn body_parameters<'a>(w: &mut Writer<'a>, entry: &'a RefOr<RequestBody>) -> Vec<Value> {
    let resolved = w.resolve_item(entry);
    if let RefOr::Ref(reference) = entry {
        let keep = match resolved {
            Some((_, body)) => {
                !is_form_body(body) && !w.inlines(reference) && !w.body_shadowed(reference)
            }
            None => true,
        };
        if keep {
            return vec![w.pointer_value(reference)];
        }
    }
    let Some((document, body)) = resolved else {
        return Vec::new();
    };
    w.within(document, |w| match body.content.first() {
        Some((media_type, media)) if is_form_media_type(media_type) => form_parameters(w, media),
        _ => vec![body_parameter(w, body, "body")],
    })
}

/// A request body as a single `in: body` parameter.
pub(super) fn body_parameter<'a>(w: &mut Writer<'a>, body: &'a RequestBody, fallback_name: &str) -> Value {
    let mut obj = Obj::new();
    obj.set("in", "body");
    let name = body
        .extensions
        .get("x-bodyName")
        .and_then(Value::as_str)
        .unwrap_or(fallback_name);
    obj.set("name", name);
    obj.text("description", body.description.as_ref());
    obj.flag("required", body.required);
    if let Some(schema) = body.content.values().find_map(|media| media.schema.as_ref()) {
        obj.set("schema", w.entry(schema));
    }
    for (key, value) in &body.extensions {
        if key != "x-bodyName" {
            obj.set(key, value.clone());
        }
    }
    obj.build()
}

fn body_component<'a>(w: &mut Writer<'a>, id: &str, entry: &'a RefOr<RequestBody>) -> Option<Value> {
    let (document, body) = w.resolve_item(entry)?;
    if is_form_body(body) {
        return None;
    }
    Some(match entry {
        RefOr::Item(body) => body_parameter(w, body, id),
        RefOr::Ref(reference) if reference.id() == id && reference.location().is_none() => json!({}),
        RefOr::Ref(reference) if w.body_shadowed(reference) => {
            w.within(document, |w| body_parameter(w, body, id))
        }
        RefOr::Ref(reference) => w.pointer_value(reference),
    })
}

/// Object properties of a form body as `in: formData` parameters.
fn form_parameters<'a>(w: &mut Writer<'a>, media: &'a MediaType) -> Vec<Value> {
    let Some((document, schema)) = media.schema.as_ref().and_then(|schema| w.resolve_item(schema)) else {
        return Vec::new();
    };
    w.within(document, |w| {
        let mut parameters = Vec::new();
        for (name, property) in &schema.properties {
            let mut obj = Obj::new();
            obj.set("in", "formData");
            obj.set("name", name.as_str());
            let resolved = w.resolve_item(property);
            if let Some((_, property)) = resolved {
                obj.text("description", property.description.as_ref());
            }
            obj.flag("required", schema.required.contains(name));
            if let Some((document, property)) = resolved {
                let mut fields = w.within(document, |w| primitive(w, property));
                file_type(&mut fields, property);
                obj.merge(fields);
            }
            parameters.push(obj.build());
        }
        parameters
    })
}

pub(super) fn response<'a>(w: &mut Writer<'a>, response: &'a Response) -> Value {
    let mut obj = Obj::new();
    obj.text("description", response.description.as_ref());
    if let Some(schema) = response.content.values().find_map(|media| media.schema.as_ref()) {
        let mut value = w.entry(schema);
        if let (Value::Object(fields), RefOr::Item(schema)) = (&mut value, schema) {
            file_type(fields, schema);
        }
        obj.set("schema", value);
    }
    let headers = response
        .headers
        .iter()
        .map(|(name, header)| (name.clone(), w.entry(header)))
        .collect();
    obj.map("headers", headers);
    let examples = response
        .content
        .iter()
        .filter_map(|(media_type, media)| Some((media_type.clone(), media.example.clone()?)))
        .collect();
    obj.map("examples", examples);
    obj.extensions(&response.extensions);
    obj.build()
}

pub(super) fn header<'a>(w: &mut Writer<'a>, header: &'a Header) -> Value {
    let mut obj = Obj::new();
    obj.text("description", header.description.as_ref());
    if let Some((document, schema)) = header.schema.as_ref().and_then(|schema| w.resolve_item(schema)) {
        obj.merge(w.within(document, |w| primitive(w, schema)));
        if schema.is_type("array") {
            obj.maybe("collectionFormat", collection_format(header.style, header.explode));
        }
    }
    obj.extensions(&header.extensions);
    obj.build()
}

/// `None` for schemes 2.0 cannot express (bearer, OpenID Connect).
pub(super) fn security_scheme(scheme: &SecurityScheme) -> Option<Value> {
    let mut obj = Obj::new();
    match scheme.scheme_type {
        SecuritySchemeType::Http => {
            if !scheme.scheme.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("basic")) {
                return None;
            }
            obj.set("type", "basic");
            obj.text("description", scheme.description.as_ref());
        }
        SecuritySchemeType::ApiKey => {
            obj.set("type", "apiKey");
            obj.text("description", scheme.description.as_ref());
            obj.text("name", scheme.name.as_ref());
            obj.text("in", scheme.location.as_ref());
        }
        SecuritySchemeType::OAuth2 => {
            let flows = scheme.flows.as_ref()?;
            let (flow_name, flow) = [
                ("implicit", &flows.implicit),
                ("password", &flows.password),
                ("application", &flows.client_credentials),
                ("accessCode", &flows.authorization_code),
            ]
            .into_iter()
            .find_map(|(name, flow)| flow.as_ref().map(|flow| (name, flow)))?;
            obj.set("type", "oauth2");
            obj.text("description", scheme.description.as_ref());
            obj.set("flow", flow_name);
            obj.text("authorizationUrl", flow.authorization_url.as_ref());
            obj.text("tokenUrl", flow.token_url.as_ref());
            obj.set("scopes", scopes(&flow.scopes));
        }
        SecuritySchemeType::OpenIdConnect => return None,
    }
    obj.extensions(&scheme.extensions);
    Some(obj.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, SpecVersion};
    use crate::model::Document;
    use crate::reader::load;
    use crate::workspace::ReferenceResolution;
    use crate::writer::{serialize, to_value, InlinePolicy};

    fn v2(document: &Document) -> Value {
        to_value(document, SpecVersion::V2_0, InlinePolicy::KeepReferences)
    }

    #[test]
    fn servers_project_to_host_and_base_path() {
        let mut document = Document::new();
        document.info.version = "1.0.0".into();
        document.servers.push(Server::new("/server1"));
        assert_eq!(
            v2(&document),
            json!({"swagger": "2.0", "info": {"version": "1.0.0"}, "basePath": "/server1", "paths": {}})
        );

        document.servers = vec![Server::new("//example.org/server1")];
        let value = v2(&document);
        assert_eq!(value["host"], json!("//example.org"));
        assert_eq!(value["basePath"], json!("/server1"));

        document.servers = vec![Server::new("//example.org/")];
        let value = v2(&document);
        assert_eq!(value["host"], json!("//example.org"));
        assert!(value.get("basePath").is_none());

        document.servers = vec![
            Server::new("https://api.example.com:8443/v1"),
            Server::new("http://api.example.com:8443/v1"),
            Server::new("https://other.example.com/v1"),
        ];
        let value = v2(&document);
        assert_eq!(value["host"], json!("api.example.com:8443"));
        assert_eq!(value["schemes"], json!(["https", "http"]));
    }

    #[test]
    fn collection_format_only_for_arrays() {
        let source = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths:
  /foo:
    get:
      parameters:
        - in: query
          name: q
          style: form
          explode: false
          schema:
            type: string
        - in: query
          name: ids
          style: form
          explode: false
          schema:
            type: array
            items:
              type: integer
      responses: {}
"#;
        let document = load(source, ReferenceResolution::Local).unwrap().document;
        let parameters = &v2(&document)["paths"]["/foo"]["get"]["parameters"];
        assert_eq!(parameters[0], json!({"in": "query", "name": "q", "type": "string"}));
        assert_eq!(
            parameters[1],
            json!({"in": "query", "name": "ids", "type": "array", "items": {"type": "integer"}, "collectionFormat": "csv"})
        );
    }

    #[test]
    fn request_bodies_become_body_and_form_parameters() {
        let source = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths:
  /pets:
    post:
      requestBody:
        $ref: '#/components/requestBodies/NewPet'
      responses:
        '201':
          description: created
    put:
      requestBody:
        content:
          multipart/form-data:
            schema:
              type: object
              required: [upload]
              properties:
                upload:
                  type: string
                  format: binary
                  description: the file
      responses:
        '200':
          description: ok
          content:
            application/octet-stream:
              schema:
                type: string
                format: binary
components:
  requestBodies:
    NewPet:
      required: true
      x-bodyName: pet
      content:
        application/json:
          schema:
            type: object
"#;
        let document = load(source, ReferenceResolution::Local).unwrap().document;
        let value = v2(&document);
        let post = &value["paths"]["/pets"]["post"];
        assert_eq!(post["parameters"], json!([{"$ref": "#/parameters/NewPet"}]));
        assert_eq!(post["consumes"], json!(["application/json"]));
        assert_eq!(
            value["parameters"]["NewPet"],
            json!({"in": "body", "name": "pet", "required": true, "schema": {"type": "object"}})
        );

        let put = &value["paths"]["/pets"]["put"];
        assert_eq!(
            put["parameters"],
            json!([{"in": "formData", "name": "upload", "description": "the file", "required": true, "type": "file"}])
        );
        assert_eq!(put["produces"], json!(["application/octet-stream"]));
        assert_eq!(put["responses"]["200"]["schema"], json!({"type": "file"}));
    }

    #[test]
    fn body_named_like_a_parameter_is_written_in_place() {
        let source = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths:
  /pets:
    post:
      parameters:
        - $ref: '#/components/parameters/pet'
      requestBody:
        $ref: '#/components/requestBodies/pet'
      responses: {}
components:
  parameters:
    pet:
      in: query
      name: pet
      schema:
        type: string
  requestBodies:
    pet:
      content:
        application/json:
          schema:
            type: object
"#;
        let document = load(source, ReferenceResolution::Local).unwrap().document;
        let value = v2(&document);
        assert_eq!(
            value["paths"]["/pets"]["post"]["parameters"],
            json!([
                {"$ref": "#/parameters/pet"},
                {"in": "body", "name": "body", "schema": {"type": "object"}}
            ])
        );
        assert_eq!(
            value["parameters"],
            json!({"pet": {"in": "query", "name": "pet", "type": "string"}})
        );
    }

    #[test]
    fn self_alias_definition_is_empty() {
        let source = "swagger: '2.0'\ninfo:\n  version: 1.0.0\npaths: {}\ndefinitions:\n  schema1:\n    $ref: '#/definitions/schema1'\n";
        let document = load(source, ReferenceResolution::Local).unwrap().document;
        let text = serialize(&document, SpecVersion::V2_0, Format::Yaml, InlinePolicy::InlineLocal).unwrap();
        assert_eq!(text, "swagger: '2.0'\ninfo:\n  version: 1.0.0\npaths: {}\ndefinitions:\n  schema1: {}\n");
    }

    #[test]
    fn security_schemes_map_back_to_2_0_names() {
        let source = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths: {}
components:
  securitySchemes:
    basic:
      type: http
      scheme: basic
    bearer:
      type: http
      scheme: bearer
    oauth:
      type: oauth2
      flows:
        clientCredentials:
          tokenUrl: https://auth.example.com/token
          scopes:
            read: read access
"#;
        let document = load(source, ReferenceResolution::Local).unwrap().document;
        let definitions = &v2(&document)["securityDefinitions"];
        assert_eq!(definitions["basic"], json!({"type": "basic"}));
        assert!(definitions.get("bearer").is_none());
        assert_eq!(
            definitions["oauth"],
            json!({"type": "oauth2", "flow": "application", "tokenUrl": "https://auth.example.com/token", "scopes": {"read": "read access"}})
        );
    }
}
