//! 3.0 and 3.1 documents map onto the model almost field for field.

use super::common::{
    boolean, document_metadata, entries, extensions, external_docs, list, object, opt_bool,
    ref_or, schema_entry, security_requirement, server, string, string_list, Object,
};
use super::context::ParseContext;
use crate::model::{
    Components, ComponentKind, Document, Header, MediaType, Operation, OperationType, OAuthFlow,
    OAuthFlows, Parameter, ParameterLocation, ParameterStyle, PathItem, RequestBody, Response,
    SecurityScheme, SecuritySchemeType,
};
use indexmap::IndexMap;
use serde_json::Value;

pub(crate) fn read_document(root: &Object, ctx: &mut ParseContext<'_>) -> Document {
    let mut document = Document::new();
    document_metadata(root, &mut document, ctx);
    if ctx.is_v31() {
        document.json_schema_dialect = string(root, "jsonSchemaDialect");
    }
    document.servers = list(root, "servers", ctx, server);

    match root.get("paths") {
        Some(_) => document.paths = entries(root, "paths", ctx, |_, value, ctx| path_entry(value, ctx)),
        None if !ctx.is_v31() => ctx.error("paths is required"),
        None => {}
    }
    if ctx.is_v31() {
        document.webhooks = entries(root, "webhooks", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::PathItem, ctx, |map, ctx| Some(path_item(map, ctx)))
        });
    }
    if let Some(value) = root.get("components") {
        document.components = ctx
            .at("components", |ctx| object(value, ctx, "components").map(|map| components(map, ctx)))
            .unwrap_or_default();
    }
    document
}

fn path_entry(value: &Value, ctx: &mut ParseContext<'_>) -> Option<PathItem> {
    let map = object(value, ctx, "path item")?;
    if map.contains_key("$ref") {
        ctx.warning("path item references under paths are not supported and were skipped");
        return None;
    }
    Some(path_item(map, ctx))
}

pub(crate) fn components(map: &Object, ctx: &mut ParseContext<'_>) -> Components {
    Components {
        schemas: entries(map, "schemas", ctx, |_, value, ctx| schema_entry(value, ctx)),
        responses: entries(map, "responses", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Response, ctx, |map, ctx| Some(response(map, ctx)))
        }),
        parameters: entries(map, "parameters", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Parameter, ctx, parameter)
        }),
        request_bodies: entries(map, "requestBodies", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::RequestBody, ctx, |map, ctx| Some(request_body(map, ctx)))
        }),
        headers: entries(map, "headers", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Header, ctx, |map, ctx| Some(header(map, ctx)))
        }),
        security_schemes: entries(map, "securitySchemes", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::SecurityScheme, ctx, security_scheme)
        }),
        path_items: if ctx.is_v31() {
            entries(map, "pathItems", ctx, |_, value, ctx| {
                ref_or(value, ComponentKind::PathItem, ctx, |map, ctx| Some(path_item(map, ctx)))
            })
        } else {
            IndexMap::new()
        },
        extensions: extensions(map),
    }
}

pub(crate) fn path_item(map: &Object, ctx: &mut ParseContext<'_>) -> PathItem {
    let mut item = PathItem {
        summary: string(map, "summary"),
        description: string(map, "description"),
        servers: list(map, "servers", ctx, server),
        parameters: list(map, "parameters", ctx, |value, ctx| {
            ref_or(value, ComponentKind::Parameter, ctx, parameter)
        }),
        extensions: extensions(map),
        ..Default::default()
    };
    for method in OperationType::ALL {
        if let Some(value) = map.get(method.as_str()) {
            let operation = ctx.at(method.as_str(), |ctx| {
                object(value, ctx, "operation").map(|map| operation(map, ctx))
            });
            if let Some(operation) = operation {
                item.operations.insert(method, operation);
            }
        }
    }
    item
}

fn operation(map: &Object, ctx: &mut ParseContext<'_>) -> Operation {
    Operation {
        tags: string_list(map, "tags"),
        summary: string(map, "summary"),
        description: string(map, "description"),
        external_docs: map.get("externalDocs").and_then(Value::as_object).map(external_docs),
        operation_id: string(map, "operationId"),
        parameters: list(map, "parameters", ctx, |value, ctx| {
            ref_or(value, ComponentKind::Parameter, ctx, parameter)
        }),
        request_body: map.get("requestBody").and_then(|value| {
            ctx.at("requestBody", |ctx| {
                ref_or(value, ComponentKind::RequestBody, ctx, |map, ctx| Some(request_body(map, ctx)))
            })
        }),
        responses: entries(map, "responses", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Response, ctx, |map, ctx| Some(response(map, ctx)))
        }),
        deprecated: boolean(map, "deprecated"),
        security: map
            .contains_key("security")
            .then(|| list(map, "security", ctx, security_requirement)),
        servers: list(map, "servers", ctx, server),
        extensions: extensions(map),
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
    let name = string(map, "name").unwrap_or_else(|| {
        ctx.error("parameter name is required");
        String::new()
    });
    Some(Parameter {
        name,
        location,
        description: string(map, "description"),
        required: boolean(map, "required"),
        deprecated: boolean(map, "deprecated"),
        allow_empty_value: boolean(map, "allowEmptyValue"),
        style: string(map, "style").and_then(|raw| ParameterStyle::parse(&raw)),
        explode: opt_bool(map, "explode"),
        schema: schema_at(map, ctx),
        example: map.get("example").cloned(),
        content: content(map, ctx),
        extensions: extensions(map),
    })
}

fn schema_at(map: &Object, ctx: &mut ParseContext<'_>) -> Option<crate::model::RefOr<crate::model::Schema>> {
    let value = map.get("schema")?;
    ctx.at("schema", |ctx| schema_entry(value, ctx))
}

fn content(map: &Object, ctx: &mut ParseContext<'_>) -> IndexMap<String, MediaType> {
    entries(map, "content", ctx, |_, value, ctx| {
        let media = object(value, ctx, "media type")?;
        Some(MediaType {
            schema: schema_at(media, ctx),
            example: media.get("example").cloned(),
            extensions: extensions(media),
        })
    })
}

fn request_body(map: &Object, ctx: &mut ParseContext<'_>) -> RequestBody {
    RequestBody {
        description: string(map, "description"),
        content: content(map, ctx),
        required: boolean(map, "required"),
        extensions: extensions(map),
    }
}

fn response(map: &Object, ctx: &mut ParseContext<'_>) -> Response {
    Response {
        description: string(map, "description"),
        headers: entries(map, "headers", ctx, |_, value, ctx| {
            ref_or(value, ComponentKind::Header, ctx, |map, ctx| Some(header(map, ctx)))
        }),
        content: content(map, ctx),
        extensions: extensions(map),
    }
}

fn header(map: &Object, ctx: &mut ParseContext<'_>) -> Header {
    Header {
        description: string(map, "description"),
        required: boolean(map, "required"),
        deprecated: boolean(map, "deprecated"),
        style: string(map, "style").and_then(|raw| ParameterStyle::parse(&raw)),
        explode: opt_bool(map, "explode"),
        schema: schema_at(map, ctx),
        example: map.get("example").cloned(),
        extensions: extensions(map),
    }
}

fn security_scheme(map: &Object, ctx: &mut ParseContext<'_>) -> Option<SecurityScheme> {
    let raw = string(map, "type").unwrap_or_default();
    let Some(scheme_type) = SecuritySchemeType::parse(&raw) else {
        ctx.error(format!("unknown security scheme type '{}'", raw));
        return None;
    };
    let mut scheme = SecurityScheme::new(scheme_type);
    scheme.description = string(map, "description");
    scheme.name = string(map, "name");
    scheme.location = string(map, "in");
    scheme.scheme = string(map, "scheme");
    scheme.bearer_format = string(map, "bearerFormat");
    scheme.open_id_connect_url = string(map, "openIdConnectUrl");
    scheme.flows = map.get("flows").and_then(Value::as_object).map(|flows| {
        let flow = |key: &str| flows.get(key).and_then(Value::as_object).map(oauth_flow);
        OAuthFlows {
            implicit: flow("implicit"),
            password: flow("password"),
            client_credentials: flow("clientCredentials"),
            authorization_code: flow("authorizationCode"),
            extensions: extensions(flows),
        }
    });
    scheme.extensions = extensions(map);
    Some(scheme)
}

pub(crate) fn oauth_flow(map: &Object) -> OAuthFlow {
    OAuthFlow {
        authorization_url: string(map, "authorizationUrl"),
        token_url: string(map, "tokenUrl"),
        refresh_url: string(map, "refreshUrl"),
        scopes: map
            .get("scopes")
            .and_then(Value::as_object)
            .map(|scopes| {
                scopes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        extensions: extensions(map),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::format::SpecVersion;
    use serde_json::json;

    fn read(version: SpecVersion, value: Value) -> (Document, Diagnostic) {
        let mut diagnostic = Diagnostic::new();
        let document = {
            let mut ctx = ParseContext::new(version, &mut diagnostic, "");
            read_document(value.as_object().unwrap(), &mut ctx)
        };
        (document, diagnostic)
    }

    #[test]
    fn reads_operations_in_method_order() {
        let (document, diagnostic) = read(
            SpecVersion::V3_0,
            json!({
                "openapi": "3.0.1",
                "info": {"title": "Pets", "version": "1"},
                "paths": {
                    "/pets/{id}": {
                        "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}],
                        "delete": {"operationId": "deletePet", "responses": {"204": {"description": "gone"}}},
                        "get": {
                            "operationId": "getPet",
                            "security": [],
                            "responses": {"200": {"$ref": "#/components/responses/Pet"}}
                        }
                    }
                }
            }),
        );
        assert!(!diagnostic.has_errors());
        let item = &document.paths["/pets/{id}"];
        let methods: Vec<_> = item.operations.keys().copied().collect();
        assert_eq!(methods, vec![OperationType::Get, OperationType::Delete]);
        assert_eq!(item.parameters.len(), 1);
        let get = &item.operations[&OperationType::Get];
        assert_eq!(get.security, Some(vec![]));
        assert_eq!(get.responses["200"].reference().unwrap().id(), "Pet");
        assert_eq!(item.operations[&OperationType::Delete].security, None);
    }

    #[test]
    fn webhooks_and_path_items_only_in_v31() {
        let source = json!({
            "info": {"title": "Hooks", "version": "1"},
            "webhooks": {"newPet": {"post": {"responses": {"200": {"description": "ok"}}}}},
            "components": {"pathItems": {"shared": {"get": {}}}}
        });
        let (v31, diagnostic) = read(SpecVersion::V3_1, source.clone());
        assert!(!diagnostic.has_errors());
        assert_eq!(v31.webhooks.len(), 1);
        assert_eq!(v31.components.path_items.len(), 1);

        let (v30, diagnostic) = read(SpecVersion::V3_0, source);
        assert!(v30.webhooks.is_empty());
        assert!(diagnostic.has_errors());
    }

    #[test]
    fn structural_problems_are_collected_not_raised() {
        let (document, diagnostic) = read(
            SpecVersion::V3_0,
            json!({
                "openapi": "3.0.1",
                "paths": {
                    "/a": {"get": {"parameters": [{"name": "q", "in": "body"}, {"in": "query"}]}}
                },
                "components": {"securitySchemes": {"weird": {"type": "magic"}}}
            }),
        );
        let messages: Vec<_> = diagnostic.errors().iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"info is required"));
        assert!(messages.contains(&"unknown parameter location 'body'"));
        assert!(messages.contains(&"parameter name is required"));
        assert!(messages.contains(&"unknown security scheme type 'magic'"));
        assert_eq!(document.paths["/a"].operations[&OperationType::Get].parameters.len(), 1);
        let pointers: Vec<_> = diagnostic.errors().iter().map(|e| e.pointer.as_str()).collect();
        assert!(pointers.contains(&"#/paths/~1a/get/parameters/0"));
    }
}
