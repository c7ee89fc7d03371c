//! 3.x node projections, plus the metadata shared with 2.0.

use super::{Obj, Writer};
use crate::model::{
    Components, Contact, ExternalDocs, Header, Info, License, MediaType, OAuthFlow, Operation,
    Parameter, PathItem, RequestBody, Response, SecurityRequirement, SecurityScheme, Server, Tag,
};
use crate::writer::dialect::DialectTable;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

pub(super) fn document<'a>(w: &mut Writer<'a>) -> Value {
    let document = w.root;
    let table = w.table;
    let mut obj = Obj::new();
    obj.set(table.discriminator.0, table.discriminator.1);
    if table.json_schema_dialect {
        obj.text("jsonSchemaDialect", document.json_schema_dialect.as_ref());
    }
    obj.set("info", info(table, &document.info));
    obj.list("servers", document.servers.iter().map(server).collect());
    obj.set("paths", paths(w, &document.paths));
    obj.map("components", components(w, &document.components));
    if table.webhooks {
        let webhooks = document
            .webhooks
            .iter()
            .map(|(name, entry)| (name.clone(), w.entry(entry)))
            .collect();
        obj.map("webhooks", webhooks);
    }
    metadata_tail(&mut obj, document);
    obj.build()
}

/// `security`, `tags`, `externalDocs` and extensions, in that order.
pub(super) fn metadata_tail(obj: &mut Obj, document: &crate::model::Document) {
    obj.list("security", document.security.iter().map(security_requirement).collect());
    obj.list("tags", document.tags.iter().map(tag).collect());
    obj.maybe("externalDocs", document.external_docs.as_ref().map(external_docs));
    obj.extensions(&document.extensions);
}

pub(super) fn paths<'a>(w: &mut Writer<'a>, paths: &'a IndexMap<String, PathItem>) -> Value {
    use super::Emit;
    Value::Object(
        paths
            .iter()
            .map(|(path, item)| (path.clone(), PathItem::emit(w, item)))
            .collect(),
    )
}

fn components<'a>(w: &mut Writer<'a>, components: &'a Components) -> Map<String, Value> {
    let mut obj = Obj::new();
    obj.map("schemas", w.component_entries(&components.schemas));
    obj.map("responses", w.component_entries(&components.responses));
    obj.map("parameters", w.component_entries(&components.parameters));
    obj.map("requestBodies", w.component_entries(&components.request_bodies));
    obj.map("headers", w.component_entries(&components.headers));
    obj.map("securitySchemes", w.component_entries(&components.security_schemes));
    if w.table.path_item_components {
        obj.map("pathItems", w.component_entries(&components.path_items));
    }
    obj.extensions(&components.extensions);
    obj.into_map()
}

pub(super) fn path_item<'a>(w: &mut Writer<'a>, item: &'a PathItem) -> Value {
    let mut obj = Obj::new();
    obj.text("summary", item.summary.as_ref());
    obj.text("description", item.description.as_ref());
    for (method, operation) in &item.operations {
        obj.set(method.as_str(), self::operation(w, operation));
    }
    obj.list("servers", item.servers.iter().map(server).collect());
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
    obj.list("parameters", operation.parameters.iter().map(|p| w.entry(p)).collect());
    if let Some(body) = &operation.request_body {
        obj.set("requestBody", w.entry(body));
    }
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
    obj.list("servers", operation.servers.iter().map(server).collect());
    obj.extensions(&operation.extensions);
    obj.build()
}

pub(super) fn parameter<'a>(w: &mut Writer<'a>, parameter: &'a Parameter) -> Value {
    let mut obj = Obj::new();
    obj.string("name", &parameter.name);
    obj.maybe("in", parameter.location.map(|location| location.as_str()));
    obj.text("description", parameter.description.as_ref());
    obj.flag("required", parameter.required);
    obj.flag("deprecated", parameter.deprecated);
    obj.flag("allowEmptyValue", parameter.allow_empty_value);
    obj.maybe("style", parameter.style.map(|style| style.as_str()));
    obj.maybe("explode", parameter.explode);
    if let Some(schema) = &parameter.schema {
        obj.set("schema", w.entry(schema));
    }
    obj.maybe("example", parameter.example.clone());
    obj.map("content", content(w, &parameter.content));
    obj.extensions(&parameter.extensions);
    obj.build()
}

pub(super) fn request_body<'a>(w: &mut Writer<'a>, body: &'a RequestBody) -> Value {
    let mut obj = Obj::new();
    obj.text("description", body.description.as_ref());
    obj.map("content", content(w, &body.content));
    obj.flag("required", body.required);
    obj.extensions(&body.extensions);
    obj.build()
}

pub(super) fn response<'a>(w: &mut Writer<'a>, response: &'a Response) -> Value {
    let mut obj = Obj::new();
    obj.text("description", response.description.as_ref());
    let headers = response
        .headers
        .iter()
        .map(|(name, header)| (name.clone(), w.entry(header)))
        .collect();
    obj.map("headers", headers);
    obj.map("content", content(w, &response.content));
    obj.extensions(&response.extensions);
    obj.build()
}

pub(super) fn header<'a>(w: &mut Writer<'a>, header: &'a Header) -> Value {
    let mut obj = Obj::new();
    obj.text("description", header.description.as_ref());
    obj.flag("required", header.required);
    obj.flag("deprecated", header.deprecated);
    obj.maybe("style", header.style.map(|style| style.as_str()));
    obj.maybe("explode", header.explode);
    if let Some(schema) = &header.schema {
        obj.set("schema", w.entry(schema));
    }
    obj.maybe("example", header.example.clone());
    obj.extensions(&header.extensions);
    obj.build()
}

fn content<'a>(w: &mut Writer<'a>, content: &'a IndexMap<String, MediaType>) -> Map<String, Value> {
    content
        .iter()
        .map(|(media_type, media)| {
            let mut obj = Obj::new();
            if let Some(schema) = &media.schema {
                obj.set("schema", w.entry(schema));
            }
            obj.maybe("example", media.example.clone());
            obj.extensions(&media.extensions);
            (media_type.clone(), obj.build())
        })
        .collect()
}

pub(super) fn security_scheme(scheme: &SecurityScheme) -> Value {
    let mut obj = Obj::new();
    obj.set("type", scheme.scheme_type.as_str());
    obj.text("description", scheme.description.as_ref());
    obj.text("name", scheme.name.as_ref());
    obj.text("in", scheme.location.as_ref());
    obj.text("scheme", scheme.scheme.as_ref());
    obj.text("bearerFormat", scheme.bearer_format.as_ref());
    if let Some(flows) = &scheme.flows {
        let mut value = Obj::new();
        for (key, flow) in [
            ("implicit", &flows.implicit),
            ("password", &flows.password),
            ("clientCredentials", &flows.client_credentials),
            ("authorizationCode", &flows.authorization_code),
        ] {
            value.maybe(key, flow.as_ref().map(oauth_flow));
        }
        value.extensions(&flows.extensions);
        obj.set("flows", value.build());
    }
    obj.text("openIdConnectUrl", scheme.open_id_connect_url.as_ref());
    obj.extensions(&scheme.extensions);
    obj.build()
}

fn oauth_flow(flow: &OAuthFlow) -> Value {
    let mut obj = Obj::new();
    obj.text("authorizationUrl", flow.authorization_url.as_ref());
    obj.text("tokenUrl", flow.token_url.as_ref());
    obj.text("refreshUrl", flow.refresh_url.as_ref());
    obj.set("scopes", scopes(&flow.scopes));
    obj.extensions(&flow.extensions);
    obj.build()
}

pub(super) fn scopes(scopes: &IndexMap<String, String>) -> Value {
    Value::Object(
        scopes
            .iter()
            .map(|(name, description)| (name.clone(), json!(description)))
            .collect(),
    )
}

pub(super) fn info(table: &DialectTable, info: &Info) -> Value {
    let mut obj = Obj::new();
    obj.string("title", &info.title);
    if table.info_summary {
        obj.text("summary", info.summary.as_ref());
    }
    obj.text("description", info.description.as_ref());
    obj.text("termsOfService", info.terms_of_service.as_ref());
    obj.maybe("contact", info.contact.as_ref().map(contact));
    obj.maybe("license", info.license.as_ref().map(|l| license(table, l)));
    obj.string("version", &info.version);
    obj.extensions(&info.extensions);
    obj.build()
}

fn contact(contact: &Contact) -> Value {
    let mut obj = Obj::new();
    obj.text("name", contact.name.as_ref());
    obj.text("url", contact.url.as_ref());
    obj.text("email", contact.email.as_ref());
    obj.extensions(&contact.extensions);
    obj.build()
}

fn license(table: &DialectTable, license: &License) -> Value {
    let mut obj = Obj::new();
    obj.string("name", &license.name);
    if table.license_identifier {
        obj.text("identifier", license.identifier.as_ref());
    }
    obj.text("url", license.url.as_ref());
    obj.extensions(&license.extensions);
    obj.build()
}

fn server(server: &Server) -> Value {
    let mut obj = Obj::new();
    obj.set("url", server.url.as_str());
    obj.text("description", server.description.as_ref());
    let variables = server
        .variables
        .iter()
        .map(|(name, variable)| {
            let mut value = Obj::new();
            value.list("enum", variable.enum_values.iter().map(|v| json!(v)).collect());
            value.set("default", variable.default.as_str());
            value.text("description", variable.description.as_ref());
            value.extensions(&variable.extensions);
            (name.clone(), value.build())
        })
        .collect();
    obj.map("variables", variables);
    obj.extensions(&server.extensions);
    obj.build()
}

pub(super) fn tag(tag: &Tag) -> Value {
    let mut obj = Obj::new();
    obj.set("name", tag.name.as_str());
    obj.text("description", tag.description.as_ref());
    obj.maybe("externalDocs", tag.external_docs.as_ref().map(external_docs));
    obj.extensions(&tag.extensions);
    obj.build()
}

pub(super) fn external_docs(docs: &ExternalDocs) -> Value {
    let mut obj = Obj::new();
    obj.text("description", docs.description.as_ref());
    obj.set("url", docs.url.as_str());
    obj.extensions(&docs.extensions);
    obj.build()
}

pub(super) fn security_requirement(requirement: &SecurityRequirement) -> Value {
    Value::Object(
        requirement
            .0
            .iter()
            .map(|(name, scopes)| (name.clone(), json!(scopes)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use crate::format::SpecVersion;
    use crate::reader::load;
    use crate::workspace::ReferenceResolution;
    use crate::writer::{to_value, InlinePolicy};
    use serde_json::json;

    const WEBHOOKS: &str = r#"
openapi: 3.1.0
info:
  title: Webhook Example
  version: 1.0.0
webhooks:
  pets:
    $ref: '#/components/pathItems/pets'
components:
  pathItems:
    pets:
      post:
        responses:
          '200':
            description: ok
            content:
              application/json:
                schema:
                  $ref: '#/components/schemas/petSchema'
  schemas:
    petSchema:
      type: object
      required: [id]
      properties:
        id:
          type: integer
          format: int64
"#;

    #[test]
    fn webhook_path_item_references_follow_the_policy() {
        let document = load(WEBHOOKS, ReferenceResolution::Local).unwrap().document;
        let kept = to_value(&document, SpecVersion::V3_1, InlinePolicy::KeepReferences);
        assert_eq!(kept["webhooks"]["pets"], json!({"$ref": "#/components/pathItems/pets"}));

        let inlined = to_value(&document, SpecVersion::V3_1, InlinePolicy::InlineLocal);
        let schema = &inlined["webhooks"]["pets"]["post"]["responses"]["200"]["content"]["application/json"]["schema"];
        assert_eq!(schema["required"], json!(["id"]));

        // 3.0 has neither webhooks nor a pathItems section.
        let v30 = to_value(&document, SpecVersion::V3_0, InlinePolicy::KeepReferences);
        assert!(v30.get("webhooks").is_none());
        assert!(v30["components"].get("pathItems").is_none());
    }

    #[test]
    fn operation_security_override_is_kept_even_when_empty() {
        let source = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
security:
  - apiKey: []
paths:
  /open:
    get:
      security: []
      responses:
        '204':
          description: none
components:
  securitySchemes:
    apiKey:
      type: apiKey
      name: X-Key
      in: header
"#;
        let document = load(source, ReferenceResolution::Local).unwrap().document;
        let value = to_value(&document, SpecVersion::V3_0, InlinePolicy::KeepReferences);
        assert_eq!(value["paths"]["/open"]["get"]["security"], json!([]));
        assert_eq!(value["security"], json!([{"apiKey": []}]));
        assert_eq!(
            value["components"]["securitySchemes"]["apiKey"],
            json!({"type": "apiKey", "name": "X-Key", "in": "header"})
        );
    }
}
