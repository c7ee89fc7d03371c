//! Field readers shared by every dialect.

use super::context::ParseContext;
use crate::model::{
    AdditionalProperties, ComponentKind, Contact, Discriminator, Extensions, ExternalDocs, Info,
    License, Pointer, RefOr, Reference, Schema, SecurityRequirement, Server, ServerVariable, Tag,
};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

pub(crate) type Object = Map<String, Value>;

pub(crate) fn string(map: &Object, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn boolean(map: &Object, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn opt_bool(map: &Object, key: &str) -> Option<bool> {
    map.get(key).and_then(Value::as_bool)
}

pub(crate) fn unsigned(map: &Object, key: &str) -> Option<u64> {
    map.get(key).and_then(Value::as_u64)
}

pub(crate) fn number(map: &Object, key: &str) -> Option<Number> {
    match map.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

pub(crate) fn string_list(map: &Object, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `x-` prefixed keys, verbatim.
pub(crate) fn extensions(map: &Object) -> Extensions {
    map.iter()
        .filter(|(key, _)| key.starts_with("x-"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Expects an object, recording a finding otherwise.
pub(crate) fn object<'v>(value: &'v Value, ctx: &mut ParseContext<'_>, what: &str) -> Option<&'v Object> {
    match value.as_object() {
        Some(map) => Some(map),
        None => {
            ctx.error(format!("{} must be an object", what));
            None
        }
    }
}

/// Reads every entry of the object under `key`, in document order.
pub(crate) fn entries<T>(
    map: &Object,
    key: &str,
    ctx: &mut ParseContext<'_>,
    mut read: impl FnMut(&str, &Value, &mut ParseContext<'_>) -> Option<T>,
) -> IndexMap<String, T> {
    let mut out = IndexMap::new();
    let Some(value) = map.get(key) else {
        return out;
    };
    ctx.at(key, |ctx| {
        let Some(children) = object(value, ctx, key) else {
            return;
        };
        for (name, child) in children {
            if name.starts_with("x-") {
                continue;
            }
            if let Some(item) = ctx.at(name, |ctx| read(name, child, ctx)) {
                out.insert(name.clone(), item);
            }
        }
    });
    out
}

/// Reads every element of the array under `key`.
pub(crate) fn list<T>(
    map: &Object,
    key: &str,
    ctx: &mut ParseContext<'_>,
    mut read: impl FnMut(&Value, &mut ParseContext<'_>) -> Option<T>,
) -> Vec<T> {
    let Some(value) = map.get(key) else {
        return Vec::new();
    };
    ctx.at(key, |ctx| match value.as_array() {
        Some(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| ctx.at(&index.to_string(), |ctx| read(item, ctx)))
            .collect(),
        None => {
            ctx.error(format!("{} must be an array", key));
            Vec::new()
        }
    })
}

/// Turns a `$ref` string into a reference of the kind expected at this position.
///
/// Accepts both the `#/components/<section>/<id>` form and the flat 2.0 sections,
/// in local and external pointers alike. A pointer without a fragment names a
/// whole resource, such as a schema `$id`.
pub(crate) fn parse_reference(raw: &str, expected: ComponentKind, ctx: &mut ParseContext<'_>) -> Reference {
    let pointer = Pointer::parse(raw);
    let named = match pointer.segments.as_slice() {
        [] => None,
        [components, section, id] if components == "components" => {
            ComponentKind::from_section(section).map(|kind| (kind, id.clone()))
        }
        [section, id] => flat_section(section).map(|kind| (kind, id.clone())),
        _ => None,
    };

    let id = match named {
        Some((kind, id)) => {
            if kind != expected && !(expected == ComponentKind::RequestBody && kind == ComponentKind::Parameter) {
                ctx.error(format!("'{}' does not point at a {} entry", raw, expected.section()));
                // The raw pointer never matches a component id.
                return Reference::Unresolved {
                    kind: expected,
                    id: raw.to_string(),
                    location: pointer.location,
                };
            }
            id
        }
        None if pointer.segments.is_empty() && pointer.location.is_some() => String::new(),
        None => {
            ctx.error(format!("unsupported reference '{}'", raw));
            raw.to_string()
        }
    };
    Reference::Unresolved {
        kind: expected,
        id,
        location: pointer.location,
    }
}

fn flat_section(section: &str) -> Option<ComponentKind> {
    match section {
        "definitions" => Some(ComponentKind::Schema),
        "parameters" => Some(ComponentKind::Parameter),
        "responses" => Some(ComponentKind::Response),
        "securityDefinitions" => Some(ComponentKind::SecurityScheme),
        _ => None,
    }
}

/// The reference held by an object, if it is a `$ref` object.
pub(crate) fn reference(map: &Object, expected: ComponentKind, ctx: &mut ParseContext<'_>) -> Option<Reference> {
    let raw = map.get("$ref")?;
    match raw.as_str() {
        Some(raw) => Some(parse_reference(raw, expected, ctx)),
        None => {
            ctx.error("$ref must be a string");
            None
        }
    }
}

/// Reads a position that holds either a `$ref` object or an inline node.
pub(crate) fn ref_or<T>(
    value: &Value,
    kind: ComponentKind,
    ctx: &mut ParseContext<'_>,
    read: impl FnOnce(&Object, &mut ParseContext<'_>) -> Option<T>,
) -> Option<RefOr<T>> {
    let map = object(value, ctx, kind.section())?;
    if let Some(reference) = reference(map, kind, ctx) {
        return Some(RefOr::Ref(reference));
    }
    read(map, ctx).map(RefOr::Item)
}

pub(crate) fn schema_entry(value: &Value, ctx: &mut ParseContext<'_>) -> Option<RefOr<Schema>> {
    ref_or(value, ComponentKind::Schema, ctx, |map, ctx| Some(schema(map, ctx)))
}

fn boxed_schema(map: &Object, key: &str, ctx: &mut ParseContext<'_>) -> Option<Box<RefOr<Schema>>> {
    let value = map.get(key)?;
    ctx.at(key, |ctx| schema_entry(value, ctx)).map(Box::new)
}

/// Reads a schema object. Dialect differences are accepted in either spelling:
/// `type` arrays with `"null"`, `x-nullable`, boolean or numeric exclusive
/// bounds, and string or object discriminators.
pub(crate) fn schema(map: &Object, ctx: &mut ParseContext<'_>) -> Schema {
    let mut schema = Schema {
        id: string(map, "$id"),
        title: string(map, "title"),
        format: string(map, "format"),
        description: string(map, "description"),
        multiple_of: number(map, "multipleOf"),
        maximum: number(map, "maximum"),
        minimum: number(map, "minimum"),
        max_length: unsigned(map, "maxLength"),
        min_length: unsigned(map, "minLength"),
        pattern: string(map, "pattern"),
        max_items: unsigned(map, "maxItems"),
        min_items: unsigned(map, "minItems"),
        unique_items: boolean(map, "uniqueItems"),
        max_properties: unsigned(map, "maxProperties"),
        min_properties: unsigned(map, "minProperties"),
        required: string_list(map, "required").into_iter().collect(),
        enum_values: map
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        default: map.get("default").cloned(),
        nullable: boolean(map, "nullable") || boolean(map, "x-nullable"),
        read_only: boolean(map, "readOnly"),
        write_only: boolean(map, "writeOnly"),
        deprecated: boolean(map, "deprecated"),
        example: map.get("example").cloned().or_else(|| {
            map.get("examples")
                .and_then(Value::as_array)
                .and_then(|examples| examples.first().cloned())
        }),
        external_docs: map
            .get("externalDocs")
            .and_then(Value::as_object)
            .map(external_docs),
        extensions: extensions(map),
        ..Default::default()
    };
    schema.extensions.shift_remove("x-nullable");

    match map.get("type") {
        Some(Value::String(schema_type)) => schema.schema_type = Some(schema_type.clone()),
        Some(Value::Array(types)) => {
            let mut named = types.iter().filter_map(Value::as_str).filter(|t| *t != "null");
            schema.schema_type = named.next().map(str::to_string);
            if named.next().is_some() {
                ctx.at("type", |ctx| ctx.warning("only the first non-null type is kept"));
            }
            if types.iter().any(|t| t.as_str() == Some("null")) {
                schema.nullable = true;
            }
        }
        Some(_) => ctx.at("type", |ctx| ctx.error("type must be a string or an array")),
        None => {}
    }
    if schema.is_type("file") {
        schema.schema_type = Some("string".to_string());
        schema.format = Some("binary".to_string());
    }

    match map.get("exclusiveMaximum") {
        Some(Value::Bool(flag)) => schema.exclusive_maximum = *flag,
        Some(Value::Number(n)) => {
            schema.maximum = Some(n.clone());
            schema.exclusive_maximum = true;
        }
        _ => {}
    }
    match map.get("exclusiveMinimum") {
        Some(Value::Bool(flag)) => schema.exclusive_minimum = *flag,
        Some(Value::Number(n)) => {
            schema.minimum = Some(n.clone());
            schema.exclusive_minimum = true;
        }
        _ => {}
    }

    for (keyword, target) in [
        ("allOf", &mut schema.all_of),
        ("oneOf", &mut schema.one_of),
        ("anyOf", &mut schema.any_of),
    ] {
        *target = list(map, keyword, ctx, schema_entry);
    }
    schema.not = boxed_schema(map, "not", ctx);
    schema.items = boxed_schema(map, "items", ctx);
    schema.properties = entries(map, "properties", ctx, |_, value, ctx| schema_entry(value, ctx));
    schema.pattern_properties =
        entries(map, "patternProperties", ctx, |_, value, ctx| schema_entry(value, ctx));
    schema.additional_properties = match map.get("additionalProperties") {
        Some(Value::Bool(allowed)) => Some(AdditionalProperties::Allowed(*allowed)),
        Some(_) => boxed_schema(map, "additionalProperties", ctx).map(AdditionalProperties::Schema),
        None => None,
    };
    schema.discriminator = match map.get("discriminator") {
        Some(Value::String(property_name)) => Some(Discriminator {
            property_name: property_name.clone(),
            mapping: IndexMap::new(),
        }),
        Some(Value::Object(discriminator)) => Some(Discriminator {
            property_name: string(discriminator, "propertyName").unwrap_or_default(),
            mapping: discriminator
                .get("mapping")
                .and_then(Value::as_object)
                .map(|mapping| {
                    mapping
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                })
                .unwrap_or_default(),
        }),
        _ => None,
    };
    schema
}

pub(crate) fn info(map: &Object, ctx: &mut ParseContext<'_>) -> Info {
    Info {
        title: string(map, "title").unwrap_or_default(),
        version: string(map, "version").unwrap_or_default(),
        summary: string(map, "summary"),
        description: string(map, "description"),
        terms_of_service: string(map, "termsOfService"),
        contact: map.get("contact").and_then(|value| {
            ctx.at("contact", |ctx| object(value, ctx, "contact")).map(|contact| Contact {
                name: string(contact, "name"),
                url: string(contact, "url"),
                email: string(contact, "email"),
                extensions: extensions(contact),
            })
        }),
        license: map.get("license").and_then(|value| {
            ctx.at("license", |ctx| object(value, ctx, "license")).map(|license| License {
                name: string(license, "name").unwrap_or_default(),
                identifier: string(license, "identifier"),
                url: string(license, "url"),
                extensions: extensions(license),
            })
        }),
        extensions: extensions(map),
    }
}

pub(crate) fn server(value: &Value, ctx: &mut ParseContext<'_>) -> Option<Server> {
    let map = object(value, ctx, "server")?;
    let Some(url) = string(map, "url") else {
        ctx.error("server url is required");
        return None;
    };
    Some(Server {
        url,
        description: string(map, "description"),
        variables: entries(map, "variables", ctx, |_, value, ctx| {
            let variable = object(value, ctx, "server variable")?;
            Some(ServerVariable {
                default: string(variable, "default").unwrap_or_default(),
                enum_values: string_list(variable, "enum"),
                description: string(variable, "description"),
                extensions: extensions(variable),
            })
        }),
        extensions: extensions(map),
    })
}

pub(crate) fn tag(value: &Value, ctx: &mut ParseContext<'_>) -> Option<Tag> {
    let map = object(value, ctx, "tag")?;
    Some(Tag {
        name: string(map, "name").unwrap_or_default(),
        description: string(map, "description"),
        external_docs: map
            .get("externalDocs")
            .and_then(Value::as_object)
            .map(external_docs),
        extensions: extensions(map),
    })
}

pub(crate) fn external_docs(map: &Object) -> ExternalDocs {
    ExternalDocs {
        url: string(map, "url").unwrap_or_default(),
        description: string(map, "description"),
        extensions: extensions(map),
    }
}

pub(crate) fn security_requirement(value: &Value, ctx: &mut ParseContext<'_>) -> Option<SecurityRequirement> {
    let map = object(value, ctx, "security requirement")?;
    Some(SecurityRequirement(
        map.iter()
            .map(|(name, scopes)| {
                let scopes = scopes
                    .as_array()
                    .map(|s| s.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                (name.clone(), scopes)
            })
            .collect(),
    ))
}

/// Shared header of every document reader: info, tags, security and extensions.
pub(crate) fn document_metadata(root: &Object, document: &mut crate::model::Document, ctx: &mut ParseContext<'_>) {
    match root.get("info") {
        Some(value) => {
            document.info = ctx
                .at("info", |ctx| object(value, ctx, "info").map(|map| info(map, ctx)))
                .unwrap_or_default();
        }
        None => ctx.error("info is required"),
    }
    document.security = list(root, "security", ctx, security_requirement);
    document.tags = list(root, "tags", ctx, tag);
    document.external_docs = root
        .get("externalDocs")
        .and_then(Value::as_object)
        .map(external_docs);
    document.extensions = extensions(root);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::format::SpecVersion;
    use serde_json::json;

    fn read(value: Value) -> (Schema, Diagnostic) {
        let mut diagnostic = Diagnostic::new();
        let schema = {
            let mut ctx = ParseContext::new(SpecVersion::V3_1, &mut diagnostic, "");
            schema(value.as_object().unwrap(), &mut ctx)
        };
        (schema, diagnostic)
    }

    #[test]
    fn wrong_kind_pointers_never_bind() {
        let source = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths: {}
components:
  schemas:
    Pet:
      type: object
    Holder:
      properties:
        pet:
          $ref: '#/components/responses/Pet'
  responses:
    Pet:
      description: a pet
"#;
        let result = crate::reader::load(source, crate::workspace::ReferenceResolution::Local).unwrap();
        let holder = result.document.components.schemas["Holder"].item().unwrap();
        let pet = holder.properties["pet"].reference().unwrap();
        assert!(pet.handle().is_none());
        assert!(result
            .diagnostic
            .errors()
            .iter()
            .any(|error| error.message.contains("does not point at a schemas entry")));
    }

    #[test]
    fn type_arrays_with_null_become_nullable() {
        let (schema, diagnostic) = read(json!({"type": ["string", "null"]}));
        assert!(schema.is_type("string"));
        assert!(schema.nullable);
        assert!(!diagnostic.has_errors());
    }

    #[test]
    fn numeric_exclusive_bounds_fold_into_flags() {
        let (schema, _) = read(json!({"type": "integer", "exclusiveMinimum": 0, "maximum": 10}));
        assert_eq!(schema.minimum, Some(0.into()));
        assert!(schema.exclusive_minimum);
        assert!(!schema.exclusive_maximum);

        let (legacy, _) = read(json!({"minimum": 1, "exclusiveMinimum": true}));
        assert_eq!(legacy.minimum, Some(1.into()));
        assert!(legacy.exclusive_minimum);
    }

    #[test]
    fn file_type_and_x_nullable_are_normalised() {
        let (schema, _) = read(json!({"type": "file", "x-nullable": true, "x-kept": 1}));
        assert!(schema.is_binary());
        assert!(schema.nullable);
        assert_eq!(schema.extensions.keys().collect::<Vec<_>>(), vec!["x-kept"]);
    }

    #[test]
    fn children_hold_references_or_items() {
        let (schema, _) = read(json!({
            "type": "object",
            "properties": {
                "owner": {"$ref": "#/components/schemas/User"},
                "tags": {"type": "array", "items": {"$ref": "#/definitions/Tag"}}
            },
            "additionalProperties": false,
            "discriminator": "kind"
        }));
        let owner = schema.properties["owner"].reference().unwrap();
        assert_eq!(owner.id(), "User");
        let tags = schema.properties["tags"].item().unwrap();
        assert_eq!(tags.items.as_ref().unwrap().reference().unwrap().id(), "Tag");
        assert_eq!(schema.additional_properties, Some(AdditionalProperties::Allowed(false)));
        assert_eq!(schema.discriminator.unwrap().property_name, "kind");
    }

    #[test]
    fn references_parse_external_and_id_forms() {
        let mut diagnostic = Diagnostic::new();
        let mut ctx = ParseContext::new(SpecVersion::V3_0, &mut diagnostic, "");
        let external = parse_reference("common.yaml#/components/schemas/Error", ComponentKind::Schema, &mut ctx);
        assert_eq!(external.location(), Some("common.yaml"));
        assert_eq!(external.id(), "Error");

        let by_id = parse_reference("https://example.com/pet.json", ComponentKind::Schema, &mut ctx);
        assert_eq!(by_id.id(), "");

        let wrong = parse_reference("#/components/responses/NotFound", ComponentKind::Schema, &mut ctx);
        assert_eq!(wrong.kind(), ComponentKind::Schema);
        drop(ctx);
        assert_eq!(diagnostic.errors().len(), 1);
    }
}
