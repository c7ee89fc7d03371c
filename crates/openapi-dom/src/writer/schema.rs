use super::dialect::NullableForm;
use super::{Obj, Writer};
use crate::model::{AdditionalProperties, RefOr, Schema};
use serde_json::{json, Map, Value};

pub(super) fn schema<'a>(w: &mut Writer<'a>, schema: &'a Schema) -> Value {
    let table = w.table;
    let mut obj = Obj::new();
    if table.schema_id {
        obj.text("$id", schema.id.as_ref());
    }
    obj.text("title", schema.title.as_ref());
    match &schema.schema_type {
        Some(schema_type) if schema.nullable && table.nullable == NullableForm::TypeArray => {
            obj.set("type", json!([schema_type, "null"]));
        }
        schema_type => obj.text("type", schema_type.as_ref()),
    }
    obj.text("format", schema.format.as_ref());
    obj.text("description", schema.description.as_ref());

    obj.maybe("multipleOf", schema.multiple_of.clone());
    bound(&mut obj, table.numeric_exclusive_bounds, "maximum", "exclusiveMaximum", schema.maximum.clone(), schema.exclusive_maximum);
    bound(&mut obj, table.numeric_exclusive_bounds, "minimum", "exclusiveMinimum", schema.minimum.clone(), schema.exclusive_minimum);
    obj.maybe("maxLength", schema.max_length);
    obj.maybe("minLength", schema.min_length);
    obj.text("pattern", schema.pattern.as_ref());
    obj.maybe("maxItems", schema.max_items);
    obj.maybe("minItems", schema.min_items);
    obj.flag("uniqueItems", schema.unique_items);
    obj.maybe("maxProperties", schema.max_properties);
    obj.maybe("minProperties", schema.min_properties);
    obj.list("required", schema.required.iter().map(|name| json!(name)).collect());
    obj.list("enum", schema.enum_values.clone());
    obj.maybe("default", schema.default.clone());

    obj.list("allOf", children(w, &schema.all_of));
    if table.combinators {
        obj.list("oneOf", children(w, &schema.one_of));
        obj.list("anyOf", children(w, &schema.any_of));
        if let Some(not) = &schema.not {
            obj.set("not", w.entry(not.as_ref()));
        }
    }
    if let Some(items) = &schema.items {
        obj.set("items", w.entry(items.as_ref()));
    }
    obj.map("properties", named(w, &schema.properties));
    match &schema.additional_properties {
        Some(AdditionalProperties::Allowed(allowed)) => obj.set("additionalProperties", *allowed),
        Some(AdditionalProperties::Schema(additional)) => {
            obj.set("additionalProperties", w.entry(additional.as_ref()))
        }
        None => {}
    }
    if table.pattern_properties {
        obj.map("patternProperties", named(w, &schema.pattern_properties));
    }

    match table.nullable {
        NullableForm::Extension => obj.flag("x-nullable", schema.nullable),
        NullableForm::Keyword => obj.flag("nullable", schema.nullable),
        // Without a type there is no array to carry "null".
        NullableForm::TypeArray => obj.flag("nullable", schema.nullable && schema.schema_type.is_none()),
    }
    if let Some(discriminator) = &schema.discriminator {
        if table.discriminator_as_string {
            obj.set("discriminator", discriminator.property_name.as_str());
        } else {
            let mut value = Obj::new();
            value.set("propertyName", discriminator.property_name.as_str());
            value.map(
                "mapping",
                discriminator
                    .mapping
                    .iter()
                    .map(|(key, target)| (key.clone(), json!(target)))
                    .collect(),
            );
            obj.set("discriminator", value.build());
        }
    }
    obj.flag("readOnly", schema.read_only);
    if table.write_only {
        obj.flag("writeOnly", schema.write_only);
    }
    if !table.flat_components {
        obj.flag("deprecated", schema.deprecated);
    }
    obj.maybe("example", schema.example.clone());
    obj.maybe("externalDocs", schema.external_docs.as_ref().map(super::openapi::external_docs));
    obj.extensions(&schema.extensions);
    obj.build()
}

/// Writes a bound either as `maximum` plus a boolean flag, or (numeric form) as
/// the exclusive keyword carrying the bound itself. A flag with no bound stays a
/// boolean in both forms.
fn bound(
    obj: &mut Obj,
    numeric: bool,
    inclusive: &str,
    exclusive: &str,
    value: Option<serde_json::Number>,
    is_exclusive: bool,
) {
    let Some(value) = value else {
        obj.flag(exclusive, is_exclusive);
        return;
    };
    if numeric && is_exclusive {
        obj.set(exclusive, value);
    } else {
        obj.set(inclusive, value);
        obj.flag(exclusive, is_exclusive);
    }
}

fn children<'a>(w: &mut Writer<'a>, list: &'a [RefOr<Schema>]) -> Vec<Value> {
    list.iter().map(|child| w.entry(child)).collect()
}

fn named<'a>(w: &mut Writer<'a>, map: &'a indexmap::IndexMap<String, RefOr<Schema>>) -> Map<String, Value> {
    map.iter()
        .map(|(name, child)| (name.clone(), w.entry(child)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::{dialect, InlinePolicy};
    use super::*;
    use crate::model::{Discriminator, Document};

    fn write(table: &'static dialect::DialectTable, schema: &Schema) -> Value {
        let document = Document::new();
        let mut writer = Writer::new(&document, table, InlinePolicy::KeepReferences);
        super::schema(&mut writer, schema)
    }

    fn nullable_bounded() -> Schema {
        let mut schema = Schema::of_type("integer");
        schema.nullable = true;
        schema.maximum = Some(10.into());
        schema.exclusive_maximum = true;
        schema.minimum = Some(1.into());
        schema
    }

    #[test]
    fn nullable_and_bounds_per_dialect() {
        let schema = nullable_bounded();
        assert_eq!(
            write(&dialect::SWAGGER_2_0, &schema),
            json!({"type": "integer", "maximum": 10, "exclusiveMaximum": true, "minimum": 1, "x-nullable": true})
        );
        assert_eq!(
            write(&dialect::OPENAPI_3_0, &schema),
            json!({"type": "integer", "maximum": 10, "exclusiveMaximum": true, "minimum": 1, "nullable": true})
        );
        assert_eq!(
            write(&dialect::OPENAPI_3_1, &schema),
            json!({"type": ["integer", "null"], "exclusiveMaximum": 10, "minimum": 1})
        );
    }

    #[test]
    fn typeless_nullable_and_unbounded_flags_survive_3_1() {
        let mut schema = Schema::default();
        schema.description = Some("p".into());
        schema.nullable = true;
        schema.exclusive_minimum = true;
        assert_eq!(
            write(&dialect::OPENAPI_3_1, &schema),
            json!({"description": "p", "exclusiveMinimum": true, "nullable": true})
        );
        assert_eq!(
            write(&dialect::OPENAPI_3_0, &schema),
            json!({"description": "p", "exclusiveMinimum": true, "nullable": true})
        );
    }

    #[test]
    fn swagger_drops_what_it_cannot_say() {
        let mut schema = Schema::of_type("object");
        schema.one_of.push(Schema::of_type("string").into());
        schema.write_only = true;
        schema.pattern_properties.insert("^x-".into(), Schema::of_type("string").into());
        schema.discriminator = Some(Discriminator {
            property_name: "kind".into(),
            ..Default::default()
        });
        assert_eq!(
            write(&dialect::SWAGGER_2_0, &schema),
            json!({"type": "object", "discriminator": "kind"})
        );
        let v31 = write(&dialect::OPENAPI_3_1, &schema);
        assert_eq!(v31["patternProperties"]["^x-"], json!({"type": "string"}));
        assert_eq!(v31["discriminator"], json!({"propertyName": "kind"}));
        assert_eq!(v31["writeOnly"], json!(true));
    }
}
