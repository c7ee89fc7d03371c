use openapi_dom::{
    load, serialize, to_value, walk, Format, InlinePolicy, ReferenceResolution, SpecVersion,
    StatsVisitor,
};

const CYCLES: &str = include_str!("fixtures/cycles.yaml");

#[test]
fn cyclic_schemas_load_without_errors() {
    let result = load(CYCLES, ReferenceResolution::Local).unwrap();
    assert!(!result.diagnostic.has_errors(), "{:?}", result.diagnostic.errors());
    assert_eq!(result.document.components.schemas.len(), 4);
}

#[test]
fn walking_a_cycle_terminates_and_counts_every_reference() {
    let result = load(CYCLES, ReferenceResolution::Local).unwrap();
    let mut stats = StatsVisitor::new();
    walk(&result.document, &mut stats);
    assert_eq!(stats.operations, 2);
    // Node twice (response, items), A, B, C and A again through the ring.
    assert_eq!(stats.references, 6);
}

#[test]
fn inline_local_emits_a_pointer_at_the_self_reference() {
    let result = load(CYCLES, ReferenceResolution::Local).unwrap();
    let value = to_value(&result.document, SpecVersion::V3_0, InlinePolicy::InlineLocal);
    let schema = &value["paths"]["/nodes"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(schema["type"], "object");
    assert_eq!(
        schema["properties"]["children"]["items"]["$ref"],
        "#/components/schemas/Node"
    );
}

#[test]
fn inline_local_emits_a_pointer_where_a_longer_ring_closes() {
    let result = load(CYCLES, ReferenceResolution::Local).unwrap();
    let value = to_value(&result.document, SpecVersion::V3_0, InlinePolicy::InlineLocal);
    let a = &value["paths"]["/rings"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    let c = &a["properties"]["b"]["allOf"][0];
    assert_eq!(c["type"], "object");
    assert_eq!(c["properties"]["a"]["$ref"], "#/components/schemas/A");
}

#[test]
fn every_dialect_serializes_the_cycle() {
    let result = load(CYCLES, ReferenceResolution::Local).unwrap();
    for version in [SpecVersion::V2_0, SpecVersion::V3_0, SpecVersion::V3_1] {
        for format in [Format::Json, Format::Yaml] {
            for inline in [InlinePolicy::KeepReferences, InlinePolicy::InlineLocal] {
                let text = serialize(&result.document, version, format, inline).unwrap();
                assert!(text.contains("Node"), "{:?} {:?} {:?}", version, format, inline);
            }
        }
    }
    let swagger = to_value(&result.document, SpecVersion::V2_0, InlinePolicy::InlineLocal);
    let items = &swagger["definitions"]["Node"]["properties"]["children"]["items"];
    assert_eq!(items["$ref"], "#/definitions/Node");
}
