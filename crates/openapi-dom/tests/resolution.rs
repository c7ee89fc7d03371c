use std::sync::Arc;

use openapi_dom::{
    to_value, walk, DiagnosticKind, DomError, InlinePolicy, MemoryFetcher, OpenApiReader,
    ReaderSettings, ReferenceResolution, SpecVersion, StatsVisitor,
};

const ROOT: &str = "https://api.example.com/specs/root.yaml";

const ROOT_DOCUMENT: &str = r#"
openapi: 3.0.1
info: {title: Root, version: '1'}
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'common.yaml#/components/schemas/Pet'
        default:
          description: error
          content:
            application/json:
              schema:
                $ref: 'errors/error.yaml'
"#;

const COMMON: &str = r#"
openapi: 3.0.1
info: {title: Common, version: '1'}
paths: {}
components:
  schemas:
    Pet:
      type: object
      properties:
        owner:
          $ref: '#/components/schemas/Owner'
    Owner:
      type: object
      properties:
        pets:
          type: array
          items:
            $ref: '#/components/schemas/Pet'
"#;

const ERROR_FRAGMENT: &str = r#"
type: object
properties:
  message:
    type: string
"#;

fn reader(resolution: ReferenceResolution, fetcher: MemoryFetcher) -> OpenApiReader {
    OpenApiReader::new(ReaderSettings {
        resolution,
        base_location: Some(ROOT.to_string()),
        ..ReaderSettings::default()
    })
    .with_fetcher(Arc::new(fetcher))
}

fn all_documents() -> MemoryFetcher {
    MemoryFetcher::new()
        .with("https://api.example.com/specs/common.yaml", COMMON)
        .with("https://api.example.com/specs/errors/error.yaml", ERROR_FRAGMENT)
}

#[test]
fn local_resolution_leaves_external_references_as_warnings() {
    let result = reader(ReferenceResolution::Local, all_documents())
        .read_str(ROOT_DOCUMENT)
        .unwrap();
    assert!(!result.diagnostic.has_errors());
    assert_eq!(result.diagnostic.warnings().len(), 2);
    assert!(result
        .diagnostic
        .warnings()
        .iter()
        .all(|warning| warning.kind == DiagnosticKind::UnresolvedReference));
    assert!(result.document.external_documents.is_empty());

    let value = to_value(&result.document, SpecVersion::V3_0, InlinePolicy::InlineLocal);
    let schema = &value["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(schema["$ref"], "common.yaml#/components/schemas/Pet");
}

#[test]
fn full_resolution_pulls_in_every_reachable_document() {
    let result = reader(ReferenceResolution::All, all_documents())
        .read_str(ROOT_DOCUMENT)
        .unwrap();
    assert!(!result.diagnostic.has_errors(), "{:?}", result.diagnostic.errors());
    assert!(result.diagnostic.warnings().is_empty());
    assert_eq!(result.document.external_documents.len(), 2);

    let mut stats = StatsVisitor::new();
    walk(&result.document, &mut stats);
    // root -> Pet -> Owner -> Pet, root -> error fragment
    assert_eq!(stats.references, 4);
}

#[test]
fn external_pointers_are_kept_when_writing() {
    let result = reader(ReferenceResolution::All, all_documents())
        .read_str(ROOT_DOCUMENT)
        .unwrap();
    let value = to_value(&result.document, SpecVersion::V3_1, InlinePolicy::InlineLocal);
    let content = &value["paths"]["/pets"]["get"]["responses"];
    assert_eq!(
        content["200"]["content"]["application/json"]["schema"]["$ref"],
        "common.yaml#/components/schemas/Pet"
    );
    assert_eq!(
        content["default"]["content"]["application/json"]["schema"]["$ref"],
        "errors/error.yaml"
    );
}

#[test]
fn fetch_failures_are_distinguished_from_bad_content() {
    let missing_common = MemoryFetcher::new()
        .with("https://api.example.com/specs/errors/error.yaml", ERROR_FRAGMENT);
    let err = reader(ReferenceResolution::All, missing_common)
        .read_str(ROOT_DOCUMENT)
        .err()
        .unwrap();
    assert!(err.is_fetch(), "{}", err);

    let broken = all_documents().with("https://api.example.com/specs/common.yaml", "{not: [valid");
    let err = reader(ReferenceResolution::All, broken)
        .read_str(ROOT_DOCUMENT)
        .err()
        .unwrap();
    assert!(matches!(err, DomError::MalformedContent(_)), "{}", err);
}

#[test]
fn a_missing_target_is_fatal_only_under_full_resolution() {
    let document = r#"
openapi: 3.0.1
info: {title: t, version: '1'}
paths: {}
components:
  schemas:
    A:
      $ref: 'common.yaml#/components/schemas/Nope'
"#;
    let local = reader(ReferenceResolution::Local, all_documents())
        .read_str(document)
        .unwrap();
    assert_eq!(local.diagnostic.warnings().len(), 1);

    let err = reader(ReferenceResolution::All, all_documents())
        .read_str(document)
        .err()
        .unwrap();
    assert!(matches!(err, DomError::UnresolvedReference(_)), "{}", err);
}

#[test]
fn references_by_schema_id_resolve_to_the_component() {
    let result = reader(ReferenceResolution::Local, MemoryFetcher::new())
        .read_str(
            r#"
openapi: 3.1.0
info: {title: t, version: '1'}
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'https://schemas.example.com/pet'
components:
  schemas:
    Pet:
      $id: 'https://schemas.example.com/pet'
      type: object
"#,
        )
        .unwrap();
    assert!(!result.diagnostic.has_errors(), "{:?}", result.diagnostic.errors());
    assert!(result.diagnostic.warnings().is_empty());
    let value = to_value(&result.document, SpecVersion::V3_1, InlinePolicy::KeepReferences);
    let schema = &value["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(schema["$ref"], "#/components/schemas/Pet");
}
