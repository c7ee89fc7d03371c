//! Loading: bytes → raw JSON tree → canonical model → resolved graph.

mod common;
mod context;
pub mod source;
mod v2;
mod v3;

pub(crate) use v2::is_form_media_type;

use crate::diagnostic::Diagnostic;
use crate::error::{DomError, DomResult};
use crate::format::{Format, SpecVersion};
use crate::model::Document;
use crate::validation;
use crate::workspace::{resolve, DocumentFetcher, ReferenceResolution, Workspace};
use context::ParseContext;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Load settings with sensible defaults
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub resolution: ReferenceResolution,
    /// Input format; detected from the base location or the content when `None`.
    pub format: Option<Format>,
    /// Where the input came from. Relative external references resolve against it.
    pub base_location: Option<String>,
    /// Run the default validation rules after resolution.
    pub validate: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            resolution: ReferenceResolution::Local,
            format: None,
            base_location: None,
            validate: true,
        }
    }
}

/// A loaded document and the findings of its load.
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub document: Document,
    pub diagnostic: Diagnostic,
}

#[derive(Clone, Default)]
pub struct OpenApiReader {
    settings: ReaderSettings,
    fetcher: Option<Arc<dyn DocumentFetcher>>,
}

impl OpenApiReader {
    pub fn new(settings: ReaderSettings) -> Self {
        Self {
            settings,
            fetcher: None,
        }
    }

    /// Retrieval used for external documents under [`ReferenceResolution::All`].
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn read_str(&self, text: &str) -> DomResult<ReadResult> {
        self.read(text.as_bytes())
    }

    /// Reads a local file; its path becomes the base location unless one is set.
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> DomResult<ReadResult> {
        let path = path.as_ref();
        let bytes = source::read_file(path)?;
        let mut reader = self.clone();
        if reader.settings.base_location.is_none() {
            reader.settings.base_location = Some(path.to_string_lossy().replace('\\', "/"));
        }
        reader.read(&bytes)
    }

    pub fn read(&self, bytes: &[u8]) -> DomResult<ReadResult> {
        let settings = &self.settings;
        let base = settings.base_location.as_deref();
        let text = source::decode(bytes)?;
        let format = settings
            .format
            .or_else(|| base.and_then(Format::from_location))
            .unwrap_or_else(|| Format::detect_from_content(text));
        let root = source::parse_value(text, format, base)?;
        let version = SpecVersion::detect(&root)?;
        debug!("Detected {} document in {} format", version, format.display_name());

        let mut diagnostic = Diagnostic::new();
        diagnostic.set_spec_version(version);
        let mut document = read_tree(&root, version, "", &mut diagnostic)?;
        document.base_uri = settings.base_location.clone();

        let mut workspace = match &self.fetcher {
            Some(fetcher) => Workspace::with_fetcher(Arc::clone(fetcher)),
            None => Workspace::new(),
        };
        resolve(&mut document, &mut workspace, settings.resolution, &mut diagnostic)?;

        if settings.validate {
            validation::validate(&document, &mut diagnostic);
        }
        info!(
            "Loaded {} document: {} paths, {} components, {} errors, {} warnings",
            version,
            document.paths.len(),
            document.components.len(),
            diagnostic.errors().len(),
            diagnostic.warnings().len()
        );
        Ok(ReadResult {
            document,
            diagnostic,
        })
    }
}

/// Loads a description with default settings and the given resolution mode.
pub fn load(source: impl AsRef<[u8]>, resolution: ReferenceResolution) -> DomResult<ReadResult> {
    OpenApiReader::new(ReaderSettings {
        resolution,
        ..ReaderSettings::default()
    })
    .read(source.as_ref())
}

fn read_tree(
    root: &serde_json::Value,
    version: SpecVersion,
    prefix: &str,
    diagnostic: &mut Diagnostic,
) -> DomResult<Document> {
    let map = root
        .as_object()
        .ok_or_else(|| DomError::malformed("document root must be an object"))?;
    let mut ctx = ParseContext::new(version, diagnostic, prefix);
    Ok(match version {
        SpecVersion::V2_0 => v2::read_document(map, &mut ctx),
        SpecVersion::V3_0 | SpecVersion::V3_1 => v3::read_document(map, &mut ctx),
    })
}

/// Parses a fetched external document without resolving it.
///
/// A full description is read in its own dialect. Anything else is taken to be a
/// bare schema and registered as the schema component with the empty id, which is
/// what a `$ref` without a fragment points at.
pub(crate) fn parse_external(
    bytes: &[u8],
    location: &str,
    fallback: SpecVersion,
    diagnostic: &mut Diagnostic,
) -> DomResult<Document> {
    let text = source::decode(bytes)?;
    let format = Format::from_location(location).unwrap_or_else(|| Format::detect_from_content(text));
    let root = source::parse_value(text, format, Some(location))?;

    let is_description = root.get("openapi").is_some() || root.get("swagger").is_some();
    let mut document = if is_description {
        let version = SpecVersion::detect(&root)?;
        read_tree(&root, version, location, diagnostic)?
    } else {
        let map = root
            .as_object()
            .ok_or_else(|| DomError::malformed(format!("{} is not an object", location)))?;
        let mut ctx = ParseContext::new(fallback, diagnostic, location);
        let schema = common::schema(map, &mut ctx);
        let mut document = Document::new();
        document.components.schemas.insert(String::new(), schema.into());
        document
    };
    document.base_uri = Some(location.to_string());
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;

    const PETSTORE: &str = r#"
openapi: 3.0.1
info:
  title: Pets
  version: 1.0.0
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
      properties:
        parent:
          $ref: '#/components/schemas/Pet'
"#;

    #[test]
    fn reads_and_resolves_yaml() {
        let result = load(PETSTORE, ReferenceResolution::Local).unwrap();
        assert_eq!(result.diagnostic.spec_version(), Some(SpecVersion::V3_0));
        assert!(result.diagnostic.errors().is_empty(), "{:?}", result.diagnostic.errors());
        let pet = result.document.components.schemas["Pet"].item().unwrap();
        assert!(pet.properties["parent"].reference().unwrap().is_resolved());
    }

    #[test]
    fn malformed_input_aborts() {
        let err = load("openapi: [3.0", ReferenceResolution::Local).unwrap_err();
        assert!(matches!(err, DomError::MalformedContent(_)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = load("{\"openapi\": \"4.0.0\", \"info\": {}}", ReferenceResolution::Local).unwrap_err();
        assert!(matches!(err, DomError::UnsupportedVersion(_)));
    }

    #[test]
    fn validation_can_be_disabled() {
        let source = "openapi: 3.0.1\ninfo: {}\npaths: {}\n";
        let validated = load(source, ReferenceResolution::Local).unwrap();
        assert!(validated.diagnostic.errors_of(DiagnosticKind::Validation).count() > 0);

        let reader = OpenApiReader::new(ReaderSettings {
            validate: false,
            ..ReaderSettings::default()
        });
        let unvalidated = reader.read_str(source).unwrap();
        assert!(!unvalidated.diagnostic.has_errors());
    }

    #[test]
    fn fragments_become_the_empty_schema_id() {
        let mut diagnostic = Diagnostic::new();
        let document = parse_external(
            b"type: object\nproperties:\n  name:\n    type: string\n",
            "schemas/pet.yaml",
            SpecVersion::V3_0,
            &mut diagnostic,
        )
        .unwrap();
        assert_eq!(document.base_uri.as_deref(), Some("schemas/pet.yaml"));
        assert!(document.components.schemas[""].item().unwrap().is_type("object"));
    }
}
