use crate::error::{DomError, DomResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported text formats
///
/// Defines the serialization formats a description can be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl Format {
    /// Infers the format from a file extension
    ///
    /// # Arguments
    /// * `extension` - The file extension (e.g., "json", "yaml", "yml")
    ///
    /// # Returns
    /// The corresponding format, or None if unrecognized
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    /// Infers the format from the extension of a path or URL, ignoring any query or fragment.
    pub fn from_location(location: &str) -> Option<Self> {
        let trimmed = location
            .split(['?', '#'])
            .next()
            .unwrap_or(location);
        Path::new(trimmed)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Gets the display name of the format
    pub fn display_name(&self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
        }
    }

    /// Detects the format using heuristics
    ///
    /// Infers the most likely format based on content characteristics. YAML is a
    /// superset of JSON, so anything that does not look like a JSON document is
    /// handed to the YAML parser.
    pub fn detect_from_content(source: &str) -> Self {
        let source = source.trim_start_matches('\u{feff}').trim();

        // Obvious JSON characteristics
        if source.starts_with('{') || source.starts_with('[') {
            return Format::Json;
        }

        Format::Yaml
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("json"),
            Format::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for Format {
    type Err = DomError;

    fn from_str(s: &str) -> DomResult<Self> {
        Format::from_extension(s).ok_or_else(|| {
            DomError::Serialization(format!("unknown format '{}', expected json or yaml", s))
        })
    }
}

/// The three wire dialects of the description format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpecVersion {
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "3.0")]
    V3_0,
    #[serde(rename = "3.1")]
    V3_1,
}

impl SpecVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecVersion::V2_0 => "2.0",
            SpecVersion::V3_0 => "3.0",
            SpecVersion::V3_1 => "3.1",
        }
    }

    /// Maps a version discriminator string such as `2.0`, `3.0.3` or `3.1.0`.
    pub fn from_discriminator(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "2" || raw == "2.0" {
            return Some(SpecVersion::V2_0);
        }
        if raw == "3" || raw == "3.0" || raw.starts_with("3.0.") {
            return Some(SpecVersion::V3_0);
        }
        if raw == "3.1" || raw.starts_with("3.1.") {
            return Some(SpecVersion::V3_1);
        }
        None
    }

    /// Detects the dialect from the root of a parsed document.
    ///
    /// YAML documents frequently carry the discriminator as a bare number
    /// (`swagger: 2.0`), so numbers are accepted as well as strings.
    pub fn detect(root: &Value) -> DomResult<Self> {
        let discriminator = |key: &str| -> Option<String> {
            match root.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };

        if let Some(raw) = discriminator("swagger") {
            return match SpecVersion::from_discriminator(&raw) {
                Some(SpecVersion::V2_0) => Ok(SpecVersion::V2_0),
                _ => Err(DomError::unsupported_version(format!("swagger: {}", raw))),
            };
        }
        if let Some(raw) = discriminator("openapi") {
            return match SpecVersion::from_discriminator(&raw) {
                Some(version @ (SpecVersion::V3_0 | SpecVersion::V3_1)) => Ok(version),
                _ => Err(DomError::unsupported_version(format!("openapi: {}", raw))),
            };
        }
        Err(DomError::unsupported_version(
            "document has neither an 'openapi' nor a 'swagger' field",
        ))
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecVersion {
    type Err = DomError;

    fn from_str(s: &str) -> DomResult<Self> {
        SpecVersion::from_discriminator(s.trim_start_matches(['v', 'V']))
            .ok_or_else(|| DomError::unsupported_version(s.to_string()))
    }
}
