//! Error types shared by every stage of the pipeline.
//!
//! Load-phase findings (structural problems, spec-rule violations, references
//! that could not be resolved under partial resolution) are never raised as
//! errors; they are collected into a [`Diagnostic`](crate::Diagnostic). The
//! variants below are fatal and stop the operation that produced them.

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    /// Input is not well-formed JSON or YAML.
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    /// The `openapi` / `swagger` discriminator is missing or names a version we cannot read.
    #[error("Unsupported specification version: {0}")]
    UnsupportedVersion(String),

    /// A reference target is missing after full resolution.
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// External retrieval failed; distinct from malformed content so callers can retry transport.
    #[error("Failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },

    /// Conflicting or empty filter selectors, or collection entries with no matching operation.
    #[error("Filter configuration error: {0}")]
    FilterConfiguration(String),

    /// Output destination already exists.
    #[error("Output conflict: {0}")]
    OutputConflict(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for DomError {
    fn from(err: std::io::Error) -> Self {
        DomError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DomError {
    fn from(err: serde_json::Error) -> Self {
        DomError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomError {
    fn from(err: serde_yaml::Error) -> Self {
        DomError::Serialization(err.to_string())
    }
}

/// Result type alias for convenience
pub type DomResult<T> = std::result::Result<T, DomError>;

impl DomError {
    /// Shortcut method to create a malformed content error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        DomError::MalformedContent(msg.into())
    }

    /// Shortcut method to create an unsupported version error
    pub fn unsupported_version<S: Into<String>>(msg: S) -> Self {
        DomError::UnsupportedVersion(msg.into())
    }

    /// Shortcut method to create an unresolved reference error
    pub fn unresolved<S: Into<String>>(msg: S) -> Self {
        DomError::UnresolvedReference(msg.into())
    }

    /// Shortcut method to create a fetch error
    pub fn fetch<L: Into<String>, S: Into<String>>(location: L, msg: S) -> Self {
        DomError::Fetch {
            location: location.into(),
            message: msg.into(),
        }
    }

    /// Shortcut method to create a filter configuration error
    pub fn filter_config<S: Into<String>>(msg: S) -> Self {
        DomError::FilterConfiguration(msg.into())
    }

    /// Shortcut method to create an output conflict error
    pub fn output_conflict<S: Into<String>>(msg: S) -> Self {
        DomError::OutputConflict(msg.into())
    }

    /// True for errors caused by transport rather than document content.
    pub fn is_fetch(&self) -> bool {
        matches!(self, DomError::Fetch { .. })
    }
}
