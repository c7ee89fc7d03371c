use crate::format::SpecVersion;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Structural or rule violation found while reading or validating.
    Validation,
    /// A reference target that could not be found.
    UnresolvedReference,
    /// An external document that could not be retrieved.
    Fetch,
}

/// One finding, located by a JSON pointer into the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticError {
    pub kind: DiagnosticKind,
    pub pointer: String,
    pub message: String,
}

impl DiagnosticError {
    pub fn new(kind: DiagnosticKind, pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} [{}]", self.message, self.pointer)
        }
    }
}

/// Findings of one load, plus the dialect the input was written in.
///
/// Only the reader, resolver and validator append; callers get a read-only view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostic {
    spec_version: Option<SpecVersion>,
    errors: Vec<DiagnosticError>,
    warnings: Vec<DiagnosticError>,
}

impl Diagnostic {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn spec_version(&self) -> Option<SpecVersion> {
        self.spec_version
    }

    pub fn errors(&self) -> &[DiagnosticError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[DiagnosticError] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &DiagnosticError> {
        self.errors.iter().filter(move |error| error.kind == kind)
    }

    pub(crate) fn set_spec_version(&mut self, version: SpecVersion) {
        self.spec_version = Some(version);
    }

    pub(crate) fn error(&mut self, kind: DiagnosticKind, pointer: impl Into<String>, message: impl Into<String>) {
        self.errors.push(DiagnosticError::new(kind, pointer, message));
    }

    pub(crate) fn warning(&mut self, kind: DiagnosticKind, pointer: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(DiagnosticError::new(kind, pointer, message));
    }

    pub(crate) fn push(&mut self, error: DiagnosticError) {
        self.errors.push(error);
    }
}
