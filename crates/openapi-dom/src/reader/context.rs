use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::format::SpecVersion;
use crate::model::escape_segment;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// State threaded through one parse: the dialect, the current JSON pointer and
/// the diagnostic collecting structural findings.
pub(crate) struct ParseContext<'d> {
    pub version: SpecVersion,
    diagnostic: &'d mut Diagnostic,
    segments: Vec<String>,
    prefix: String,
    /// 2.0: names of top-level parameters declared `in: body`.
    pub body_parameters: HashSet<String>,
    /// 2.0: raw top-level parameters declared `in: formData`.
    pub form_parameters: HashMap<String, Value>,
    /// 2.0: document-wide `consumes` / `produces`.
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
}

impl<'d> ParseContext<'d> {
    /// `prefix` is prepended to every pointer, so findings in external
    /// documents name the document they came from.
    pub fn new(version: SpecVersion, diagnostic: &'d mut Diagnostic, prefix: impl Into<String>) -> Self {
        Self {
            version,
            diagnostic,
            segments: Vec::new(),
            prefix: prefix.into(),
            body_parameters: HashSet::new(),
            form_parameters: HashMap::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
        }
    }

    pub fn is_v31(&self) -> bool {
        self.version == SpecVersion::V3_1
    }

    pub fn at<T>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.segments.push(segment.to_string());
        let result = f(self);
        self.segments.pop();
        result
    }

    pub fn pointer(&self) -> String {
        let mut pointer = format!("{}#", self.prefix);
        for segment in &self.segments {
            pointer.push('/');
            pointer.push_str(&escape_segment(segment));
        }
        pointer
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let pointer = self.pointer();
        self.diagnostic.error(DiagnosticKind::Validation, pointer, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let pointer = self.pointer();
        self.diagnostic.warning(DiagnosticKind::Validation, pointer, message);
    }
}
