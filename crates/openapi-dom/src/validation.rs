//! Rule-based checks that run as one visitor over the resolved graph.

use crate::diagnostic::{Diagnostic, DiagnosticError, DiagnosticKind};
use crate::model::{Document, ParameterLocation};
use crate::walker::{walk, Node, Visitor, WalkContext};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One validation rule. Rules see every node the walker announces and may keep
/// state across a walk.
pub trait Rule {
    fn name(&self) -> &'static str;

    fn check(&mut self, node: Node<'_>, ctx: &WalkContext<'_>) -> Option<String>;
}

/// Runs a set of rules over a walk, collecting each distinct finding once.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
    findings: Vec<DiagnosticError>,
    seen: HashSet<(String, String)>,
}

impl Validator {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            rules,
            findings: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn with_default_rules() -> Self {
        Self::new(default_rules())
    }

    pub fn findings(&self) -> &[DiagnosticError] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<DiagnosticError> {
        self.findings
    }
}

impl<'a> Visitor<'a> for Validator {
    fn enter(&mut self, node: Node<'a>, ctx: &WalkContext<'_>) {
        for rule in self.rules.iter_mut() {
            let Some(message) = rule.check(node, ctx) else {
                continue;
            };
            let pointer = ctx.pointer();
            if self.seen.insert((pointer.clone(), message.clone())) {
                debug!("Rule {} failed at {}: {}", rule.name(), pointer, message);
                self.findings
                    .push(DiagnosticError::new(DiagnosticKind::Validation, pointer, message));
            }
        }
    }
}

pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(InfoRequiredFields),
        Box::new(ResponseDescription),
        Box::new(UniqueOperationIds::default()),
        Box::new(PathKeyFormat),
        Box::new(PathParameterRequired),
    ]
}

/// Runs the default rules and appends their findings to `diagnostic`.
pub fn validate(document: &Document, diagnostic: &mut Diagnostic) {
    let mut validator = Validator::with_default_rules();
    walk(document, &mut validator);
    for finding in validator.into_findings() {
        diagnostic.push(finding);
    }
}

pub struct InfoRequiredFields;

impl Rule for InfoRequiredFields {
    fn name(&self) -> &'static str {
        "info-required-fields"
    }

    fn check(&mut self, node: Node<'_>, _ctx: &WalkContext<'_>) -> Option<String> {
        let Node::Info(info) = node else {
            return None;
        };
        match (info.title.is_empty(), info.version.is_empty()) {
            (true, true) => Some("info.title and info.version are required".to_string()),
            (true, false) => Some("info.title is required".to_string()),
            (false, true) => Some("info.version is required".to_string()),
            (false, false) => None,
        }
    }
}

pub struct ResponseDescription;

impl Rule for ResponseDescription {
    fn name(&self) -> &'static str {
        "response-description"
    }

    fn check(&mut self, node: Node<'_>, _ctx: &WalkContext<'_>) -> Option<String> {
        match node {
            Node::Response(response) if response.description.is_none() => {
                Some("response description is required".to_string())
            }
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct UniqueOperationIds {
    first_seen: HashMap<String, String>,
}

impl Rule for UniqueOperationIds {
    fn name(&self) -> &'static str {
        "unique-operation-ids"
    }

    fn check(&mut self, node: Node<'_>, ctx: &WalkContext<'_>) -> Option<String> {
        let Node::Operation(_, operation) = node else {
            return None;
        };
        let id = operation.operation_id.as_ref()?;
        let pointer = ctx.pointer();
        match self.first_seen.get(id) {
            Some(first) if *first != pointer => {
                Some(format!("operationId '{}' is already used at {}", id, first))
            }
            Some(_) => None,
            None => {
                self.first_seen.insert(id.clone(), pointer);
                None
            }
        }
    }
}

pub struct PathKeyFormat;

impl Rule for PathKeyFormat {
    fn name(&self) -> &'static str {
        "path-key-format"
    }

    fn check(&mut self, node: Node<'_>, ctx: &WalkContext<'_>) -> Option<String> {
        let Node::PathItem(_) = node else {
            return None;
        };
        let segments = ctx.segments();
        if segments.len() != 2 || segments[0] != "paths" {
            return None;
        }
        let path = &segments[1];
        (!path.starts_with('/')).then(|| format!("path '{}' must begin with '/'", path))
    }
}

pub struct PathParameterRequired;

impl Rule for PathParameterRequired {
    fn name(&self) -> &'static str {
        "path-parameter-required"
    }

    fn check(&mut self, node: Node<'_>, _ctx: &WalkContext<'_>) -> Option<String> {
        match node {
            Node::Parameter(parameter)
                if parameter.location == Some(ParameterLocation::Path) && !parameter.required =>
            {
                Some(format!("path parameter '{}' must be required", parameter.name))
            }
            _ => None,
        }
    }
}
