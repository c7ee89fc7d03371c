use crate::walker::{Node, Visitor, WalkContext};
use serde::Serialize;
use std::fmt::Write;

/// Counts node occurrences during a walk.
///
/// Shared schemas are counted once per arrival, so a component used from three
/// places contributes three schema visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsVisitor {
    pub path_items: usize,
    pub operations: usize,
    pub parameters: usize,
    pub request_bodies: usize,
    pub responses: usize,
    pub media_types: usize,
    pub headers: usize,
    pub schemas: usize,
    pub references: usize,
    pub security_requirements: usize,
}

impl StatsVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain text summary, one count per line.
    pub fn report(&self) -> String {
        let rows = [
            ("Path Items", self.path_items),
            ("Operations", self.operations),
            ("Parameters", self.parameters),
            ("Request Bodies", self.request_bodies),
            ("Responses", self.responses),
            ("Media Types", self.media_types),
            ("Headers", self.headers),
            ("Schemas", self.schemas),
            ("References", self.references),
            ("Security Requirements", self.security_requirements),
        ];
        let mut report = String::from("==============================\n");
        for (label, count) in rows {
            let _ = writeln!(report, "{:<22} {}", format!("{}:", label), count);
        }
        report
    }
}

impl<'a> Visitor<'a> for StatsVisitor {
    fn enter(&mut self, node: Node<'a>, _ctx: &WalkContext<'_>) {
        match node {
            Node::PathItem(_) => self.path_items += 1,
            Node::Operation(..) => self.operations += 1,
            Node::Parameter(_) => self.parameters += 1,
            Node::RequestBody(_) => self.request_bodies += 1,
            Node::Response(_) => self.responses += 1,
            Node::MediaType(_) => self.media_types += 1,
            Node::Header(_) => self.headers += 1,
            Node::Schema(_) => self.schemas += 1,
            Node::Reference(_) => self.references += 1,
            Node::SecurityRequirement(_) => self.security_requirements += 1,
            Node::Document(_)
            | Node::Info(_)
            | Node::Server(_)
            | Node::Tag(_)
            | Node::Components(_)
            | Node::SecurityScheme(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::load;
    use crate::walker::walk;
    use crate::workspace::ReferenceResolution;

    const PETS: &str = r#"
openapi: 3.0.1
info: {title: Pets, version: '1'}
paths:
  /pets:
    get:
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
"#;

    #[test]
    fn counts_every_arrival() {
        let result = load(PETS, ReferenceResolution::Local).unwrap();
        let mut stats = StatsVisitor::new();
        walk(&result.document, &mut stats);
        assert_eq!(stats.path_items, 1);
        assert_eq!(stats.operations, 1);
        assert_eq!(stats.parameters, 1);
        assert_eq!(stats.responses, 1);
        assert_eq!(stats.media_types, 1);
        assert_eq!(stats.references, 1);
        // limit, the array, Pet through the reference, Pet as a component
        assert_eq!(stats.schemas, 4);
    }

    #[test]
    fn report_and_json() {
        let stats = StatsVisitor {
            operations: 3,
            ..Default::default()
        };
        assert!(stats.report().contains("Operations:            3"));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["operations"], 3);
        assert_eq!(json["requestBodies"], 0);
    }
}
