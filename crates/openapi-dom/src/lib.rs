//! Document object model for OpenAPI 2.0, 3.0 and 3.1 descriptions.
//!
//! bytes → [`reader`] → resolved [`Document`] → [`walker`] visitors (validation,
//! statistics, filtering) → [`writer`] text in any dialect.

pub mod diagnostic;
pub mod error;
pub mod filter;
pub mod format;
pub mod hash;
pub mod model;
pub mod reader;
pub mod stats;
pub mod validation;
pub mod walker;
pub mod workspace;
pub mod writer;

// Re-export commonly used types
pub use diagnostic::{Diagnostic, DiagnosticError, DiagnosticKind};
pub use error::{DomError, DomResult};
pub use filter::{create_filtered_document, create_predicate, FilterCriteria, Predicate, RequestCollection};
pub use format::{Format, SpecVersion};
pub use hash::canonical_hash;
pub use model::*;
pub use reader::{load, OpenApiReader, ReadResult, ReaderSettings};
pub use stats::StatsVisitor;
pub use validation::{validate, Rule, Validator};
pub use walker::{walk, ComponentKey, Node, VisitedSet, Visitor, Visitors, WalkContext, Walker};
pub use workspace::{resolve, DocumentFetcher, MemoryFetcher, ReferenceResolution, Workspace};
pub use writer::{serialize, to_text, to_value, DialectTable, InlinePolicy, WriterSettings};
