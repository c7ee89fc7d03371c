//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use openapi_dom::{Format, SpecVersion};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "oadom",
    about = "Transform, filter and validate OpenAPI descriptions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML, or YAML by extension)
    #[arg(long, global = true, env = "OADOM_CONFIG", help = "Path to a configuration file")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a description to another dialect or format, optionally filtered
    Transform(TransformArgs),

    /// Report diagnostics and statistics for a description
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// File path or http(s) URL of the description
    #[arg(short = 'd', long = "openapi", help = "Input description (path or URL)")]
    pub openapi: String,

    /// Fetch and resolve references into other documents
    #[arg(long, help = "Resolve references into external documents")]
    pub resolve_external: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file; standard output when omitted
    #[arg(short, long, help = "Output file path")]
    pub output: Option<PathBuf>,

    /// Target dialect; defaults to the dialect of the input
    #[arg(short = 'v', long, value_parser = parse_spec_version, help = "Target version: 2.0, 3.0 or 3.1")]
    pub spec_version: Option<SpecVersion>,

    /// Output format; defaults to JSON for local .json inputs, YAML otherwise
    #[arg(short, long, value_parser = parse_format, help = "Output format: json or yaml")]
    pub format: Option<Format>,

    /// Comma-separated operation ids, or `*` for all
    #[arg(long = "filter-by-operationids", help = "Keep only these operation ids")]
    pub filter_by_operation_ids: Option<String>,

    /// Comma-separated tags; a single tag is a regular expression
    #[arg(long = "filter-by-tags", help = "Keep only operations with these tags")]
    pub filter_by_tags: Option<String>,

    /// Postman collection whose requests select the operations
    #[arg(long = "filter-by-collection", help = "Keep only operations used by a Postman collection")]
    pub filter_by_collection: Option<PathBuf>,

    /// Inline local references
    #[arg(long, help = "Inline local references in the output")]
    pub inline: bool,
}

impl TransformArgs {
    pub fn has_filter(&self) -> bool {
        self.filter_by_operation_ids.is_some()
            || self.filter_by_tags.is_some()
            || self.filter_by_collection.is_some()
    }
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

fn parse_spec_version(raw: &str) -> Result<SpecVersion, String> {
    raw.parse::<SpecVersion>().map_err(|e| e.to_string())
}

fn parse_format(raw: &str) -> Result<Format, String> {
    raw.parse::<Format>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_flags_parse() {
        let cli = Cli::try_parse_from([
            "oadom",
            "transform",
            "-d",
            "petstore.yaml",
            "-o",
            "out.json",
            "-v",
            "2.0",
            "-f",
            "json",
            "--filter-by-tags",
            "pets",
            "--inline",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Transform(args) = cli.command else {
            panic!("Expected Transform command");
        };
        assert_eq!(args.source.openapi, "petstore.yaml");
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
        assert_eq!(args.spec_version, Some(SpecVersion::V2_0));
        assert_eq!(args.format, Some(Format::Json));
        assert_eq!(args.filter_by_tags.as_deref(), Some("pets"));
        assert!(args.inline);
        assert!(!args.source.resolve_external);
        assert!(args.has_filter());
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let result = Cli::try_parse_from(["oadom", "transform", "-d", "a.yaml", "-v", "4.0"]);
        assert!(result.is_err());
    }

    #[test]
    fn validate_takes_a_source() {
        let cli = Cli::try_parse_from([
            "oadom",
            "validate",
            "--openapi",
            "https://example.com/openapi.json",
            "--resolve-external",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("Expected Validate command");
        };
        assert!(args.source.resolve_external);
    }
}
