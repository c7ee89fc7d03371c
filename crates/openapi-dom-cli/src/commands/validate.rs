//! Diagnostics and node statistics for a description

use crate::{
    cli::ValidateArgs,
    config::CliConfig,
    error::CliResult,
    source::{load_source, Source},
    utils::ColoredOutput,
};
use openapi_dom::{walk, Diagnostic, ReadResult, StatsVisitor};
use tracing::info;

pub struct ValidateCommand;

impl ValidateCommand {
    /// Findings are reported, never turned into a failure.
    pub async fn run(args: &ValidateArgs, config: &CliConfig) -> CliResult<()> {
        let source = Source::parse(&args.source.openapi);
        let loaded = load_source(&source, args.source.resolve_external, &config.http).await?;
        info!(
            "Loaded {} with {} errors and {} warnings",
            source.location(),
            loaded.diagnostic.errors().len(),
            loaded.diagnostic.warnings().len()
        );
        println!("{}", render(&loaded));
        Ok(())
    }
}

fn render(loaded: &ReadResult) -> String {
    let mut out = String::new();
    push_findings(&mut out, &loaded.diagnostic);

    let mut stats = StatsVisitor::new();
    walk(&loaded.document, &mut stats);
    out.push_str(&stats.report());
    out
}

fn push_findings(out: &mut String, diagnostic: &Diagnostic) {
    if let Some(version) = diagnostic.spec_version() {
        out.push_str(&format!("OpenAPI {}\n", ColoredOutput::highlight(version.as_str())));
    }
    if diagnostic.errors().is_empty() && diagnostic.warnings().is_empty() {
        out.push_str(&format!("{}\n", ColoredOutput::success("✓ No problems found")));
        return;
    }
    for error in diagnostic.errors() {
        out.push_str(&format!("{} {}\n", ColoredOutput::error("error:"), error));
    }
    for warning in diagnostic.warnings() {
        out.push_str(&format!("{} {}\n", ColoredOutput::warning("warning:"), warning));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapi_dom::{load, ReferenceResolution};

    #[test]
    fn findings_and_counts_are_rendered() {
        colored::control::set_override(false);
        let loaded = load(
            "openapi: 3.0.1\ninfo: {title: t, version: '1'}\npaths:\n  pets:\n    get:\n      responses:\n        '200': {description: ok}\n",
            ReferenceResolution::Local,
        )
        .unwrap();
        let text = render(&loaded);
        assert!(text.contains("OpenAPI 3.0"), "{}", text);
        assert!(text.contains("error: path 'pets' must begin with '/'"), "{}", text);
        assert!(text.contains("Operations:"), "{}", text);
    }
}
