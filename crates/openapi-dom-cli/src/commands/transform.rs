//! Dialect and format conversion, with optional operation filtering

use crate::{
    cli::TransformArgs,
    collection::load_collection,
    config::CliConfig,
    error::{CliError, CliResult},
    source::{load_source, Source},
    utils::{write_output, ColoredOutput},
};
use openapi_dom::{
    create_filtered_document, create_predicate, serialize, Document, DomError, FilterCriteria,
    Format, InlinePolicy, ReadResult, SpecVersion,
};
use tracing::info;

pub struct TransformCommand;

impl TransformCommand {
    pub async fn run(args: &TransformArgs, config: &CliConfig) -> CliResult<()> {
        if let Some(output) = &args.output {
            if output.exists() {
                return Err(DomError::output_conflict(format!(
                    "The file {} already exists. Please input a new file path.",
                    output.display()
                ))
                .into());
            }
        }

        let source = Source::parse(&args.source.openapi);
        let loaded = load_source(&source, args.source.resolve_external, &config.http).await?;
        ensure_loadable(&loaded)?;
        let detected = loaded.diagnostic.spec_version().unwrap_or(SpecVersion::V3_0);

        let document = if args.has_filter() {
            filter(&loaded.document, args)?
        } else {
            loaded.document
        };

        let version = args.spec_version.unwrap_or(detected);
        let format = match args.format {
            Some(format) => format,
            None => config.output_format()?.unwrap_or(if source.is_local_json() {
                Format::Json
            } else {
                Format::Yaml
            }),
        };
        let inline = if args.inline {
            InlinePolicy::InlineLocal
        } else {
            InlinePolicy::KeepReferences
        };
        info!("Writing {} {} ({:?})", version, format.display_name(), inline);
        let text = serialize(&document, version, format, inline)?;

        match &args.output {
            Some(output) => {
                write_output(output, &text)?;
                eprintln!("{}", ColoredOutput::success("✓ Transform completed"));
                eprintln!(
                    "Output file: {}",
                    ColoredOutput::highlight(&output.display().to_string())
                );
                eprintln!(
                    "  {} operations, OpenAPI {} as {}",
                    document.operations().count(),
                    version,
                    format.display_name()
                );
            }
            None => print!("{}", text),
        }
        Ok(())
    }
}

/// Fails with every error message of the load joined, when there are any.
pub fn ensure_loadable(loaded: &ReadResult) -> CliResult<()> {
    if !loaded.diagnostic.has_errors() {
        return Ok(());
    }
    let messages: Vec<String> = loaded
        .diagnostic
        .errors()
        .iter()
        .map(ToString::to_string)
        .collect();
    Err(CliError::InvalidDocument(messages.join("\n")))
}

fn filter(document: &Document, args: &TransformArgs) -> CliResult<Document> {
    let mut criteria = FilterCriteria::default();
    if let Some(ids) = &args.filter_by_operation_ids {
        criteria = criteria.operation_ids(ids);
    }
    if let Some(tags) = &args.filter_by_tags {
        criteria = criteria.tags(tags);
    }
    if let Some(path) = &args.filter_by_collection {
        criteria = criteria.collection(load_collection(path)?);
    }
    let predicate = create_predicate(&criteria, document)?;
    Ok(create_filtered_document(document, &predicate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SourceArgs;
    use std::path::PathBuf;

    fn args(openapi: PathBuf, output: Option<PathBuf>) -> TransformArgs {
        TransformArgs {
            source: SourceArgs {
                openapi: openapi.to_string_lossy().into_owned(),
                resolve_external: false,
            },
            output,
            spec_version: None,
            format: None,
            filter_by_operation_ids: None,
            filter_by_tags: None,
            filter_by_collection: None,
            inline: false,
        }
    }

    #[tokio::test]
    async fn errors_in_the_document_abort_the_transform() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.yaml");
        std::fs::write(&input, "openapi: 3.0.1\ninfo: {}\n").unwrap();
        let output = dir.path().join("out.yaml");

        let err = TransformCommand::run(&args(input, Some(output.clone())), &CliConfig::default())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("The document has errors"), "{}", message);
        assert!(message.contains("paths is required"), "{}", message);
        assert!(!output.exists());
    }
}
