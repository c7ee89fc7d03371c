//! Where descriptions come from: local files or http(s) URLs.

use crate::config::HttpConfig;
use crate::error::CliResult;
use openapi_dom::{
    DocumentFetcher, DomError, DomResult, OpenApiReader, ReadResult, ReaderSettings,
    ReferenceResolution,
};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};
use url::Url;

/// A description source given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Http(Url),
    File(PathBuf),
}

impl Source {
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Http(url),
            _ => Source::File(PathBuf::from(raw)),
        }
    }

    /// `true` for a local file with a `.json` extension.
    pub fn is_local_json(&self) -> bool {
        match self {
            Source::File(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json")),
            Source::Http(_) => false,
        }
    }

    pub fn location(&self) -> String {
        match self {
            Source::Http(url) => url.to_string(),
            Source::File(path) => path.to_string_lossy().replace('\\', "/"),
        }
    }
}

/// Fetches documents over http(s) or from the filesystem.
///
/// `fetch` blocks on the runtime it was created in, so it must be called from a
/// blocking thread, never from inside an async task.
#[derive(Clone)]
pub struct SourceFetcher {
    client: Client,
    runtime: Handle,
}

impl SourceFetcher {
    pub fn new(config: &HttpConfig) -> CliResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()?;
        Ok(Self {
            client,
            runtime: Handle::current(),
        })
    }

    pub async fn get(&self, url: &str) -> DomResult<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomError::fetch(url, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DomError::fetch(url, format!("HTTP {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DomError::fetch(url, e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl DocumentFetcher for SourceFetcher {
    fn fetch(&self, location: &str) -> DomResult<Vec<u8>> {
        match Source::parse(location) {
            Source::Http(url) => self.runtime.block_on(self.get(url.as_str())),
            Source::File(path) => std::fs::read(&path)
                .map_err(|e| DomError::fetch(location, e.to_string())),
        }
    }
}

/// Reads and resolves a description; runs the load on a blocking thread.
pub async fn load_source(
    source: &Source,
    resolve_external: bool,
    http: &HttpConfig,
) -> CliResult<ReadResult> {
    let fetcher = SourceFetcher::new(http)?;
    let bytes = match source {
        Source::Http(url) => fetcher.get(url.as_str()).await?,
        Source::File(path) => tokio::fs::read(path)
            .await
            .map_err(|e| DomError::fetch(source.location(), e.to_string()))?,
    };
    info!("Read {} bytes from {}", bytes.len(), source.location());

    let resolution = if resolve_external {
        ReferenceResolution::All
    } else {
        ReferenceResolution::Local
    };
    let reader = OpenApiReader::new(ReaderSettings {
        resolution,
        base_location: Some(source.location()),
        ..ReaderSettings::default()
    })
    .with_fetcher(Arc::new(fetcher));

    let result = tokio::task::spawn_blocking(move || reader.read(&bytes)).await??;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_urls_or_paths() {
        assert!(matches!(
            Source::parse("https://example.com/openapi.yaml"),
            Source::Http(_)
        ));
        assert_eq!(
            Source::parse("specs/petstore.json"),
            Source::File(PathBuf::from("specs/petstore.json"))
        );
        assert!(matches!(Source::parse("C:/specs/api.yaml"), Source::File(_)));
        assert!(Source::parse("specs/petstore.JSON").is_local_json());
        assert!(!Source::parse("https://example.com/openapi.json").is_local_json());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_external_references_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("root.yaml"),
            "openapi: 3.0.1\ninfo: {title: t, version: '1'}\npaths: {}\ncomponents:\n  schemas:\n    Pet:\n      $ref: 'pet.yaml'\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("pet.yaml"), "type: object\n").unwrap();

        let source = Source::File(dir.path().join("root.yaml"));
        let result = load_source(&source, true, &HttpConfig::default()).await.unwrap();
        assert!(!result.diagnostic.has_errors(), "{:?}", result.diagnostic.errors());
        assert_eq!(result.document.external_documents.len(), 1);
    }
}
