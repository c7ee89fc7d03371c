//! Postman collections as operation selectors.

use crate::error::{CliError, CliResult};
use openapi_dom::RequestCollection;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PostmanCollection {
    info: Option<PostmanInfo>,
    #[serde(default)]
    item: Vec<PostmanItem>,
}

#[derive(Debug, Deserialize)]
struct PostmanInfo {
    name: Option<String>,
}

/// A request, or a folder of further items.
#[derive(Debug, Deserialize)]
struct PostmanItem {
    #[serde(default)]
    item: Vec<PostmanItem>,
    request: Option<PostmanRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostmanRequest {
    Url(String),
    Full {
        url: Option<PostmanUrl>,
        method: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostmanUrl {
    Raw(String),
    Object { raw: Option<String> },
}

/// Parses collection JSON into `url -> methods`. `fallback_name` names the
/// collection when `info.name` is absent.
pub fn parse_collection(json: &str, fallback_name: &str) -> CliResult<RequestCollection> {
    let parsed: PostmanCollection = serde_json::from_str(json)?;
    let name = parsed
        .info
        .and_then(|info| info.name)
        .unwrap_or_else(|| fallback_name.to_string());
    let mut collection = RequestCollection::new(name);
    collect(&parsed.item, &mut collection);
    if collection.requests.is_empty() {
        return Err(CliError::InvalidArgument(format!(
            "Postman collection '{}' contains no requests",
            collection.name
        )));
    }
    Ok(collection)
}

pub fn load_collection(path: &Path) -> CliResult<RequestCollection> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let json = std::fs::read_to_string(path)?;
    let fallback = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_collection(&json, &fallback)
}

fn collect(items: &[PostmanItem], collection: &mut RequestCollection) {
    for item in items {
        collect(&item.item, collection);
        let (url, method) = match &item.request {
            Some(PostmanRequest::Url(url)) => (Some(url.clone()), None),
            Some(PostmanRequest::Full { url, method }) => {
                let url = match url {
                    Some(PostmanUrl::Raw(raw)) => Some(raw.clone()),
                    Some(PostmanUrl::Object { raw }) => raw.clone(),
                    None => None,
                };
                (url, method.clone())
            }
            None => continue,
        };
        if let Some(url) = url {
            collection.add(url, method.unwrap_or_else(|| "GET".to_string()));
        }
    }
}
