//! Prismic REST API v2 client over blocking `reqwest`.
//!
//! Fetching documents takes two steps:
//!
//! 1. `GET {endpoint}` returns the repository description; its `refs` array
//!    holds the master ref (`isMasterRef: true`).
//! 2. `GET {endpoint}/documents/search?ref=..&q=[[at(document.type,"..")]]&page=N`
//!    is repeated until `page == total_pages`.
//!
//! Source images are fetched directly from their CDN URLs.

use super::{ContentSource, FetchError};
use crate::config::ContentConfig;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info};

pub struct HttpContentSource {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    lang: String,
    page_size: u32,
    master_ref: OnceLock<String>,
}

impl HttpContentSource {
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        content: &ContentConfig,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(content.timeout)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
            lang: content.lang.clone(),
            page_size: content.page_size,
            master_ref: OnceLock::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| FetchError::Transport(format!("request to {url} failed: {e}")))?;
        check_status(url, response)
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        self.get(url, query)?
            .json::<Value>()
            .map_err(|e| FetchError::Decode(format!("{url}: {e}")))
    }

    fn token_query(&self) -> Vec<(&'static str, String)> {
        self.access_token
            .iter()
            .map(|t| ("access_token", t.clone()))
            .collect()
    }

    fn master_ref(&self) -> Result<String, FetchError> {
        if let Some(r) = self.master_ref.get() {
            return Ok(r.clone());
        }
        let api = self.get_json(&self.endpoint, &self.token_query())?;
        let master = master_ref_from_api(&api).ok_or_else(|| {
            FetchError::Decode(format!("{} has no master ref", self.endpoint))
        })?;
        debug!(master_ref = %master, "resolved master ref");
        Ok(self.master_ref.get_or_init(|| master).clone())
    }
}

impl ContentSource for HttpContentSource {
    fn documents(&self, doc_type: &str) -> Result<Vec<Value>, FetchError> {
        let master = self.master_ref()?;
        let url = format!("{}/documents/search", self.endpoint);
        let mut documents = Vec::new();
        let mut page = 1u64;

        loop {
            let mut query = vec![
                ("ref", master.clone()),
                ("q", type_predicate(doc_type)),
                ("lang", self.lang.clone()),
                ("pageSize", self.page_size.to_string()),
                ("page", page.to_string()),
            ];
            query.extend(self.token_query());

            let body = self.get_json(&url, &query)?;
            let (results, total_pages) = parse_search_page(&body)
                .ok_or_else(|| FetchError::Decode(format!("{url}: unexpected search response")))?;
            documents.extend(results);

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        info!(doc_type, count = documents.len(), "fetched documents");
        Ok(documents)
    }

    fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let body = self
            .get(url, &[])?
            .bytes()
            .map_err(|e| FetchError::Transport(format!("reading {url} failed: {e}")))?;
        Ok(body.to_vec())
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Predicate query selecting every document of one type.
fn type_predicate(doc_type: &str) -> String {
    format!("[[at(document.type,\"{doc_type}\")]]")
}

/// The `ref` of the master ref in an API description.
fn master_ref_from_api(api: &Value) -> Option<String> {
    api.get("refs")?
        .as_array()?
        .iter()
        .find(|r| r.get("isMasterRef").and_then(Value::as_bool) == Some(true))?
        .get("ref")?
        .as_str()
        .map(String::from)
}

/// Results and page count of one search response.
fn parse_search_page(body: &Value) -> Option<(Vec<Value>, u64)> {
    let results = body.get("results")?.as_array()?.clone();
    let total_pages = body.get("total_pages").and_then(Value::as_u64).unwrap_or(1);
    Some((results, total_pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn predicate_quotes_type() {
        assert_eq!(
            type_predicate("image_asset"),
            r#"[[at(document.type,"image_asset")]]"#
        );
    }

    #[test]
    fn finds_master_ref() {
        let api = json!({
            "refs": [
                { "id": "preview", "ref": "P1", "isMasterRef": false },
                { "id": "master", "ref": "M1", "isMasterRef": true }
            ]
        });
        assert_eq!(master_ref_from_api(&api), Some("M1".into()));
    }

    #[test]
    fn missing_master_ref() {
        assert_eq!(master_ref_from_api(&json!({ "refs": [] })), None);
        assert_eq!(master_ref_from_api(&json!({})), None);
    }

    #[test]
    fn parses_search_page() {
        let body = json!({ "page": 1, "total_pages": 3, "results": [{ "id": "a" }, { "id": "b" }] });
        let (results, total) = parse_search_page(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(total, 3);
    }

    #[test]
    fn search_page_without_results_is_malformed() {
        assert!(parse_search_page(&json!({ "total_pages": 1 })).is_none());
        let (results, total) = parse_search_page(&json!({ "results": [] })).unwrap();
        assert!(results.is_empty());
        assert_eq!(total, 1);
    }

    #[test]
    fn endpoint_is_trimmed() {
        let source =
            HttpContentSource::new("https://repo.cdn.prismic.io/api/v2/", None, &ContentConfig::default())
                .unwrap();
        assert_eq!(source.endpoint(), "https://repo.cdn.prismic.io/api/v2");
    }
}
