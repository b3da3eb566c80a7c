// src/services/search.rs

//! Search provider boundary and the SerpAPI implementation.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CandidateResult, ResultBatch, SerpApiSettings};
use crate::utils::http;

/// Region every search is localized to.
pub const SEARCH_LOCATION: &str = "United Kingdom";

/// Results requested per search.
pub const RESULT_COUNT: u32 = 10;

/// SerpAPI reports an empty result page through its error field.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

/// Something that can answer a search query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search. An empty batch is a valid answer, not an error.
    async fn search(&self, query: &str) -> Result<ResultBatch>;
}

/// Google search through SerpAPI.
pub struct SerpApiSearcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Option<Vec<OrganicResult>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl SerpApiSearcher {
    /// Create a searcher with an existing client.
    pub fn new(client: reqwest::Client, settings: &SerpApiSettings) -> Self {
        Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    /// Create a searcher with its own configured client.
    pub fn from_settings(settings: &SerpApiSettings) -> Result<Self> {
        Ok(Self::new(http::create_async_client(settings)?, settings))
    }

    /// Full request URL for a query.
    fn request_url(&self, query: &str) -> Result<Url> {
        let num = RESULT_COUNT.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            [
                ("engine", "google"),
                ("q", query),
                ("location", SEARCH_LOCATION),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ],
        )?;
        Ok(url)
    }
}

/// Decode a SerpAPI response body into a result batch.
///
/// Entries without a link are dropped since they cannot be deduplicated.
pub fn parse_response(body: &[u8]) -> Result<ResultBatch> {
    let response: SerpResponse = serde_json::from_slice(body)
        .map_err(|e| AppError::provider(format!("malformed response: {e}")))?;

    if let Some(error) = response.error {
        if error.contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(AppError::provider(error));
    }

    let batch = response
        .organic_results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|r| match r.link.filter(|l| !l.trim().is_empty()) {
            Some(link) => Some(CandidateResult::new(link, r.title, r.snippet)),
            None => {
                log::debug!("Dropping result without link: {:?}", r.title);
                None
            }
        })
        .collect();

    Ok(batch)
}

#[async_trait]
impl SearchProvider for SerpApiSearcher {
    async fn search(&self, query: &str) -> Result<ResultBatch> {
        log::info!("Searching for {query:?} in {SEARCH_LOCATION}");

        let url = self.request_url(query)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::provider(e.without_url()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::provider(e.without_url()))?;

        if !status.is_success() {
            // Prefer the provider's own explanation when it sent one.
            return match parse_response(&body) {
                Err(AppError::Provider(message)) if !message.starts_with("malformed") => {
                    Err(AppError::provider(format!("{status}: {message}")))
                }
                _ => Err(AppError::provider(format!("search request failed with {status}"))),
            };
        }

        let batch = parse_response(&body)?;
        log::info!("Search returned {} results", batch.len());
        Ok(batch)
    }
}
