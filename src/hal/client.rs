use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use urlencoding::encode;

use super::{CandidateRecord, RefQuery, RETURN_FIELDS};
use crate::error::DirectoryError;
use crate::AuthorName;

/// Seam between the resolution engine and the reference directory. The
/// pipeline and resolver are generic over this, so tests substitute scripted
/// doubles and count calls.
#[allow(async_fn_in_trait)]
pub trait DirectoryClient {
    /// Search structure entries matching the query. An empty vec is a valid
    /// "nothing found" answer, not an error.
    async fn search_structures(
        &self,
        query: &RefQuery,
    ) -> Result<Vec<CandidateRecord>, DirectoryError>;

    /// Number of prior records where the author appears under the given
    /// structure id.
    async fn author_published_at(
        &self,
        structure_id: &str,
        author: &AuthorName,
    ) -> Result<u64, DirectoryError>;
}

#[derive(Debug, Deserialize)]
struct HalEnvelope<T> {
    response: HalResponse<T>,
}

#[derive(Debug, Deserialize)]
struct HalResponse<T> {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default = "Vec::new")]
    docs: Vec<T>,
}

/// HTTP client for the HAL API with per-request timeout and bounded
/// exponential-backoff retries.
pub struct HalClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl HalClient {
    pub fn new(base_url: String, timeout_secs: u64, max_retries: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url,
            max_retries,
        }
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<HalResponse<T>, DirectoryError> {
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            let backoff = Duration::from_secs(2u64.pow(attempt));

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        match response.json::<HalEnvelope<T>>().await {
                            Ok(envelope) => return Ok(envelope.response),
                            Err(e) => {
                                // Truncated or non-JSON payloads happen under
                                // load; retry with backoff instead of looping.
                                if attempt + 1 >= self.max_retries {
                                    return Err(DirectoryError::Malformed(e.to_string()));
                                }
                                last_error = format!("malformed body: {e}");
                                warn!("Malformed response, retrying in {:?}: {}", backoff, e);
                            }
                        }
                    } else if status.as_u16() == 429 {
                        let wait = response
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or(backoff);
                        last_error = "HTTP 429".to_string();
                        warn!("Rate limited, waiting {:?}", wait);
                        tokio::time::sleep(wait).await;
                        continue;
                    } else if status.as_u16() >= 500 {
                        last_error = format!("HTTP {status}");
                        warn!("Server error, retrying in {:?}: {}", backoff, status);
                    } else {
                        return Err(DirectoryError::Status(status.as_u16()));
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 >= self.max_retries {
                        return Err(e.into());
                    }
                    warn!("Request error, retrying in {:?}: {}", backoff, e);
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(backoff).await;
            }
        }

        Err(DirectoryError::RetriesExhausted {
            attempts: self.max_retries,
            last: last_error,
        })
    }
}

impl DirectoryClient for HalClient {
    async fn search_structures(
        &self,
        query: &RefQuery,
    ) -> Result<Vec<CandidateRecord>, DirectoryError> {
        let url = format!(
            "{}/ref/structure/?q={}&fl={}&rows=100&wt=json",
            self.base_url,
            encode(&query.to_query_string()),
            RETURN_FIELDS,
        );
        let response = self.get_envelope::<CandidateRecord>(&url).await?;
        Ok(response.docs)
    }

    async fn author_published_at(
        &self,
        structure_id: &str,
        author: &AuthorName,
    ) -> Result<u64, DirectoryError> {
        let query = format!("structId_i:{}", structure_id);
        let filter = format!("auth_t:\"{} {}\"", author.forename, author.surname);
        let url = format!(
            "{}/search/?q={}&fq={}&rows=0&wt=json",
            self.base_url,
            encode(&query),
            encode(&filter),
        );
        let response = self.get_envelope::<serde_json::Value>(&url).await?;
        Ok(response.num_found)
    }
}
