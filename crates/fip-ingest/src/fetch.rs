//! Paginated retrieval from the source API
//!
//! Socrata-style offset pagination: `$limit` and `$offset` query parameters,
//! a JSON array body per page, and an empty array signalling exhaustion. A
//! failed page (transport error, non-2xx status, malformed body) truncates
//! the fetch but keeps everything accumulated so far; there is no retry.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{info, warn};

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of a full paginated fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Raw records accumulated across all successfully retrieved pages.
    pub records: Vec<Value>,
    /// Number of non-empty pages retrieved.
    pub pages: usize,
    /// Set when a page request failed and the fetch was truncated.
    pub failure: Option<String>,
}

impl FetchOutcome {
    pub fn is_truncated(&self) -> bool {
        self.failure.is_some()
    }
}

/// Offset-based page fetcher for the inspection feed.
pub struct PageFetcher {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl PageFetcher {
    pub fn new(base_url: impl Into<String>, page_size: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            page_size,
        }
    }

    /// Fetch every page until the source reports exhaustion or a request
    /// fails. Failure is soft: accumulated records are retained and the
    /// failure is surfaced on the outcome, not as an error.
    pub async fn fetch_all(&self) -> FetchOutcome {
        let mut records = Vec::new();
        let mut pages = 0usize;
        let mut offset = 0usize;
        let mut failure = None;

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        loop {
            pb.set_message(format!(
                "Fetching rows {} to {}...",
                offset,
                offset + self.page_size
            ));

            let page = match self.fetch_page(offset).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(offset, error = %e, "page request failed, truncating fetch");
                    failure = Some(e);
                    break;
                },
            };

            if page.is_empty() {
                info!(offset, "source exhausted, no more data");
                break;
            }

            pages += 1;
            offset += self.page_size;
            records.extend(page);
            pb.tick();
        }

        pb.finish_and_clear();
        info!(
            records = records.len(),
            pages,
            truncated = failure.is_some(),
            "fetch complete"
        );

        FetchOutcome {
            records,
            pages,
            failure,
        }
    }

    /// Fetch a single page at the given offset.
    async fn fetch_page(&self, offset: usize) -> Result<Vec<Value>, String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("$limit", self.page_size.to_string()),
                ("$offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("request error at offset {}: {}", offset, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {} at offset {}", status, offset));
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| format!("malformed body at offset {}: {}", offset, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: u32) -> Value {
        json!({"inspection_id": id.to_string()})
    }

    #[tokio::test]
    async fn fetches_all_pages_until_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/inspections"))
            .and(query_param("$offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(1), record(2)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/inspections"))
            .and(query_param("$offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(3)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/inspections"))
            .and(query_param("$offset", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(format!("{}/inspections", server.uri()), 2);
        let outcome = fetcher.fetch_all().await;

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.pages, 2);
        assert!(!outcome.is_truncated());
    }

    #[tokio::test]
    async fn empty_first_page_yields_no_records() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/inspections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(format!("{}/inspections", server.uri()), 10);
        let outcome = fetcher.fetch_all().await;

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.pages, 0);
        assert!(!outcome.is_truncated());
    }

    #[tokio::test]
    async fn failed_page_truncates_but_keeps_prior_records() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/inspections"))
            .and(query_param("$offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([record(1), record(2)])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/inspections"))
            .and(query_param("$offset", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(format!("{}/inspections", server.uri()), 2);
        let outcome = fetcher.fetch_all().await;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages, 1);
        assert!(outcome.is_truncated());
    }

    #[tokio::test]
    async fn malformed_body_counts_as_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/inspections"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(format!("{}/inspections", server.uri()), 10);
        let outcome = fetcher.fetch_all().await;

        assert!(outcome.records.is_empty());
        assert!(outcome.is_truncated());
    }
}
