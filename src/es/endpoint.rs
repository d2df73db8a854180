/// HTTP client for the indexing store
///
/// Owns the store's base URL and document type. Every document lands in
/// `<base>/<index>-<YYYY-MM-DD>/<doc_type>`, so indices roll over daily.

use chrono::{Local, NaiveDate};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::error::ForwardError;

/// Root document returned by `GET /` on an Elasticsearch node
#[derive(Debug, Default, Deserialize)]
struct ClusterInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cluster_name: Option<String>,
    #[serde(default)]
    version: Option<ClusterVersion>,
}

#[derive(Debug, Default, Deserialize)]
struct ClusterVersion {
    #[serde(default)]
    number: Option<String>,
}

/// Build the dated index identifier `<index_base>-<YYYY-MM-DD>`.
pub fn dated_index(index_base: &str, date: NaiveDate) -> String {
    format!("{}-{}", index_base, date.format("%Y-%m-%d"))
}

#[derive(Clone, Debug)]
pub struct EndpointClient {
    client: reqwest::Client,
    base_url: Url,
    doc_type: String,
}

impl EndpointClient {
    /// Create a client for the store at `base_url`.
    ///
    /// Fails with `ForwardError::Config` unless the URL is an absolute
    /// http(s) URL that paths can be appended to.
    pub fn new(base_url: &str, doc_type: impl Into<String>) -> Result<Self, ForwardError> {
        Self::with_client(reqwest::Client::new(), base_url, doc_type)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        doc_type: impl Into<String>,
    ) -> Result<Self, ForwardError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ForwardError::Config(format!("invalid endpoint url '{}': {}", base_url, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ForwardError::Config(format!(
                "unsupported endpoint scheme '{}'",
                base_url.scheme()
            )));
        }
        if base_url.cannot_be_a_base() {
            return Err(ForwardError::Config(format!(
                "endpoint url '{}' cannot be used as a base",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            doc_type: doc_type.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Full document URL for `index_base` on `date`.
    ///
    /// A `/` in the document type separates path segments; empty segments are
    /// skipped, so an empty type adds nothing after the index.
    pub fn document_url(&self, index_base: &str, date: NaiveDate) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in the constructor
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&dated_index(index_base, date))
                .extend(self.doc_type.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    /// Check the base URL and require a plain 200 answer.
    pub async fn check_reachable(&self) -> Result<(), ForwardError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(|e| ForwardError::Reachability {
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ForwardError::Reachability {
                status: Some(status.as_u16()),
                reason: "Endpoint not replying typical 200 answer on ping".to_string(),
            });
        }

        // Any 200 is healthy; the cluster banner is only informational
        match response.json::<ClusterInfo>().await {
            Ok(info) => tracing::info!(
                url = %self.base_url,
                node = info.name.as_deref().unwrap_or("unknown"),
                cluster = info.cluster_name.as_deref().unwrap_or("unknown"),
                version = info
                    .version
                    .as_ref()
                    .and_then(|v| v.number.as_deref())
                    .unwrap_or("unknown"),
                "Endpoint is healthy"
            ),
            Err(_) => tracing::info!(url = %self.base_url, "Endpoint is healthy"),
        }

        Ok(())
    }

    /// POST `document` into today's index for `index_base`.
    pub async fn deliver(&self, document: Vec<u8>, index_base: &str) -> Result<(), ForwardError> {
        self.deliver_at(document, index_base, Local::now().date_naive()).await
    }

    /// POST `document` into the index for `index_base` on `date`.
    ///
    /// Exactly one request is made. Any status outside 2xx is reported as a
    /// delivery error carrying the status and (truncated) response body.
    pub async fn deliver_at(
        &self,
        document: Vec<u8>,
        index_base: &str,
        date: NaiveDate,
    ) -> Result<(), ForwardError> {
        let url = self.document_url(index_base, date);
        let length = document.len();

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(document)
            .send()
            .await
            .map_err(ForwardError::delivery_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ForwardError::delivery_status(status.as_u16(), &body));
        }

        tracing::debug!(url = %url, length, status = status.as_u16(), "Succeeded sending document");
        Ok(())
    }
}
