//! REST client for the homework assistant service.

pub mod groups;
pub mod upload;

pub use groups::{GroupCatalog, GroupSummary, GroupsPage, Pagination, DEFAULT_PAGE_LIMIT};
pub use upload::{
    UploadError, UploadedFile, Uploader, ValidationError, MAX_DOCUMENT_BYTES, MAX_IMAGE_BYTES,
};

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Bearer-authenticated client bound to the service base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(&self.token)
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = ApiClient::new("https://api.example.com/", "tok");
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(
            client.url("/homework-ai-assistant/upload-image"),
            "https://api.example.com/homework-ai-assistant/upload-image"
        );
    }
}
