use camino::{Utf8Path, Utf8PathBuf};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves display text (welcome, descriptions) that may be given as a
/// URL, a file next to the schema, or inline text.
#[derive(Debug, Clone)]
pub struct ContentReader {
    client: Client,
    base_path: Utf8PathBuf,
}

impl ContentReader {
    pub fn new(base_path: impl Into<Utf8PathBuf>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client, using defaults: {}", e);
                Client::new()
            });
        Self {
            client,
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Utf8Path {
        &self.base_path
    }

    /// Resolve `content`.
    ///
    /// - empty: empty
    /// - `http://` or `https://`: fetched body, or the URL itself on failure
    /// - readable file relative to the base path: its contents
    /// - anything else: returned unchanged
    pub async fn read(&self, content: &str) -> String {
        if content.is_empty() {
            return String::new();
        }

        if content.starts_with("http://") || content.starts_with("https://") {
            return self.fetch(content).await;
        }

        if !self.base_path.as_str().is_empty() {
            let path = self.base_path.join(content);
            if let Ok(text) = tokio::fs::read_to_string(&path).await {
                debug!("Read content from {}", path);
                return text;
            }
        }

        content.to_string()
    }

    async fn fetch(&self, url: &str) -> String {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                return url.to_string();
            }
        };

        if !response.status().is_success() {
            warn!("Failed to fetch {}: status {}", url, response.status());
            return url.to_string();
        }

        match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read response body from {}: {}", url, e);
                url.to_string()
            }
        }
    }
}
