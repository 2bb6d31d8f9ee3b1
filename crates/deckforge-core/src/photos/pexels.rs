//! Pexels search API (`GET /v1/search`).

use super::{PhotoCandidate, PhotoSource};
use crate::config::PhotosConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::llm::resolve_env_var;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Pexels photo search client.
pub struct PexelsSource {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl PexelsSource {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Build from `[photos]`, resolving `${ENV}` key references.
    ///
    /// A missing key is not an error here: the source reports itself
    /// unavailable and every search comes back empty.
    pub fn from_config(config: &PhotosConfig, timeout: Duration) -> Self {
        let api_key = resolve_env_var(&config.api_key);
        if api_key.is_none() {
            tracing::warn!("Pexels API key not set (PEXELS_API_KEY); slides will have no pictures");
        }
        Self::new(&config.endpoint, api_key, timeout)
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    src: PhotoSrc,
    #[serde(default)]
    alt: Option<String>,
}

#[derive(Deserialize)]
struct PhotoSrc {
    original: String,
}

fn parse_search(body: &str) -> PipelineResult<Vec<PhotoCandidate>> {
    let resp: SearchResponse = serde_json::from_str(body).map_err(|e| PipelineError::Photo {
        message: format!("Failed to parse Pexels response: {e}"),
        status_code: None,
    })?;
    Ok(resp
        .photos
        .into_iter()
        .map(|p| PhotoCandidate {
            url: p.src.original,
            alt: p.alt.filter(|a| !a.is_empty()),
        })
        .collect())
}

#[async_trait]
impl PhotoSource for PexelsSource {
    fn name(&self) -> &str {
        "pexels"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, per_page: usize) -> PipelineResult<Vec<PhotoCandidate>> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };

        let per_page = per_page.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .header("Authorization", api_key)
            .query(&[("query", query), ("per_page", per_page.as_str()), ("page", "1")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Photo {
                message: format!("Pexels request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Photo {
                message: format!("Pexels HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let body = resp.text().await.map_err(|e| PipelineError::Photo {
            message: format!("Failed to read Pexels response: {e}"),
            status_code: None,
        })?;
        parse_search(&body)
    }

    async fn download(&self, url: &str, dest: &Path) -> PipelineResult<()> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let download_err = |message: String| PipelineError::Download {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_err(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("image") {
            return Err(download_err(format!(
                "not a valid image (Content-Type: {content_type:?})"
            )));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| download_err(format!("cannot create {}: {e}", dest.display())))?;
        let mut stream = response.bytes_stream();

        let written = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| download_err(e.to_string()))?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| download_err(e.to_string()))?;
            }
            file.flush().await.map_err(|e| download_err(e.to_string()))
        }
        .await;

        // Never leave a truncated picture behind for the assembler.
        if written.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_takes_original_src() {
        let body = r#"{
            "total_results": 2,
            "photos": [
                {"id": 1, "alt": "A river", "src": {"original": "https://images.pexels.com/photos/1/a.jpeg", "small": "x"}},
                {"id": 2, "alt": "", "src": {"original": "https://images.pexels.com/photos/2/b.png"}}
            ]
        }"#;
        let candidates = parse_search(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://images.pexels.com/photos/1/a.jpeg");
        assert_eq!(candidates[0].alt.as_deref(), Some("A river"));
        assert_eq!(candidates[1].alt, None);
    }

    #[test]
    fn test_parse_search_empty_and_missing_photos() {
        assert!(parse_search(r#"{"photos": []}"#).unwrap().is_empty());
        assert!(parse_search(r#"{"page": 1}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_malformed() {
        let err = parse_search("<html>").unwrap_err();
        assert!(matches!(err, PipelineError::Photo { .. }));
    }

    #[tokio::test]
    async fn test_search_without_key_is_empty() {
        let source = PexelsSource::new("http://127.0.0.1:9/v1/search", None, Duration::from_secs(1));
        assert!(!source.is_available());
        assert!(source.search("cats", 1).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_config_resolves_literal_key() {
        let config = PhotosConfig {
            api_key: "literal".to_string(),
            ..PhotosConfig::default()
        };
        let source = PexelsSource::from_config(&config, Duration::from_secs(1));
        assert!(source.is_available());
    }
}
