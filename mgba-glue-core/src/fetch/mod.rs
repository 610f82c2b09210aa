//! ROM retrieval.

use std::future::Future;

use crate::error::{GlueError, GlueResult};

/// Source of ROM images.
///
/// One attempt per call; no retries.
pub trait RomFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = GlueResult<Vec<u8>>>;
}

/// Fetches `http(s)://` URLs with `reqwest` and reads `file://` URLs from disk.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl RomFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> GlueResult<Vec<u8>> {
        if let Some(path) = url.strip_prefix("file://") {
            tracing::debug!(path, "reading ROM from local file");
            return Ok(tokio::fs::read(path).await?);
        }

        tracing::debug!(url, "fetching ROM");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GlueError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!(url, len = body.len(), "fetched ROM");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::http::serve_once;

    #[tokio::test]
    async fn fetches_body_on_success() {
        let url = serve_once("200 OK", b"ROMDATA".to_vec()).await;
        let bytes = HttpFetcher::default().fetch(&url).await.unwrap();
        assert_eq!(bytes, b"ROMDATA");
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let url = serve_once("404 Not Found", Vec::new()).await;
        let err = HttpFetcher::default().fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, GlueError::Fetch { status: 404, .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.gba");
        std::fs::write(&path, b"local").unwrap();
        let url = format!("file://{}", path.display());
        assert_eq!(HttpFetcher::default().fetch(&url).await.unwrap(), b"local");
    }
}
