//! Implements the `Documents` trait against a WebDAV server (Nextcloud in
//! practice) using plain GET and PUT with basic auth.

use crate::api::Documents;
use crate::config::SheetSource;
use crate::Result;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Bound on each fetch/store round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct WebdavDocuments {
    client: Client,
}

impl WebdavDocuments {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Documents for WebdavDocuments {
    async fn fetch(&self, source: &SheetSource) -> Result<Vec<u8>> {
        let url = file_url(source)?;
        let password = password(source)?;
        debug!(url = %url, "Fetching ledger document");

        let response = self
            .client
            .get(url)
            .basic_auth(&source.user, Some(password))
            .send()
            .await
            .context("Failed to download ledger document")?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Non-success response downloading document");
            return Err(anyhow!("Download failed with status {status}").into());
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read ledger document body")?;
        Ok(bytes.to_vec())
    }

    async fn store(&self, source: &SheetSource, bytes: &[u8]) -> Result<()> {
        let url = file_url(source)?;
        let password = password(source)?;
        debug!(url = %url, len = bytes.len(), "Storing ledger document");

        let response = self
            .client
            .put(url)
            .basic_auth(&source.user, Some(password))
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(bytes.to_vec())
            .send()
            .await
            .context("Failed to upload ledger document")?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Non-success response uploading document");
            return Err(anyhow!("Upload failed with status {status}").into());
        }
        Ok(())
    }
}

fn file_url(source: &SheetSource) -> Result<Url> {
    let mut url = Url::parse(&source.base_url)
        .with_context(|| format!("Failed to parse base url '{}'", source.base_url))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("Base url '{}' cannot be a base", source.base_url))?;
        segments.pop_if_empty();
        segments.push(&source.user);
        for part in source.file_path.split('/').filter(|p| !p.is_empty()) {
            segments.push(part);
        }
    }
    Ok(url)
}

fn password(source: &SheetSource) -> Result<String> {
    std::env::var(&source.password_env)
        .with_context(|| format!("Missing env var {}", source.password_env))
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SheetSource {
        SheetSource {
            base_url: "https://cloud.example.com/remote.php/dav/files".to_string(),
            user: "rob".to_string(),
            password_env: "ROB_WEBDAV_PASSWORD".to_string(),
            file_path: "budget/ledger.csv".to_string(),
            name_column: "B".to_string(),
            value_column: "C".to_string(),
            start_row: 3,
            blank_run_limit: 5,
        }
    }

    #[test]
    fn test_file_url_joins_user_and_path() {
        let url = file_url(&source()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cloud.example.com/remote.php/dav/files/rob/budget/ledger.csv"
        );
    }

    #[test]
    fn test_file_url_tolerates_trailing_slash_and_leading_slash() {
        let mut s = source();
        s.base_url = "https://cloud.example.com/dav/".to_string();
        s.file_path = "/ledger.csv".to_string();
        let url = file_url(&s).unwrap();
        assert_eq!(url.as_str(), "https://cloud.example.com/dav/rob/ledger.csv");
    }

    #[test]
    fn test_file_url_rejects_garbage_base() {
        let mut s = source();
        s.base_url = "not a url".to_string();
        assert!(file_url(&s).is_err());
    }
}
