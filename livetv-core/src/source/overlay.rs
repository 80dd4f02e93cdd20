//! Custom channel overlay
//!
//! Combines a local JSON file (optional, may not exist) and an optional
//! remote feed of the same `{ channels, streams }` shape. Everything read
//! here is tagged custom. Unreadable or malformed content is logged and
//! contributes nothing; it never fails the refresh.

use std::path::{Path, PathBuf};

use super::decode::{decode_channels, decode_streams, OverlayDocument};
use super::{CustomOverlay, FeedSource, FetchError, FetchErrorKind};
use crate::config::CustomSourceConfig;
use crate::models::collect_custom_genres;
use crate::Error;

#[derive(Debug, Clone, Default)]
pub struct OverlaySource {
    enabled: bool,
    file_path: Option<PathBuf>,
    remote_url: Option<String>,
}

impl OverlaySource {
    #[must_use]
    pub fn from_config(config: &CustomSourceConfig) -> Self {
        Self {
            enabled: config.enabled,
            file_path: config.file_path.as_ref().map(PathBuf::from),
            remote_url: config
                .remote_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Load local file then remote feed; remote records come last so they
    /// override local ones with the same id.
    pub async fn load(&self, client: &reqwest::Client) -> CustomOverlay {
        if !self.enabled {
            return CustomOverlay::default();
        }

        let (local, remote) = tokio::join!(self.load_file(), self.load_remote(client));

        let mut channels = Vec::new();
        let mut streams = Vec::new();
        for doc in [local, remote].into_iter().flatten() {
            channels.extend(decode_channels(doc.channels, true, "custom overlay"));
            streams.extend(decode_streams(doc.streams, "custom overlay"));
        }

        let custom_genres = collect_custom_genres(&channels);
        tracing::debug!(
            channels = channels.len(),
            streams = streams.len(),
            custom_genres = custom_genres.len(),
            "Custom overlay loaded"
        );

        CustomOverlay {
            channels,
            streams,
            custom_genres,
        }
    }

    async fn load_file(&self) -> Option<OverlayDocument> {
        let path = self.file_path.as_ref()?;

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Custom overlay file not present");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read custom overlay file"
                );
                return None;
            }
        };

        match parse_document(&bytes, &path.display().to_string()) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed custom overlay file");
                None
            }
        }
    }

    async fn load_remote(&self, client: &reqwest::Client) -> Option<OverlayDocument> {
        let url = self.remote_url.as_ref()?;

        let bytes = match fetch_bytes(client, url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Custom overlay feed unavailable");
                return None;
            }
        };

        match parse_document(&bytes, url) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed custom overlay feed");
                None
            }
        }
    }
}

async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let feed = FeedSource::OverlayFeed;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(feed, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(feed, FetchErrorKind::Http(status.as_u16())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(feed, &e))?;
    Ok(bytes.to_vec())
}

fn parse_document(bytes: &[u8], origin: &str) -> crate::Result<OverlayDocument> {
    serde_json::from_slice(bytes).map_err(|e| Error::parse(origin, e))
}
