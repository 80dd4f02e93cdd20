//! HTTP-backed [`SourceFetcher`]

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::decode::{decode_channels, decode_streams};
use super::{CustomOverlay, FeedSource, FetchError, FetchErrorKind, OverlaySource, SourceFetcher};
use crate::config::{CustomSourceConfig, SourcesConfig};
use crate::models::{Channel, Stream};
use crate::resilience::{bounded, TimeoutConfig, FETCH_TIMEOUT};
use crate::Error;

/// Fetches the iptv-org style directories over HTTP
#[derive(Debug, Clone)]
pub struct HttpSourceFetcher {
    client: Client,
    channels_url: String,
    streams_url: String,
    overlay: OverlaySource,
}

impl HttpSourceFetcher {
    pub fn new(
        sources: &SourcesConfig,
        custom: &CustomSourceConfig,
        timeouts: TimeoutConfig,
    ) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(bounded(timeouts.fetch, FETCH_TIMEOUT))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            channels_url: sources.channels_url.clone(),
            streams_url: sources.streams_url.clone(),
            overlay: OverlaySource::from_config(custom),
        })
    }

    #[must_use]
    pub const fn overlay(&self) -> &OverlaySource {
        &self.overlay
    }

    /// GET a JSON array. Anything other than a top-level array is a body error.
    async fn get_json_array(&self, url: &str, feed: FeedSource) -> Result<Vec<Value>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(feed, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(feed, FetchErrorKind::Http(status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::from_reqwest(feed, &e))?;

        match body {
            Value::Array(records) => Ok(records),
            other => Err(FetchError::new(
                feed,
                FetchErrorKind::Body(format!("expected a JSON array, got {}", kind_of(&other))),
            )),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch_remote_channels(&self) -> Result<Vec<Channel>, FetchError> {
        let feed = FeedSource::ChannelDirectory;
        let records = self.get_json_array(&self.channels_url, feed).await?;
        let channels = decode_channels(records, false, &feed.to_string());
        tracing::debug!(channels = channels.len(), "Channel directory fetched");
        Ok(channels)
    }

    async fn fetch_remote_streams(&self) -> Result<Vec<Stream>, FetchError> {
        let feed = FeedSource::StreamDirectory;
        let records = self.get_json_array(&self.streams_url, feed).await?;
        let streams = decode_streams(records, &feed.to_string());
        tracing::debug!(streams = streams.len(), "Stream directory fetched");
        Ok(streams)
    }

    async fn fetch_custom_overlay(&self) -> CustomOverlay {
        self.overlay.load(&self.client).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn fetcher_for(server: &MockServer, custom: CustomSourceConfig) -> HttpSourceFetcher {
        let sources = SourcesConfig {
            channels_url: format!("{}/channels.json", server.uri()),
            streams_url: format!("{}/streams.json", server.uri()),
            ..Default::default()
        };
        let timeouts = TimeoutConfig::new().with_fetch_timeout(Duration::from_millis(300));
        HttpSourceFetcher::new(&sources, &custom, timeouts).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_remote_channels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "ert1.gr", "name": "ERT 1", "country": "gr", "languages": ["ell"], "categories": null},
                {"id": "", "name": "blank"}
            ])))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, CustomSourceConfig::default()).await;
        let channels = fetcher.fetch_remote_channels().await.unwrap();

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].country, "GR");
        assert!(!channels[0].is_custom);
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/streams.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, CustomSourceConfig::default()).await;
        let err = fetcher.fetch_remote_streams().await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Http(503));
        assert_eq!(err.feed, FeedSource::StreamDirectory);
    }

    #[tokio::test]
    async fn test_slow_feed_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, CustomSourceConfig::default()).await;
        let err = fetcher.fetch_remote_channels().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_object_body_is_body_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"oops": 1})))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, CustomSourceConfig::default()).await;
        let err = fetcher.fetch_remote_channels().await.unwrap_err();
        assert!(matches!(err.kind, FetchErrorKind::Body(_)));
    }

    #[tokio::test]
    async fn test_remote_overlay_feed_overrides_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/overlay.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "channels": [{"id": "x1", "name": "Remote X", "country": "AU"}],
                "streams": [{"channel": "x1", "url": "http://x/remote.m3u8"}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.json");
        std::fs::write(
            &file,
            r#"{"channels":[{"id":"x1","name":"Local X","country":"AU"}]}"#,
        )
        .unwrap();

        let custom = CustomSourceConfig {
            file_path: Some(file.to_string_lossy().into_owned()),
            remote_url: Some(format!("{}/overlay.json", server.uri())),
            ..Default::default()
        };
        let fetcher = fetcher_for(&server, custom).await;
        let overlay = fetcher.fetch_custom_overlay().await;

        assert_eq!(overlay.channels.len(), 2);
        assert_eq!(overlay.channels[1].name, "Remote X");
        assert!(overlay.channels.iter().all(|c| c.is_custom));
        assert_eq!(overlay.streams.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_overlay_feed_is_empty_contribution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/overlay.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let custom = CustomSourceConfig {
            remote_url: Some(format!("{}/overlay.json", server.uri())),
            ..Default::default()
        };
        let fetcher = fetcher_for(&server, custom).await;
        assert!(fetcher.fetch_custom_overlay().await.is_empty());
    }
}
