//! Test helpers and fixtures for livetv-core tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CatalogConfig;
use crate::models::{CatalogManifest, Channel, MergedMeta, Snapshot, Stream};
use crate::source::{CustomOverlay, FeedSource, FetchError, FetchErrorKind, SourceFetcher};

/// Test fixture builder for Channel
pub struct ChannelFixture {
    channel: Channel,
}

impl ChannelFixture {
    pub fn new(id: &str) -> Self {
        Self {
            channel: Channel {
                id: id.to_string(),
                name: id.to_uppercase(),
                country: String::new(),
                languages: Vec::new(),
                categories: Vec::new(),
                is_nsfw: false,
                is_custom: false,
                logo: None,
                network: None,
                website: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.channel.name = name.to_string();
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.channel.country = country.to_string();
        self
    }

    pub fn languages(mut self, languages: &[&str]) -> Self {
        self.channel.languages = languages.iter().map(|l| (*l).to_string()).collect();
        self
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.channel.categories = categories.iter().map(|c| (*c).to_string()).collect();
        self
    }

    pub fn logo(mut self, logo: &str) -> Self {
        self.channel.logo = Some(logo.to_string());
        self
    }

    pub fn custom(mut self) -> Self {
        self.channel.is_custom = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.channel.is_nsfw = true;
        self
    }

    pub fn build(self) -> Channel {
        self.channel
    }
}

/// A bare stream for `channel`
pub fn stream(channel: &str, url: &str) -> Stream {
    Stream {
        channel: channel.to_string(),
        url: url.to_string(),
        title: None,
        referrer: None,
        user_agent: None,
        quality: None,
    }
}

/// Wrap metas in a snapshot with a default manifest
pub fn snapshot_of(metas: Vec<MergedMeta>) -> Snapshot {
    let manifest = CatalogManifest::build(&CatalogConfig::default(), &[], &[]);
    Snapshot::new(1, metas, Vec::new(), manifest)
}

/// In-memory [`SourceFetcher`] whose answers can be swapped between refreshes
#[derive(Default)]
pub struct StaticFetcher {
    channels: Mutex<Option<Vec<Channel>>>,
    streams: Mutex<Option<Vec<Stream>>>,
    overlay: Mutex<CustomOverlay>,
    delay: Mutex<Duration>,
    pub channel_fetches: AtomicUsize,
    pub stream_fetches: AtomicUsize,
}

impl StaticFetcher {
    pub fn new(channels: Vec<Channel>, streams: Vec<Stream>) -> Self {
        let fetcher = Self::default();
        fetcher.set_channels(Some(channels));
        fetcher.set_streams(Some(streams));
        fetcher
    }

    /// `None` makes the channel directory fail with a timeout
    pub fn set_channels(&self, channels: Option<Vec<Channel>>) {
        *self.channels.lock().unwrap() = channels;
    }

    /// `None` makes the stream directory fail with a timeout
    pub fn set_streams(&self, streams: Option<Vec<Stream>>) {
        *self.streams.lock().unwrap() = streams;
    }

    pub fn set_overlay(&self, channels: Vec<Channel>, streams: Vec<Stream>) {
        let custom_genres = crate::models::collect_custom_genres(&channels);
        *self.overlay.lock().unwrap() = CustomOverlay {
            channels,
            streams,
            custom_genres,
        };
    }

    /// Delay every remote fetch, to keep a refresh in flight
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn delay(&self) -> Duration {
        *self.delay.lock().unwrap()
    }
}

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch_remote_channels(&self) -> Result<Vec<Channel>, FetchError> {
        self.channel_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay()).await;
        let channels = self.channels.lock().unwrap().clone();
        channels.ok_or_else(|| FetchError::new(FeedSource::ChannelDirectory, FetchErrorKind::Timeout))
    }

    async fn fetch_remote_streams(&self) -> Result<Vec<Stream>, FetchError> {
        self.stream_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay()).await;
        let streams = self.streams.lock().unwrap().clone();
        streams.ok_or_else(|| FetchError::new(FeedSource::StreamDirectory, FetchErrorKind::Timeout))
    }

    async fn fetch_custom_overlay(&self) -> CustomOverlay {
        self.overlay.lock().unwrap().clone()
    }
}
