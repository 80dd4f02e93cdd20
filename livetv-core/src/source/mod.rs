//! Source fetching
//!
//! Retrieves the remote channel and stream directories and the custom
//! overlay. Remote failures come back as typed [`FetchError`]s; the overlay
//! never fails, it only contributes less.

pub mod decode;
pub mod error;
pub mod http;
pub mod overlay;

pub use error::{FeedSource, FetchError, FetchErrorKind};
pub use http::HttpSourceFetcher;
pub use overlay::OverlaySource;

use async_trait::async_trait;

use crate::models::{Channel, Stream};

/// Channels and streams contributed by the custom overlay, plus the genres
/// they introduce outside the standard vocabulary.
#[derive(Debug, Clone, Default)]
pub struct CustomOverlay {
    pub channels: Vec<Channel>,
    pub streams: Vec<Stream>,
    pub custom_genres: Vec<String>,
}

impl CustomOverlay {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.streams.is_empty()
    }
}

/// Where the refresh coordinator gets its raw records from
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_remote_channels(&self) -> Result<Vec<Channel>, FetchError>;

    async fn fetch_remote_streams(&self) -> Result<Vec<Stream>, FetchError>;

    async fn fetch_custom_overlay(&self) -> CustomOverlay;
}
