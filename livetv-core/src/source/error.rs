// Source Fetch Error Types

use std::fmt;

/// Which feed a fetch was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSource {
    ChannelDirectory,
    StreamDirectory,
    OverlayFeed,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ChannelDirectory => "channel directory",
            Self::StreamDirectory => "stream directory",
            Self::OverlayFeed => "custom overlay feed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The request did not complete within the fetch timeout
    Timeout,
    /// The server answered with a non-success status
    Http(u16),
    /// Connection-level failure (DNS, refused, reset, TLS)
    Network(String),
    /// The body could not be read or is not the expected JSON shape
    Body(String),
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out"),
            Self::Http(status) => write!(f, "HTTP status {status}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Body(msg) => write!(f, "invalid body: {msg}"),
        }
    }
}

/// Failure of one remote fetch; contained at the fetcher boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{feed} fetch failed: {kind}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub feed: FeedSource,
}

impl FetchError {
    #[must_use]
    pub const fn new(feed: FeedSource, kind: FetchErrorKind) -> Self {
        Self { kind, feed }
    }

    /// Classify a reqwest failure
    #[must_use]
    pub fn from_reqwest(feed: FeedSource, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            FetchErrorKind::Http(status.as_u16())
        } else if err.is_decode() || err.is_body() {
            FetchErrorKind::Body(err.to_string())
        } else {
            FetchErrorKind::Network(err.to_string())
        };
        Self::new(feed, kind)
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == FetchErrorKind::Timeout
    }
}
