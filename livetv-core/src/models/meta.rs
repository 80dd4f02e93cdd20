//! Externally visible catalog shapes

use serde::{Deserialize, Serialize};

use super::Stream;

/// Content type reported for every catalog entry
pub const META_TYPE: &str = "tv";

/// A playable endpoint as exposed to players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl From<&Stream> for StreamDescriptor {
    fn from(stream: &Stream) -> Self {
        Self {
            url: stream.url.clone(),
            title: stream.title.clone(),
            referrer: stream.referrer.clone(),
            user_agent: stream.user_agent.clone(),
            quality: stream.quality.clone(),
        }
    }
}

/// One channel that survived filtering and has at least one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedMeta {
    /// Prefixed channel id, e.g. `iptv-ert1.gr`
    pub id: String,
    /// Channel id as it appears in the directories
    pub channel_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub country: String,
    pub languages: Vec<String>,
    /// Channel categories followed by the country code
    pub genres: Vec<String>,
    pub poster: Option<String>,
    pub background: Option<String>,
    pub logo: Option<String>,
    pub is_custom: bool,
    pub streams: Vec<StreamDescriptor>,
}

impl MergedMeta {
    /// Case-insensitive genre membership; the country code counts as a genre.
    #[must_use]
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}
