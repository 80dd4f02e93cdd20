//! Directory records: channels and their playable streams
//!
//! Remote feeds and overlay files are decoded into the loose `*Record`
//! shapes first, then normalised into [`Channel`] / [`Stream`]. Records
//! without an identity (blank channel id, blank stream url) are dropped
//! during normalisation.

use serde::{Deserialize, Serialize};

/// Genre used for channels that never declared a category.
pub const FALLBACK_CATEGORY: &str = "general";

/// A directory entry for one television station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Upper-cased ISO-like country code
    pub country: String,
    pub languages: Vec<String>,
    pub categories: Vec<String>,
    pub is_nsfw: bool,
    pub is_custom: bool,
    pub logo: Option<String>,
    pub network: Option<String>,
    pub website: Option<String>,
}

impl Channel {
    /// Categories used for genre derivation and category rules.
    ///
    /// A channel that never supplied a category is treated as `general`.
    #[must_use]
    pub fn effective_categories(&self) -> Vec<&str> {
        if self.categories.is_empty() {
            vec![FALLBACK_CATEGORY]
        } else {
            self.categories.iter().map(String::as_str).collect()
        }
    }
}

/// A playable endpoint tied to exactly one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub channel: String,
    pub url: String,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub quality: Option<String>,
}

/// Channel record as published by the channel directory feed.
///
/// Every field is optional on the wire; `null` lists are common.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub languages: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub is_nsfw: Option<bool>,
    pub logo: Option<String>,
    pub network: Option<String>,
    pub website: Option<String>,
}

impl ChannelRecord {
    /// Normalise into a [`Channel`], tagging it as custom when it came from
    /// an overlay source. Returns `None` for records without an id.
    #[must_use]
    pub fn into_channel(self, is_custom: bool) -> Option<Channel> {
        let id = non_blank(self.id)?;
        let name = non_blank(self.name).unwrap_or_else(|| id.clone());

        Some(Channel {
            name,
            country: non_blank(self.country)
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_default(),
            languages: normalize_tags(self.languages.unwrap_or_default()),
            categories: normalize_tags(self.categories.unwrap_or_default()),
            is_nsfw: self.is_nsfw.unwrap_or(false),
            is_custom,
            logo: non_blank(self.logo),
            network: non_blank(self.network),
            website: non_blank(self.website),
            id,
        })
    }
}

/// Stream record as published by the stream directory feed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamRecord {
    pub channel: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "http_referrer")]
    pub referrer: Option<String>,
    #[serde(alias = "userAgent")]
    pub user_agent: Option<String>,
    pub quality: Option<String>,
}

impl StreamRecord {
    /// Normalise into a [`Stream`]. Streams that name no channel or carry no
    /// url can never be served and are dropped here.
    #[must_use]
    pub fn into_stream(self) -> Option<Stream> {
        Some(Stream {
            channel: non_blank(self.channel)?,
            url: non_blank(self.url)?,
            title: non_blank(self.title),
            referrer: non_blank(self.referrer),
            user_agent: non_blank(self.user_agent),
            quality: non_blank(self.quality),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lower-case, trim and de-duplicate tags while keeping their first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
