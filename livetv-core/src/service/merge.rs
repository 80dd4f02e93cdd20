//! Merge and filter
//!
//! Turns the concatenated channel list (remote first, custom last) and every
//! known stream into the served sequence of [`MergedMeta`]. Ids are unique in
//! the output: a later record with the same id replaces the earlier one but
//! keeps its position. A channel is served only if it passes the
//! [`FilterPolicy`] and has at least one stream.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::config::{CatalogConfig, StreamSelection};
use crate::models::{Channel, FilterPolicy, MergedMeta, Stream, StreamDescriptor, META_TYPE};

pub fn merge(
    channels: Vec<Channel>,
    streams: &[Stream],
    policy: &FilterPolicy,
    settings: &CatalogConfig,
) -> Vec<MergedMeta> {
    let stream_map = streams_by_channel(streams);

    let mut by_id: IndexMap<String, Channel> = IndexMap::with_capacity(channels.len());
    for channel in channels {
        by_id.insert(channel.id.clone(), channel);
    }

    by_id
        .into_values()
        .filter(|channel| policy.admits(channel))
        .filter_map(|channel| {
            let streams = stream_map.get(channel.id.as_str())?;
            Some(to_meta(channel, streams, settings))
        })
        .collect()
}

/// Group streams by channel id, dropping repeated urls within a channel.
fn streams_by_channel(streams: &[Stream]) -> HashMap<&str, Vec<&Stream>> {
    let mut map: HashMap<&str, Vec<&Stream>> = HashMap::new();
    for stream in streams {
        let entry = map.entry(stream.channel.as_str()).or_default();
        if !entry.iter().any(|s| s.url == stream.url) {
            entry.push(stream);
        }
    }
    map
}

fn to_meta(channel: Channel, streams: &[&Stream], settings: &CatalogConfig) -> MergedMeta {
    let mut genres: Vec<String> = channel
        .effective_categories()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !channel.country.is_empty() && !genres.contains(&channel.country) {
        genres.push(channel.country.clone());
    }

    let selected = match settings.stream_selection {
        StreamSelection::All => streams,
        StreamSelection::First => &streams[..streams.len().min(1)],
    };

    MergedMeta {
        id: format!("{}{}", settings.id_prefix, channel.id),
        kind: META_TYPE.to_string(),
        poster: channel.logo.clone(),
        background: channel.logo.clone(),
        logo: channel.logo,
        streams: selected.iter().map(|s| StreamDescriptor::from(*s)).collect(),
        channel_id: channel.id,
        name: channel.name,
        country: channel.country,
        languages: channel.languages,
        genres,
        is_custom: channel.is_custom,
    }
}
