//! Lenient decoding of directory documents
//!
//! A single malformed record never discards a whole feed: records are
//! decoded one by one and the failures are counted and logged.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Channel, ChannelRecord, Stream, StreamRecord};

/// Shape of a custom overlay document
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OverlayDocument {
    pub channels: Vec<Value>,
    pub streams: Vec<Value>,
}

pub fn decode_channels(records: Vec<Value>, is_custom: bool, origin: &str) -> Vec<Channel> {
    let total = records.len();
    let channels: Vec<Channel> = records
        .into_iter()
        .filter_map(|v| serde_json::from_value::<ChannelRecord>(v).ok())
        .filter_map(|r| r.into_channel(is_custom))
        .collect();

    if channels.len() < total {
        tracing::debug!(
            origin = %origin,
            skipped = total - channels.len(),
            "Skipped unusable channel records"
        );
    }
    channels
}

pub fn decode_streams(records: Vec<Value>, origin: &str) -> Vec<Stream> {
    let total = records.len();
    let streams: Vec<Stream> = records
        .into_iter()
        .filter_map(|v| serde_json::from_value::<StreamRecord>(v).ok())
        .filter_map(StreamRecord::into_stream)
        .collect();

    if streams.len() < total {
        tracing::debug!(
            origin = %origin,
            skipped = total - streams.len(),
            "Skipped unusable stream records"
        );
    }
    streams
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_channels_skips_bad_records() {
        let records = vec![
            json!({"id": "ert1.gr", "name": "ERT 1", "country": "GR"}),
            json!({"id": 42}),
            json!("not an object"),
            json!({"name": "missing id"}),
        ];

        let channels = decode_channels(records, false, "test");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, "ert1.gr");
    }

    #[test]
    fn test_decode_streams_drops_orphans_without_channel() {
        let records = vec![
            json!({"channel": "ert1.gr", "url": "http://a/1.m3u8"}),
            json!({"channel": null, "url": "http://a/2.m3u8"}),
            json!({"channel": "ert1.gr"}),
        ];

        let streams = decode_streams(records, "test");
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].url, "http://a/1.m3u8");
    }

    #[test]
    fn test_overlay_document_sections_are_optional() {
        let doc: OverlayDocument = serde_json::from_str(r#"{"channels":[{"id":"x1"}]}"#).unwrap();
        assert_eq!(doc.channels.len(), 1);
        assert!(doc.streams.is_empty());
    }
}
