//! Request and response bodies of the voice node's HTTP API.

use std::time::Duration;

use radiobot_core::{ChannelId, Snowflake, Track, TrackEndReason};
use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConnectBody {
    pub channel_id: String,
}

impl ConnectBody {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id: channel_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConnectResponse {
    pub connection_id: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct PlayBody<'a> {
    pub track: &'a str,
    pub volume: u16,
}

#[derive(Debug, Serialize)]
pub(super) struct VolumeBody {
    pub volume: u16,
}

#[derive(Debug, Serialize)]
pub(super) struct MessageBody<'a> {
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NodeTrackInfo {
    identifier: String,
    title: String,
    author: Option<String>,
    length: u64,
    is_stream: bool,
    uri: Option<String>,
    artwork_url: Option<String>,
    source_name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct NodeTrack {
    encoded: String,
    info: NodeTrackInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct NodePlaylist {
    pub tracks: Vec<NodeTrack>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NodeException {
    pub message: Option<String>,
    pub severity: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "lowercase")]
pub(super) enum LoadResult {
    Track(NodeTrack),
    Playlist(NodePlaylist),
    Search(Vec<NodeTrack>),
    Empty(IgnoredAny),
    Error(NodeException),
}

impl From<NodeTrack> for Track {
    fn from(track: NodeTrack) -> Self {
        let info = track.info;
        let duration = (!info.is_stream).then(|| Duration::from_millis(info.length));

        let mut converted = Track::new(track.encoded, info.title)
            .with_canonical(info.uri.unwrap_or(info.identifier))
            .with_source(info.source_name)
            .with_duration(duration)
            .with_artwork(info.artwork_url);

        converted.author = info.author.filter(|a| !a.is_empty());
        converted
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(super) enum NodeEvent {
    #[serde(rename_all = "camelCase")]
    TrackEnd {
        #[serde(deserialize_with = "snowflake")]
        guild_id: Snowflake,
        connection_id: u64,
        reason: NodeTrackEndReason,
    },
    #[serde(rename_all = "camelCase")]
    ConnectionClosed {
        #[serde(deserialize_with = "snowflake")]
        guild_id: Snowflake,
        connection_id: u64,
        code: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) enum NodeTrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup,
}

impl From<NodeTrackEndReason> for TrackEndReason {
    fn from(reason: NodeTrackEndReason) -> Self {
        match reason {
            NodeTrackEndReason::Finished => Self::Finished,
            NodeTrackEndReason::LoadFailed => Self::LoadFailed,
            NodeTrackEndReason::Stopped => Self::Stopped,
            NodeTrackEndReason::Replaced => Self::Replaced,
            NodeTrackEndReason::Cleanup => Self::Cleanup,
        }
    }
}

// The node sends snowflakes as strings, but numbers are accepted too
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Number(u64),
    Text(String),
}

fn snowflake<'de, D>(deserializer: D) -> Result<Snowflake, D::Error>
where
    D: Deserializer<'de>,
{
    match RawSnowflake::deserialize(deserializer)? {
        RawSnowflake::Number(value) => Ok(value),
        RawSnowflake::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}
