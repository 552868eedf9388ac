//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use radiobot_core::{Track as CoreTrack, Volume as CoreVolume};
use radiobot_radio::{
    RadioConfig, SessionSnapshot, SessionState as RadioSessionState, StationInfo, StationSource,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Radio {
    guild_id: u64,
    channel_id: u64,
    /// The inline playlist reference, when not playing a catalog station
    station_link: Option<String>,
    station: Option<Station>,
    always_shuffle: bool,
    managing_roles: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    id: i64,
    name: String,
    playlist_link: String,
    owner_id: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    title: String,
    author: Option<String>,
    canonical: String,
    source: String,
    /// In seconds
    duration: Option<f32>,
    artwork: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    Connecting,
    Filling,
    Playing,
    Idle,
    Disconnected,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: u64,
    state: SessionState,
    radio: Radio,
    volume: u16,
    current: Option<Track>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Volume {
    volume: u16,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<Radio> for RadioConfig {
    fn to_serialized(&self) -> Radio {
        let (station_link, station) = match &self.station {
            StationSource::Link(link) => (Some(link.clone()), None),
            StationSource::Catalog(station) => (None, Some(station.to_serialized())),
        };

        Radio {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            station_link,
            station,
            always_shuffle: self.always_shuffle,
            managing_roles: self.managing_roles.clone(),
        }
    }
}

impl ToSerialized<Station> for StationInfo {
    fn to_serialized(&self) -> Station {
        Station {
            id: self.id,
            name: self.name.clone(),
            playlist_link: self.playlist_link.clone(),
            owner_id: self.owner_id,
        }
    }
}

impl ToSerialized<Track> for CoreTrack {
    fn to_serialized(&self) -> Track {
        Track {
            title: self.title.clone(),
            author: self.author.clone(),
            canonical: self.canonical.clone(),
            source: self.source.clone(),
            duration: self.duration.map(|d| d.as_secs_f32()),
            artwork: self.artwork.clone(),
        }
    }
}

impl ToSerialized<SessionState> for RadioSessionState {
    fn to_serialized(&self) -> SessionState {
        match self {
            RadioSessionState::Connecting => SessionState::Connecting,
            RadioSessionState::Filling => SessionState::Filling,
            RadioSessionState::Playing => SessionState::Playing,
            RadioSessionState::Idle => SessionState::Idle,
            RadioSessionState::Disconnected => SessionState::Disconnected,
        }
    }
}

impl ToSerialized<Session> for SessionSnapshot {
    fn to_serialized(&self) -> Session {
        Session {
            id: self.id.value(),
            state: self.state.to_serialized(),
            radio: self.radio.to_serialized(),
            volume: self.volume.get(),
            current: self.current.to_serialized(),
        }
    }
}

impl ToSerialized<Volume> for CoreVolume {
    fn to_serialized(&self) -> Volume {
        Volume { volume: self.get() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_radios_embed_their_station() {
        let radio = RadioConfig {
            guild_id: u64::MAX,
            channel_id: 2,
            station: StationSource::Catalog(StationInfo {
                id: 3,
                name: "Lofi".to_string(),
                playlist_link: "lofi".to_string(),
                owner_id: 4,
            }),
            always_shuffle: true,
            managing_roles: vec![5],
        };

        let json = serde_json::to_value(radio.to_serialized()).unwrap();

        assert_eq!(json["guildId"], u64::MAX);
        assert_eq!(json["stationLink"], serde_json::Value::Null);
        assert_eq!(json["station"]["name"], "Lofi");
        assert_eq!(json["managingRoles"][0], 5);
    }
}
