use radiobot_core::{ChannelId, GuildId, RoleId, UserId};

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

pub type StationId = PrimaryKey;

/// A named playlist in the station catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationInfo {
    pub id: StationId,
    /// Unique across the catalog
    pub name: String,
    pub playlist_link: String,
    /// Only the owner may change the station
    pub owner_id: UserId,
}

/// Where a radio gets its playlist from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationSource {
    /// An inline playlist reference, a URL or a search string
    Link(String),
    /// A station from the catalog
    Catalog(StationInfo),
}

impl StationSource {
    /// The reference handed to the track resolver
    pub fn playlist_link(&self) -> &str {
        match self {
            StationSource::Link(link) => link,
            StationSource::Catalog(station) => &station.playlist_link,
        }
    }

    pub fn station_id(&self) -> Option<StationId> {
        match self {
            StationSource::Link(_) => None,
            StationSource::Catalog(station) => Some(station.id),
        }
    }
}

/// The desired radio of a guild, as persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioConfig {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub station: StationSource,
    /// Shuffle the playlist every time it is resolved
    pub always_shuffle: bool,
    /// Roles allowed to control the radio. Empty means anyone may.
    pub managing_roles: Vec<RoleId>,
}

impl RadioConfig {
    /// Returns true if a member holding the given roles may control the radio
    pub fn may_manage(&self, roles: &[RoleId]) -> bool {
        self.managing_roles.is_empty() || roles.iter().any(|r| self.managing_roles.contains(r))
    }
}
