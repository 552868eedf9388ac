use std::collections::HashSet;

use async_trait::async_trait;
use radiobot_core::{ChannelId, GuildId, RoleId, UserId};
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult<T> {
    /// Turns a not found error into `Ok(None)`
    fn optional(self) -> Result<Option<T>>;
}

impl<T> DatabaseResult<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Stores the desired radio of every guild, and the station catalog
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Creates or replaces the radio of a guild, roles included, returning it as persisted.
    async fn upsert_radio(&self, new_radio: NewRadio) -> Result<RadioConfig>;
    async fn radio_by_guild(&self, guild_id: GuildId) -> Result<RadioConfig>;
    /// Fetches the radios of the given guilds. Guilds without a radio are left out.
    async fn radios_by_guilds(&self, guild_ids: &[GuildId]) -> Result<Vec<RadioConfig>>;
    /// Deleting a radio that doesn't exist does nothing.
    async fn delete_radio(&self, guild_id: GuildId) -> Result<()>;
    /// Every guild with a radio
    async fn list_enabled_guilds(&self) -> Result<HashSet<GuildId>>;

    /// Creates a station, or updates it if the name is taken by the same owner.
    async fn upsert_station(&self, new_station: NewStation) -> Result<StationInfo>;
    async fn station_by_name(&self, name: &str) -> Result<StationInfo>;
    async fn stations_by_owner(&self, owner_id: UserId) -> Result<Vec<StationInfo>>;
    async fn list_stations(&self) -> Result<Vec<StationInfo>>;
    /// Deletes an owned station, returning the guilds whose radios were deleted with it.
    async fn delete_station(&self, name: &str, owner_id: UserId) -> Result<Vec<GuildId>>;
}

/// What a radio should play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationRef {
    Link(String),
    Catalog(StationId),
}

#[derive(Debug, Clone)]
pub struct NewRadio {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub station: StationRef,
    pub always_shuffle: bool,
    /// Replaces every existing managing role
    pub managing_roles: Vec<RoleId>,
}

#[derive(Debug, Clone)]
pub struct NewStation {
    pub name: String,
    pub playlist_link: String,
    /// The user saving the station
    pub owner_id: UserId,
}
