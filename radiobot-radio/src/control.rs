use std::sync::Arc;

use log::info;
use radiobot_core::{GuildId, RoleId, UserId, Volume, VolumeError};
use thiserror::Error;

use crate::{
    Database, DatabaseError, DatabaseResult, NewRadio, NewStation, Radio, RadioConfig, RadioEvent,
    RadioSession, SessionSnapshot, StationInfo, StationSource,
};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("This guild has no radio")]
    NoRadio,
    #[error("The radio of this guild is not playing")]
    NoSession,
    #[error("Station does not exist")]
    StationNotFound,
    #[error("Station {0} belongs to someone else")]
    NotStationOwner(String),
    #[error("A managing role is required to control this radio")]
    MissingManagingRole,
    #[error(transparent)]
    InvalidVolume(#[from] VolumeError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// The operations behind the control surface
impl<Db> Radio<Db>
where
    Db: Database,
{
    /// Saves the radio of a guild and brings its session in line with it
    pub async fn save_radio(&self, new_radio: NewRadio) -> Result<RadioConfig, ControlError> {
        let radio = self
            .context()
            .database
            .upsert_radio(new_radio)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => ControlError::StationNotFound,
                e => e.into(),
            })?;

        let sessions = self.sessions();

        match sessions.get(radio.guild_id).filter(|s| s.is_alive()) {
            Some(session) if session.radio().channel_id != radio.channel_id => {
                info!(
                    "Moving the radio of guild {} to channel {}",
                    radio.guild_id, radio.channel_id
                );

                sessions.stop(radio.guild_id);
                sessions.start(radio.clone());
            }
            Some(session) => session.reconfigure(radio.clone()),
            None => {
                sessions.start(radio.clone());
            }
        }

        Ok(radio)
    }

    /// Deletes the radio of a guild and disconnects its session
    pub async fn delete_radio(&self, guild_id: GuildId) -> Result<(), ControlError> {
        self.context().database.delete_radio(guild_id).await?;
        self.sessions().stop(guild_id);

        Ok(())
    }

    /// Disconnects the session of a guild, if any, and starts a fresh one
    pub async fn restart_radio(&self, guild_id: GuildId) -> Result<RadioConfig, ControlError> {
        let radio = self.radio(guild_id).await?;

        info!("Restarting the radio of guild {}", guild_id);

        let sessions = self.sessions();
        sessions.stop(guild_id);
        sessions.start(radio.clone());

        Ok(radio)
    }

    pub async fn radio(&self, guild_id: GuildId) -> Result<RadioConfig, ControlError> {
        self.context()
            .database
            .radio_by_guild(guild_id)
            .await
            .optional()?
            .ok_or(ControlError::NoRadio)
    }

    pub fn volume(&self, guild_id: GuildId) -> Result<Volume, ControlError> {
        Ok(self.session(guild_id)?.volume())
    }

    /// Parses and applies a volume on behalf of a member holding the given roles
    pub async fn set_volume(
        &self,
        guild_id: GuildId,
        roles: &[RoleId],
        input: &str,
    ) -> Result<Volume, ControlError> {
        self.check_roles(guild_id, roles).await?;

        let volume: Volume = input.parse()?;
        self.session(guild_id)?.set_volume(volume);

        self.sessions()
            .emit(RadioEvent::VolumeUpdate { guild_id, volume });

        Ok(volume)
    }

    /// Moves on to the next track on behalf of a member holding the given roles
    pub async fn skip(&self, guild_id: GuildId, roles: &[RoleId]) -> Result<(), ControlError> {
        self.check_roles(guild_id, roles).await?;
        self.session(guild_id)?.skip();

        Ok(())
    }

    pub fn current(&self, guild_id: GuildId) -> Result<SessionSnapshot, ControlError> {
        Ok(self.session(guild_id)?.snapshot())
    }

    /// Saves a station, refilling the sessions that play it
    pub async fn save_station(&self, new_station: NewStation) -> Result<StationInfo, ControlError> {
        let name = new_station.name.clone();

        let station = self
            .context()
            .database
            .upsert_station(new_station)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => ControlError::NotStationOwner(name),
                e => e.into(),
            })?;

        for session in self.sessions().list() {
            let mut radio = session.radio();

            if radio.station.station_id() != Some(station.id) {
                continue;
            }

            radio.station = StationSource::Catalog(station.clone());
            session.reconfigure(radio);
        }

        Ok(station)
    }

    /// Deletes an owned station, along with the radios playing it
    pub async fn delete_station(
        &self,
        name: &str,
        owner_id: UserId,
    ) -> Result<Vec<GuildId>, ControlError> {
        let station = self.station(name).await?;

        if station.owner_id != owner_id {
            return Err(ControlError::NotStationOwner(station.name));
        }

        let guild_ids = self
            .context()
            .database
            .delete_station(name, owner_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => ControlError::StationNotFound,
                e => e.into(),
            })?;

        for guild_id in &guild_ids {
            self.sessions().stop(*guild_id);
        }

        info!(
            "Deleted station {} and the radios of {} guilds",
            name,
            guild_ids.len()
        );

        Ok(guild_ids)
    }

    pub async fn station(&self, name: &str) -> Result<StationInfo, ControlError> {
        self.context()
            .database
            .station_by_name(name)
            .await
            .optional()?
            .ok_or(ControlError::StationNotFound)
    }

    pub async fn stations_by_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<StationInfo>, ControlError> {
        Ok(self.context().database.stations_by_owner(owner_id).await?)
    }

    pub async fn stations(&self) -> Result<Vec<StationInfo>, ControlError> {
        Ok(self.context().database.list_stations().await?)
    }

    async fn check_roles(&self, guild_id: GuildId, roles: &[RoleId]) -> Result<(), ControlError> {
        if self.radio(guild_id).await?.may_manage(roles) {
            Ok(())
        } else {
            Err(ControlError::MissingManagingRole)
        }
    }

    fn session(&self, guild_id: GuildId) -> Result<Arc<RadioSession>, ControlError> {
        self.sessions()
            .get(guild_id)
            .filter(|s| s.is_alive())
            .ok_or(ControlError::NoSession)
    }
}
