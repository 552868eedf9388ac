use radiobot_core::{GuildId, Track, Volume};
use tokio::sync::broadcast;

use crate::{SessionId, SessionState};

pub type RadioEventSender = broadcast::Sender<RadioEvent>;
pub type RadioEventReceiver = broadcast::Receiver<RadioEvent>;

/// Events emitted by radio sessions and the control surface
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// A session moved to another state
    SessionStateUpdate {
        guild_id: GuildId,
        session_id: SessionId,
        new_state: SessionState,
    },
    /// A session started playing a track
    TrackStarted { guild_id: GuildId, track: Track },
    /// A session resolved its station into a fresh queue
    QueueRefilled { guild_id: GuildId, track_count: usize },
    /// A session could not fill its queue and went idle
    RefillFailed { guild_id: GuildId, error: String },
    /// The volume of a session was changed
    VolumeUpdate { guild_id: GuildId, volume: Volume },
    /// A session was registered over an existing one, which is disconnected
    SessionReplaced {
        guild_id: GuildId,
        previous: SessionId,
        current: SessionId,
    },
    /// A session disconnected and left the registry
    SessionEnded {
        guild_id: GuildId,
        session_id: SessionId,
        /// Why the session ended, if it wasn't asked to
        error: Option<String>,
    },
}

impl RadioEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::SessionStateUpdate { guild_id, .. }
            | Self::TrackStarted { guild_id, .. }
            | Self::QueueRefilled { guild_id, .. }
            | Self::RefillFailed { guild_id, .. }
            | Self::VolumeUpdate { guild_id, .. }
            | Self::SessionReplaced { guild_id, .. }
            | Self::SessionEnded { guild_id, .. } => *guild_id,
        }
    }
}
