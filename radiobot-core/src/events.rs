use tokio::sync::broadcast;

use crate::{ConnectionId, GuildId};

pub type TransportEventSender = broadcast::Sender<TransportEvent>;
pub type TransportEventReceiver = broadcast::Receiver<TransportEvent>;

/// An inbound event from an audio transport, about one of its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub guild_id: GuildId,
    /// The connection the event is about. Sessions ignore events for
    /// connections other than their own.
    pub connection_id: ConnectionId,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The track that was playing stopped.
    TrackEnd { reason: TrackEndReason },
    /// The connection was closed from the outside, e.g. the bot was kicked.
    ConnectionClosed { code: Option<u16> },
}

/// Why a track stopped playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndReason {
    /// The track played to its end.
    Finished,
    /// The track could not be loaded.
    LoadFailed,
    /// The track was stopped.
    Stopped,
    /// Another track was played over it.
    Replaced,
    /// The player is being torn down.
    Cleanup,
}

impl TrackEndReason {
    /// Returns true if the queue should move on to the next track.
    pub fn advances_queue(&self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed | Self::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_natural_ends_advance() {
        assert!(TrackEndReason::Finished.advances_queue());
        assert!(TrackEndReason::LoadFailed.advances_queue());
        assert!(TrackEndReason::Stopped.advances_queue());
        assert!(!TrackEndReason::Replaced.advances_queue());
        assert!(!TrackEndReason::Cleanup.advances_queue());
    }
}
