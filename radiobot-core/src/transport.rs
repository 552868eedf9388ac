use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{ChannelId, GuildId, Track, TransportEventReceiver, Volume};

pub type ArcedTransport = Arc<dyn AudioTransport>;

/// Identifies one voice connection on a transport
pub type ConnectionId = u64;

/// A live voice connection, as handed out by [AudioTransport::connect].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHandle {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Channel {0} does not exist")]
    ChannelNotFound(ChannelId),

    #[error("Missing permission to use channel {0}")]
    PermissionDenied(ChannelId),

    #[error("Transport rejected the request: {0}")]
    Rejected(String),

    #[error("Transport request failed: {0}")]
    Request(String),

    #[error("Transport is unavailable")]
    Unavailable,
}

/// The remote audio service radios are played through.
///
/// Implementations publish track-end and connection-closed events to every
/// receiver returned by [AudioTransport::subscribe].
#[async_trait]
pub trait AudioTransport: Send + Sync {
    /// Resolves once the transport is able to connect to channels.
    async fn wait_until_ready(&self);

    /// Joins the given channel.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<TransportHandle, TransportError>;

    /// Plays a track on the connection, replacing whatever was playing.
    async fn play(
        &self,
        handle: &TransportHandle,
        track: &Track,
        volume: Volume,
    ) -> Result<(), TransportError>;

    /// Changes the volume of the connection.
    async fn set_volume(
        &self,
        handle: &TransportHandle,
        volume: Volume,
    ) -> Result<(), TransportError>;

    /// Leaves the channel. Disconnecting a connection that is already gone succeeds.
    async fn disconnect(&self, handle: &TransportHandle) -> Result<(), TransportError>;

    /// Sends a human readable message to the given channel.
    async fn announce(&self, channel_id: ChannelId, message: &str) -> Result<(), TransportError>;

    fn subscribe(&self) -> TransportEventReceiver;
}
