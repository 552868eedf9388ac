use std::{fmt::Display, sync::Arc};

use log::{debug, info, warn};
use parking_lot::Mutex;
use radiobot_core::{
    ConnectionId, GuildId, Id, Track, TrackEndReason, TransportError, TransportEvent,
    TransportEventKind, Volume,
};
use thiserror::Error;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    Notify,
};

use crate::{QueueError, RadioConfig, RadioEvent, StationQueue};

use super::{ConnectionGuard, SessionManager};

pub type SessionId = Id<RadioSession>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Joining the configured channel
    Connecting,
    /// Resolving the station into a queue
    Filling,
    /// A track is playing
    Playing,
    /// Connected, but the station had nothing to play
    Idle,
    /// The session is over
    Disconnected,
}

/// What a session looks like from the outside at a point in time
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: SessionState,
    /// The radio the session plays, updated on reconfiguration
    pub radio: RadioConfig,
    pub volume: Volume,
    pub current: Option<Track>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to connect: {0}")]
    Connect(TransportError),
    #[error("Failed to play track: {0}")]
    Play(TransportError),
    #[error("Connection was closed by the transport (code {0:?})")]
    ConnectionClosed(Option<u16>),
}

#[derive(Debug)]
pub(super) enum SessionCommand {
    TrackEnded {
        connection_id: ConnectionId,
        reason: TrackEndReason,
    },
    ConnectionClosed {
        connection_id: ConnectionId,
        code: Option<u16>,
    },
    Reconfigure(RadioConfig),
    ApplyVolume,
    Skip,
}

/// A guild's live radio. The session itself is driven by a worker task,
/// this is the handle kept in the registry to talk to it.
pub struct RadioSession {
    pub id: SessionId,
    pub guild_id: GuildId,
    commands: UnboundedSender<SessionCommand>,
    status: Arc<Mutex<SessionSnapshot>>,
    shutdown: Arc<Notify>,
}

/// Owns the queue and the connection of a session, and runs its state machine
pub(super) struct SessionWorker {
    id: SessionId,
    guild_id: GuildId,
    radio: RadioConfig,
    queue: StationQueue,
    connection: Option<ConnectionGuard>,
    commands: UnboundedReceiver<SessionCommand>,
    status: Arc<Mutex<SessionSnapshot>>,
    shutdown: Arc<Notify>,
    manager: SessionManager,
}

impl RadioSession {
    /// Creates a session and the worker that has to be spawned to run it
    pub(super) fn new(manager: &SessionManager, radio: RadioConfig) -> (Arc<Self>, SessionWorker) {
        let id = SessionId::new();
        let (commands, receiver) = unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let status = Arc::new(Mutex::new(SessionSnapshot {
            id,
            state: SessionState::Connecting,
            radio: radio.clone(),
            volume: manager.config.default_volume,
            current: None,
        }));

        let queue = StationQueue::new(
            manager.resolver.clone(),
            radio.station.playlist_link(),
            radio.always_shuffle,
        );

        let session = Arc::new(Self {
            id,
            guild_id: radio.guild_id,
            commands,
            status: status.clone(),
            shutdown: shutdown.clone(),
        });

        let worker = SessionWorker {
            id,
            guild_id: radio.guild_id,
            radio,
            queue,
            connection: None,
            commands: receiver,
            status,
            shutdown,
            manager: manager.clone(),
        };

        (session, worker)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.status.lock().clone()
    }

    pub fn state(&self) -> SessionState {
        self.status.lock().state
    }

    pub fn radio(&self) -> RadioConfig {
        self.status.lock().radio.clone()
    }

    pub fn volume(&self) -> Volume {
        self.status.lock().volume
    }

    /// Stores the volume right away, the transport is updated once the session gets to it.
    /// A session that is still connecting starts playing at this volume.
    pub fn set_volume(&self, volume: Volume) {
        self.status.lock().volume = volume;
        self.send(SessionCommand::ApplyVolume);
    }

    pub fn skip(&self) {
        self.send(SessionCommand::Skip);
    }

    /// Hands the session an updated radio. A different station is refilled immediately.
    pub fn reconfigure(&self, radio: RadioConfig) {
        self.status.lock().radio = radio.clone();
        self.send(SessionCommand::Reconfigure(radio));
    }

    /// Forces the session to disconnect, whatever it is doing
    pub fn disconnect(&self) {
        self.shutdown.notify_one();
    }

    /// Returns false once the worker is gone
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    pub(super) fn handle_event(&self, event: TransportEvent) {
        let command = match event.kind {
            TransportEventKind::TrackEnd { reason } => SessionCommand::TrackEnded {
                connection_id: event.connection_id,
                reason,
            },
            TransportEventKind::ConnectionClosed { code } => SessionCommand::ConnectionClosed {
                connection_id: event.connection_id,
                code,
            },
        };

        self.send(command)
    }

    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            debug!("Session {} of guild {} already ended", self.id, self.guild_id);
        }
    }
}

impl SessionWorker {
    pub(super) async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        let (id, guild_id) = (self.id, self.guild_id);

        // Connecting is not raced against a shutdown, a handle the transport
        // hands out has to end up in a guard. A pending shutdown is seen right after.
        let result = match self.connect().await {
            Ok(()) => tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    info!("Disconnecting radio session {} of guild {}", id, guild_id);
                    Ok(())
                }
                result = self.drive() => result,
            },
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!(
                "Radio session {} of guild {} failed: {}",
                self.id, self.guild_id, e
            );
        }

        if let Some(connection) = self.connection.take() {
            connection.release().await;
        }

        self.status.lock().current = None;
        self.set_state(SessionState::Disconnected);
        self.manager.deregister(self.guild_id, self.id);

        self.manager.emit(RadioEvent::SessionEnded {
            guild_id: self.guild_id,
            session_id: self.id,
            error: result.err().map(|e| e.to_string()),
        });
    }

    async fn connect(&mut self) -> Result<(), SessionError> {
        self.set_state(SessionState::Connecting);

        let handle = self
            .manager
            .transport
            .connect(self.guild_id, self.radio.channel_id)
            .await
            .map_err(SessionError::Connect)?;

        info!(
            "Connected to channel {} of guild {}",
            handle.channel_id, self.guild_id
        );

        self.connection = Some(ConnectionGuard::new(
            self.manager.transport.clone(),
            handle,
        ));

        Ok(())
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        self.fill().await?;

        while let Some(command) = self.commands.recv().await {
            self.handle_command(command).await?;
        }

        Ok(())
    }

    async fn handle_command(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::TrackEnded {
                connection_id,
                reason,
            } => {
                if !self.owns(connection_id) {
                    return Ok(());
                }

                if self.state() == SessionState::Idle || !reason.advances_queue() {
                    debug!("Ignoring track end ({:?}) in guild {}", reason, self.guild_id);
                    return Ok(());
                }

                self.play_next().await
            }
            SessionCommand::ConnectionClosed {
                connection_id,
                code,
            } => {
                if self.owns(connection_id) {
                    return Err(SessionError::ConnectionClosed(code));
                }

                Ok(())
            }
            SessionCommand::Reconfigure(radio) => self.reconfigure(radio).await,
            SessionCommand::ApplyVolume => {
                self.apply_volume().await;
                Ok(())
            }
            SessionCommand::Skip => {
                if self.state() == SessionState::Idle {
                    return Ok(());
                }

                self.play_next().await
            }
        }
    }

    /// Resolves the station into a fresh queue and starts playing it
    async fn fill(&mut self) -> Result<(), SessionError> {
        self.status.lock().current = None;
        self.set_state(SessionState::Filling);

        match self.queue.refill().await {
            Ok(track_count) => {
                self.manager.emit(RadioEvent::QueueRefilled {
                    guild_id: self.guild_id,
                    track_count,
                });

                self.play_next().await
            }
            Err(e) => {
                self.idle(e).await;
                Ok(())
            }
        }
    }

    async fn play_next(&mut self) -> Result<(), SessionError> {
        let track = match self.queue.next().await {
            Ok(track) => track,
            Err(e) => {
                self.idle(e).await;
                return Ok(());
            }
        };

        // Only reachable once connected
        let Some(connection) = &self.connection else {
            return Ok(());
        };

        let volume = self.status.lock().volume;

        self.manager
            .transport
            .play(connection.handle(), &track, volume)
            .await
            .map_err(SessionError::Play)?;

        info!("Playing {} in guild {}", track.title, self.guild_id);

        self.status.lock().current = Some(track.clone());
        self.set_state(SessionState::Playing);

        self.manager.emit(RadioEvent::TrackStarted {
            guild_id: self.guild_id,
            track,
        });

        Ok(())
    }

    /// Stays connected but silent until the radio is reconfigured or restarted
    async fn idle(&mut self, error: QueueError) {
        warn!("Radio of guild {} has nothing to play: {}", self.guild_id, error);

        self.status.lock().current = None;
        self.set_state(SessionState::Idle);

        self.manager.emit(RadioEvent::RefillFailed {
            guild_id: self.guild_id,
            error: error.to_string(),
        });

        let message = format!(
            "Failed to regenerate the queue\nRadio link: {}",
            self.queue.link()
        );

        if let Err(e) = self
            .manager
            .transport
            .announce(self.radio.channel_id, &message)
            .await
        {
            warn!(
                "Failed to report the empty queue in guild {}: {}",
                self.guild_id, e
            );
        }
    }

    async fn reconfigure(&mut self, radio: RadioConfig) -> Result<(), SessionError> {
        let station_changed = radio.station.playlist_link() != self.radio.station.playlist_link();

        self.queue.set_shuffle(radio.always_shuffle);
        self.radio = radio;

        if !station_changed {
            return Ok(());
        }

        info!(
            "Station of guild {} changed to {}",
            self.guild_id,
            self.radio.station.playlist_link()
        );

        self.queue.set_source(self.radio.station.playlist_link());
        self.fill().await
    }

    async fn apply_volume(&self) {
        if self.state() != SessionState::Playing {
            return;
        }

        let Some(connection) = &self.connection else {
            return;
        };

        let volume = self.status.lock().volume;

        if let Err(e) = self
            .manager
            .transport
            .set_volume(connection.handle(), volume)
            .await
        {
            warn!("Failed to set volume in guild {}: {}", self.guild_id, e);
        }
    }

    fn owns(&self, connection_id: ConnectionId) -> bool {
        self.connection.as_ref().map(|c| c.id()) == Some(connection_id)
    }

    fn state(&self) -> SessionState {
        self.status.lock().state
    }

    fn set_state(&self, new_state: SessionState) {
        {
            let mut status = self.status.lock();

            if status.state == new_state {
                return;
            }

            status.state = new_state;
        }

        debug!("Radio of guild {} is now {}", self.guild_id, new_state);

        self.manager.emit(RadioEvent::SessionStateUpdate {
            guild_id: self.guild_id,
            session_id: self.id,
            new_state,
        });
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Filling => "filling",
            SessionState::Playing => "playing",
            SessionState::Idle => "idle",
            SessionState::Disconnected => "disconnected",
        };

        f.write_str(name)
    }
}
