use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use radiobot_core::{
    AudioTransport, ChannelId, Config, ConnectionId, GuildId, ResolveError, Track,
    TrackEndReason, TrackResolver, TransportError, TransportEvent, TransportEventKind,
    TransportEventReceiver, TransportEventSender, TransportHandle, Volume,
};
use tokio::sync::broadcast;

use crate::{Radio, RadioConfig, SqliteDatabase, StationSource};

/// Everything a [MockTransport] was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    Play {
        guild_id: GuildId,
        connection_id: ConnectionId,
        identifier: String,
        volume: u16,
    },
    SetVolume {
        guild_id: GuildId,
        volume: u16,
    },
    Disconnect {
        guild_id: GuildId,
        connection_id: ConnectionId,
    },
    Announce {
        channel_id: ChannelId,
        message: String,
    },
}

#[derive(Default)]
struct TransportState {
    calls: Vec<TransportCall>,
    next_connection: ConnectionId,
    handed_out: Vec<TransportHandle>,
    live: HashMap<ConnectionId, GuildId>,
    refused: HashSet<ChannelId>,
    fail_plays: bool,
    connect_delay: Option<Duration>,
}

/// An in-memory transport that records every call
pub struct MockTransport {
    state: Mutex<TransportState>,
    events: TransportEventSender,
}

impl Default for MockTransport {
    fn default() -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            state: Default::default(),
            events,
        }
    }
}

impl MockTransport {
    /// Makes connecting to the channel fail as if it didn't exist
    pub fn refuse(&self, channel_id: ChannelId) {
        self.state.lock().refused.insert(channel_id);
    }

    /// Makes connects take a while after the connection already exists on the transport
    pub fn slow_connects(&self, delay: Duration) {
        self.state.lock().connect_delay = Some(delay);
    }

    pub fn fail_plays(&self, fail: bool) {
        self.state.lock().fail_plays = fail;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    pub fn connects(&self, guild: GuildId) -> usize {
        self.count(|c| matches!(c, TransportCall::Connect { guild_id, .. } if *guild_id == guild))
    }

    pub fn disconnects(&self, guild: GuildId) -> usize {
        self.count(
            |c| matches!(c, TransportCall::Disconnect { guild_id, .. } if *guild_id == guild),
        )
    }

    pub fn live_connections(&self, guild: GuildId) -> usize {
        self.state
            .lock()
            .live
            .values()
            .filter(|g| **g == guild)
            .count()
    }

    /// The identifiers of the tracks played in the guild, in order
    pub fn plays(&self, guild: GuildId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Play {
                    guild_id,
                    identifier,
                    ..
                } if guild_id == guild => Some(identifier),
                _ => None,
            })
            .collect()
    }

    /// The volume of the last volume change in the guild
    pub fn last_volume(&self, guild: GuildId) -> Option<u16> {
        self.calls().into_iter().rev().find_map(|c| match c {
            TransportCall::SetVolume { guild_id, volume } if guild_id == guild => Some(volume),
            _ => None,
        })
    }

    pub fn announcements(&self, channel: ChannelId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Announce {
                    channel_id,
                    message,
                } if channel_id == channel => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Every connection handed out for the guild, oldest first
    pub fn connections(&self, guild: GuildId) -> Vec<ConnectionId> {
        self.state
            .lock()
            .handed_out
            .iter()
            .filter(|h| h.guild_id == guild)
            .map(|h| h.connection_id)
            .collect()
    }

    pub fn end_track(&self, guild_id: GuildId, connection_id: ConnectionId, reason: TrackEndReason) {
        self.publish(guild_id, connection_id, TransportEventKind::TrackEnd { reason });
    }

    /// Closes the connection from the outside, like a kick would
    pub fn close(&self, guild_id: GuildId, connection_id: ConnectionId) {
        self.publish(
            guild_id,
            connection_id,
            TransportEventKind::ConnectionClosed { code: Some(4014) },
        );
    }

    fn publish(&self, guild_id: GuildId, connection_id: ConnectionId, kind: TransportEventKind) {
        self.events
            .send(TransportEvent {
                guild_id,
                connection_id,
                kind,
            })
            .ok();
    }

    fn count(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl AudioTransport for MockTransport {
    async fn wait_until_ready(&self) {}

    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<TransportHandle, TransportError> {
        let (handle, delay) = {
            let mut state = self.state.lock();
            state.calls.push(TransportCall::Connect {
                guild_id,
                channel_id,
            });

            if state.refused.contains(&channel_id) {
                return Err(TransportError::ChannelNotFound(channel_id));
            }

            state.next_connection += 1;

            let handle = TransportHandle {
                guild_id,
                channel_id,
                connection_id: state.next_connection,
            };

            state.live.insert(handle.connection_id, guild_id);
            state.handed_out.push(handle.clone());

            (handle, state.connect_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(handle)
    }

    async fn play(
        &self,
        handle: &TransportHandle,
        track: &Track,
        volume: Volume,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();

        if state.fail_plays {
            return Err(TransportError::Rejected("Playback is broken".to_string()));
        }

        state.calls.push(TransportCall::Play {
            guild_id: handle.guild_id,
            connection_id: handle.connection_id,
            identifier: track.identifier.clone(),
            volume: volume.get(),
        });

        Ok(())
    }

    async fn set_volume(
        &self,
        handle: &TransportHandle,
        volume: Volume,
    ) -> Result<(), TransportError> {
        self.state.lock().calls.push(TransportCall::SetVolume {
            guild_id: handle.guild_id,
            volume: volume.get(),
        });

        Ok(())
    }

    async fn disconnect(&self, handle: &TransportHandle) -> Result<(), TransportError> {
        let mut state = self.state.lock();

        state.live.remove(&handle.connection_id);
        state.calls.push(TransportCall::Disconnect {
            guild_id: handle.guild_id,
            connection_id: handle.connection_id,
        });

        Ok(())
    }

    async fn announce(&self, channel_id: ChannelId, message: &str) -> Result<(), TransportError> {
        self.state.lock().calls.push(TransportCall::Announce {
            channel_id,
            message: message.to_string(),
        });

        Ok(())
    }

    fn subscribe(&self) -> TransportEventReceiver {
        self.events.subscribe()
    }
}

/// Resolves references from a mutable map. Unknown references resolve to nothing.
#[derive(Default)]
pub struct MockResolver {
    playlists: Mutex<HashMap<String, Vec<Track>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockResolver {
    /// Sets the tracks of a reference. Each track is identified by its title.
    pub fn set(&self, reference: &str, titles: &[&str]) {
        let tracks = titles.iter().map(|t| Track::new(*t, *t)).collect();

        self.failing.lock().remove(reference);
        self.playlists.lock().insert(reference.to_string(), tracks);
    }

    pub fn fail(&self, reference: &str) {
        self.failing.lock().insert(reference.to_string());
    }

    pub fn calls(&self, reference: &str) -> usize {
        self.calls.lock().get(reference).copied().unwrap_or_default()
    }
}

#[async_trait]
impl TrackResolver for MockResolver {
    async fn resolve(&self, reference: &str) -> Result<Vec<Track>, ResolveError> {
        *self.calls.lock().entry(reference.to_string()).or_default() += 1;

        if self.failing.lock().contains(reference) {
            return Err(ResolveError::Unavailable);
        }

        Ok(self
            .playlists
            .lock()
            .get(reference)
            .cloned()
            .unwrap_or_default())
    }
}

/// Polls the condition until it holds, panicking after about two seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }

        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("Condition was never met");
}

/// A radio playing the link in channel `guild_id * 10`
pub fn radio(guild_id: GuildId, link: &str) -> RadioConfig {
    RadioConfig {
        guild_id,
        channel_id: guild_id * 10,
        station: StationSource::Link(link.to_string()),
        always_shuffle: false,
        managing_roles: vec![],
    }
}

pub fn test_config() -> Config {
    Config {
        tick_interval: Duration::from_millis(20),
        store_retry_backoff: Duration::from_millis(1),
        ready_poll_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

pub struct TestRadio {
    pub radio: Radio<SqliteDatabase>,
    pub transport: Arc<MockTransport>,
    pub resolver: Arc<MockResolver>,
}

/// A radio backed by an in-memory database and the mocks
pub async fn test_radio() -> TestRadio {
    let config = test_config();
    let transport = Arc::new(MockTransport::default());
    let resolver = Arc::new(MockResolver::default());

    let database = SqliteDatabase::in_memory(config.clone())
        .await
        .expect("in-memory database opens");

    let radio = Radio::new(database, transport.clone(), resolver.clone(), config);

    TestRadio {
        radio,
        transport,
        resolver,
    }
}
