use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use futures_util::Stream;
use parking_lot::Mutex;
use radiobot_core::{GuildId, Id};
use radiobot_radio::RadioEvent;
use serde::Serialize;
use std::{
    collections::VecDeque,
    convert::Infallible,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll, Waker},
};
use utoipa::ToSchema;

use crate::{
    context::ServerContext,
    schemas::EventsQuery,
    serialized::{SessionState, ToSerialized, Track},
    Router,
};

type ConnectionId = Id<Connection>;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A session moved to another state
    SessionStateUpdate {
        guild_id: u64,
        session_id: u64,
        new_state: SessionState,
    },
    /// A session started playing a track
    TrackStarted { guild_id: u64, track: Track },
    /// A session resolved its station into a fresh queue
    QueueRefilled { guild_id: u64, track_count: usize },
    /// A session could not fill its queue and went idle
    RefillFailed { guild_id: u64, error: String },
    /// The volume of a radio was changed
    VolumeUpdate { guild_id: u64, volume: u16 },
    /// A session was replaced by a newer one
    SessionReplaced {
        guild_id: u64,
        previous: u64,
        current: u64,
    },
    /// A session disconnected
    SessionEnded {
        guild_id: u64,
        session_id: u64,
        error: Option<String>,
    },
}

impl ServerEvent {
    fn guild_id(&self) -> GuildId {
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

impl From<RadioEvent> for ServerEvent {
    fn from(value: RadioEvent) -> Self {
        match value {
            RadioEvent::SessionStateUpdate {
                guild_id,
                session_id,
                new_state,
            } => Self::SessionStateUpdate {
                guild_id,
                session_id: session_id.value(),
                new_state: new_state.to_serialized(),
            },
            RadioEvent::TrackStarted { guild_id, track } => Self::TrackStarted {
                guild_id,
                track: track.to_serialized(),
            },
            RadioEvent::QueueRefilled {
                guild_id,
                track_count,
            } => Self::QueueRefilled {
                guild_id,
                track_count,
            },
            RadioEvent::RefillFailed { guild_id, error } => Self::RefillFailed { guild_id, error },
            RadioEvent::VolumeUpdate { guild_id, volume } => Self::VolumeUpdate {
                guild_id,
                volume: volume.get(),
            },
            RadioEvent::SessionReplaced {
                guild_id,
                previous,
                current,
            } => Self::SessionReplaced {
                guild_id,
                previous: previous.value(),
                current: current.value(),
            },
            RadioEvent::SessionEnded {
                guild_id,
                session_id,
                error,
            } => Self::SessionEnded {
                guild_id,
                session_id: session_id.value(),
                error,
            },
        }
    }
}

/// Manages server sent event connections
pub struct ServerSentEvents {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    /// Only events of this guild are sent, if set
    guild_id: Option<GuildId>,
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
        })
    }

    pub fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter() {
            if connection.wants(&event) {
                connection.send(event.clone())
            }
        }
    }

    fn connect(&self, guild_id: Option<GuildId>) -> ConnectionHandle {
        let connection = Connection::new(guild_id);
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }
}

impl Connection {
    fn new(guild_id: Option<GuildId>) -> Self {
        Self {
            id: ConnectionId::new(),
            guild_id,
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn wants(&self, event: &ServerEvent) -> bool {
        self.guild_id.map_or(true, |g| g == event.guild_id())
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push_back(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        while let Some(message) = pending_messages.pop_front() {
            match Event::default().json_data(&message) {
                Ok(event) => return Poll::Ready(Some(Ok(event))),
                Err(e) => log::warn!("Failed to serialize event: {}", e),
            }
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    params(EventsQuery),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of radio events",
            body = ServerEvent
        )
    )
)]
async fn event_stream(
    State(context): State<ServerContext>,
    Query(query): Query<EventsQuery>,
) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect(query.guild_id)).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_update(guild_id: GuildId) -> ServerEvent {
        ServerEvent::VolumeUpdate {
            guild_id,
            volume: 50,
        }
    }

    #[test]
    fn filters_connections_by_guild() {
        let sse = ServerSentEvents::new();

        let everything = sse.connect(None);
        let only_one = sse.connect(Some(1));

        sse.broadcast(volume_update(1));
        sse.broadcast(volume_update(2));

        assert_eq!(everything.pending_messages.lock().len(), 2);
        assert_eq!(only_one.pending_messages.lock().len(), 1);
    }

    #[test]
    fn dropped_handles_disconnect() {
        let sse = ServerSentEvents::new();

        let handle = sse.connect(None);
        assert_eq!(sse.connections.lock().len(), 1);

        drop(handle);
        assert!(sse.connections.lock().is_empty());
    }

    #[test]
    fn events_are_tagged() {
        let json = serde_json::to_value(volume_update(3)).unwrap();

        assert_eq!(json["type"], "volume-update");
        assert_eq!(json["guild_id"], 3);
    }
}
