mod connection;
mod session;

use std::{collections::HashSet, sync::Arc};

use dashmap::DashMap;
use log::{info, warn};
use radiobot_core::{ArcedResolver, ArcedTransport, Config, GuildId, TransportEvent};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

pub use connection::*;
pub use session::*;

use crate::{RadioConfig, RadioEvent, RadioEventReceiver, RadioEventSender};

pub type SessionStore = Arc<DashMap<GuildId, Arc<RadioSession>>>;

/// The registry of live sessions, at most one per guild.
///
/// Both the reconciliation loop and the control surface start sessions through
/// here. Registering a session for a guild that already has one replaces and
/// disconnects the old one, so the last registration always wins.
#[derive(Clone)]
pub struct SessionManager {
    transport: ArcedTransport,
    resolver: ArcedResolver,
    store: SessionStore,
    events: RadioEventSender,
    config: Config,
}

impl SessionManager {
    pub fn new(
        transport: ArcedTransport,
        resolver: ArcedResolver,
        events: RadioEventSender,
        config: Config,
    ) -> Self {
        Self {
            transport,
            resolver,
            store: Default::default(),
            events,
            config,
        }
    }

    /// Registers a session for the radio and spawns its worker
    pub fn start(&self, radio: RadioConfig) -> Arc<RadioSession> {
        let guild_id = radio.guild_id;
        let (session, worker) = RadioSession::new(self, radio);

        // Registered before the worker runs, so a worker that ends right away still deregisters
        let previous = self.store.insert(guild_id, session.clone());

        if let Some(previous) = previous {
            warn!(
                "Replacing radio session {} of guild {} with {}",
                previous.id, guild_id, session.id
            );

            previous.disconnect();

            self.emit(RadioEvent::SessionReplaced {
                guild_id,
                previous: previous.id,
                current: session.id,
            });
        }

        info!("Starting radio session {} for guild {}", session.id, guild_id);
        tokio::spawn(worker.run());

        session
    }

    /// Deregisters the session of the guild and disconnects it
    pub fn stop(&self, guild_id: GuildId) -> Option<Arc<RadioSession>> {
        let (_, session) = self.store.remove(&guild_id)?;

        info!("Stopping radio session {} of guild {}", session.id, guild_id);
        session.disconnect();

        Some(session)
    }

    /// Like [SessionManager::stop], but only if the guild is still served by the given session
    pub fn stop_session(&self, guild_id: GuildId, session_id: SessionId) -> bool {
        let Some((_, session)) = self
            .store
            .remove_if(&guild_id, |_, s| s.id == session_id)
        else {
            return false;
        };

        info!("Stopping radio session {} of guild {}", session.id, guild_id);
        session.disconnect();

        true
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<RadioSession>> {
        self.store.get(&guild_id).map(|s| s.clone())
    }

    pub fn list(&self) -> Vec<Arc<RadioSession>> {
        self.store.iter().map(|s| s.clone()).collect()
    }

    /// The guilds with a registered session that is still running
    pub fn active_guilds(&self) -> HashSet<GuildId> {
        self.store
            .iter()
            .filter(|s| s.is_alive())
            .map(|s| *s.key())
            .collect()
    }

    pub fn subscribe(&self) -> RadioEventReceiver {
        self.events.subscribe()
    }

    /// Spawns the task routing transport events to the session of their guild
    pub fn listen(&self) -> JoinHandle<()> {
        // Subscribe now, so no event sent after this returns is missed
        let mut receiver = self.transport.subscribe();
        let manager = self.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => manager.dispatch(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} transport events", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn dispatch(&self, event: TransportEvent) {
        if let Some(session) = self.get(event.guild_id) {
            session.handle_event(event);
        }
    }

    /// Removes the session from the registry, unless it was already replaced
    fn deregister(&self, guild_id: GuildId, session_id: SessionId) -> bool {
        self.store
            .remove_if(&guild_id, |_, s| s.id == session_id)
            .is_some()
    }

    pub(crate) fn emit(&self, event: RadioEvent) {
        // Nobody listening is fine
        self.events.send(event).ok();
    }
}
