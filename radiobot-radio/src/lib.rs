mod control;
mod db;
mod events;
mod input;
mod queues;
mod reconcile;
mod sessions;
mod util;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use control::*;
pub use db::*;
pub use events::*;
pub use input::*;
pub use queues::*;
pub use reconcile::*;
pub use sessions::*;
pub use util::*;

use radiobot_core::{ArcedResolver, ArcedTransport, Config};
use tokio::{sync::broadcast, task::JoinHandle};

/// The radio system, keeping a session going for every configured guild.
pub struct Radio<Db> {
    context: RadioContext<Db>,
    dispatcher: JoinHandle<()>,
}

/// A type passed to the components of the radio system, to access the store, the sessions and the collaborators.
pub struct RadioContext<Db> {
    pub database: Arc<Db>,
    pub sessions: SessionManager,
    pub transport: ArcedTransport,
    pub config: Config,
}

impl<Db> Radio<Db>
where
    Db: Database,
{
    /// Creates the radio system. Must be called within a tokio runtime, as it
    /// starts routing transport events to the sessions right away.
    pub fn new(
        database: Db,
        transport: ArcedTransport,
        resolver: ArcedResolver,
        config: Config,
    ) -> Self {
        let (events, _) = broadcast::channel(256);

        let sessions = SessionManager::new(transport.clone(), resolver, events, config.clone());
        let dispatcher = sessions.listen();

        let context = RadioContext {
            database: Arc::new(database),
            sessions,
            transport,
            config,
        };

        Self {
            context,
            dispatcher,
        }
    }

    pub fn context(&self) -> &RadioContext<Db> {
        &self.context
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.context.sessions
    }

    /// Creates the loop that starts sessions for configured radios
    pub fn reconcile_loop(&self) -> ReconcileLoop<Db> {
        ReconcileLoop::new(&self.context)
    }

    pub fn subscribe(&self) -> RadioEventReceiver {
        self.context.sessions.subscribe()
    }
}

impl<Db> Drop for Radio<Db> {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

impl<Db> Clone for RadioContext<Db>
where
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            sessions: self.sessions.clone(),
            transport: self.transport.clone(),
            config: self.config.clone(),
        }
    }
}
