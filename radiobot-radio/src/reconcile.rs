use std::{collections::HashSet, sync::Arc, time::Duration};

use log::{error, info, warn};
use radiobot_core::{ArcedTransport, GuildId};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{Database, DatabaseError, RadioContext, RadioSession, SessionManager};

/// Periodically makes sure every configured radio has a session, and that
/// no session outlives its radio.
///
/// Only guilds without a registered session are started, so running a tick
/// twice in a row starts nothing the second time. Sessions that are idle
/// stay registered and are left alone.
pub struct ReconcileLoop<Db> {
    database: Arc<Db>,
    sessions: SessionManager,
    transport: ArcedTransport,
    interval: Duration,
}

impl<Db> ReconcileLoop<Db>
where
    Db: Database,
{
    pub fn new(context: &RadioContext<Db>) -> Self {
        Self {
            database: context.database.clone(),
            sessions: context.sessions.clone(),
            transport: context.transport.clone(),
            interval: context.config.tick_interval,
        }
    }

    /// Starts a session for every configured guild that lacks one, returning those guilds.
    /// Sessions of guilds that no longer have a radio are stopped.
    pub async fn tick(&self) -> Result<Vec<GuildId>, DatabaseError> {
        // Taken before listing, a session started after the listing is never swept
        let registered = self.sessions.list();
        let enabled = self.database.list_enabled_guilds().await?;

        self.sweep(registered, &enabled).await?;

        let active = self.sessions.active_guilds();

        let missing: Vec<_> = enabled.difference(&active).copied().collect();

        if missing.is_empty() {
            return Ok(vec![]);
        }

        // Radios deleted since listing are simply not returned
        let radios = self.database.radios_by_guilds(&missing).await?;
        let started: Vec<_> = radios.iter().map(|r| r.guild_id).collect();

        for radio in radios {
            self.sessions.start(radio);
        }

        if !started.is_empty() {
            info!("Started {} radio sessions", started.len());
        }

        Ok(started)
    }

    /// Stops the sessions whose radio was deleted, which happens when a delete
    /// lands while a tick is starting the session
    async fn sweep(
        &self,
        registered: Vec<Arc<RadioSession>>,
        enabled: &HashSet<GuildId>,
    ) -> Result<(), DatabaseError> {
        let orphaned: Vec<_> = registered
            .into_iter()
            .filter(|s| !enabled.contains(&s.guild_id))
            .collect();

        if orphaned.is_empty() {
            return Ok(());
        }

        // A radio saved since listing keeps its session
        let guild_ids: Vec<_> = orphaned.iter().map(|s| s.guild_id).collect();
        let saved: HashSet<_> = self
            .database
            .radios_by_guilds(&guild_ids)
            .await?
            .into_iter()
            .map(|r| r.guild_id)
            .collect();

        for session in orphaned {
            if saved.contains(&session.guild_id) {
                continue;
            }

            if self.sessions.stop_session(session.guild_id, session.id) {
                warn!(
                    "Stopped radio session {} of guild {}, which has no radio",
                    session.id, session.guild_id
                );
            }
        }

        Ok(())
    }

    /// Waits for the transport, then ticks forever
    pub async fn run(self) {
        info!("Waiting for the transport to be ready");
        self.transport.wait_until_ready().await;

        info!("Reconciling radios every {} ms", self.interval.as_millis());

        let mut ticks = interval(self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;

            if let Err(e) = self.tick().await {
                error!("Failed to reconcile radios: {}", e);
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use radiobot_core::TrackEndReason;

    use crate::{
        testing::{eventually, test_radio},
        NewRadio, SessionState, StationRef,
    };

    use super::*;

    fn new_radio(guild_id: GuildId, link: &str) -> NewRadio {
        NewRadio {
            guild_id,
            channel_id: guild_id * 10,
            station: StationRef::Link(link.to_string()),
            always_shuffle: false,
            managing_roles: vec![],
        }
    }

    #[tokio::test]
    async fn ticks_are_idempotent() {
        let t = test_radio().await;
        t.resolver.set("abc", &["A"]);

        let database = &t.radio.context().database;
        database.upsert_radio(new_radio(1, "abc")).await.unwrap();
        database.upsert_radio(new_radio(2, "abc")).await.unwrap();

        let reconcile = t.radio.reconcile_loop();

        let mut started = reconcile.tick().await.unwrap();
        started.sort();
        assert_eq!(started, vec![1, 2]);

        assert!(reconcile.tick().await.unwrap().is_empty());

        eventually(|| t.transport.plays(1).len() == 1 && t.transport.plays(2).len() == 1).await;
        assert!(reconcile.tick().await.unwrap().is_empty());
        assert_eq!(t.transport.connects(1), 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_not_restarted() {
        let t = test_radio().await;

        let database = &t.radio.context().database;
        database.upsert_radio(new_radio(1, "empty")).await.unwrap();

        let reconcile = t.radio.reconcile_loop();
        reconcile.tick().await.unwrap();

        let sessions = t.radio.sessions();
        eventually(|| sessions.get(1).map(|s| s.state()) == Some(SessionState::Idle)).await;

        assert!(reconcile.tick().await.unwrap().is_empty());
        assert_eq!(t.resolver.calls("empty"), 1);
    }

    #[tokio::test]
    async fn failed_connects_are_retried_next_tick() {
        let t = test_radio().await;
        t.resolver.set("abc", &["A"]);
        t.transport.refuse(10);

        let database = &t.radio.context().database;
        database.upsert_radio(new_radio(1, "abc")).await.unwrap();

        let reconcile = t.radio.reconcile_loop();
        assert_eq!(reconcile.tick().await.unwrap(), vec![1]);

        let sessions = t.radio.sessions();
        eventually(|| sessions.get(1).is_none()).await;

        assert_eq!(reconcile.tick().await.unwrap(), vec![1]);
        eventually(|| t.transport.connects(1) == 2).await;
    }

    #[tokio::test]
    async fn kicked_radios_come_back() {
        let t = test_radio().await;
        t.resolver.set("abc", &["A"]);

        let database = &t.radio.context().database;
        database.upsert_radio(new_radio(1, "abc")).await.unwrap();

        let reconcile = t.radio.reconcile_loop();
        reconcile.tick().await.unwrap();
        eventually(|| t.transport.plays(1).len() == 1).await;

        let connection = t.transport.connections(1)[0];
        t.transport.close(1, connection);

        let sessions = t.radio.sessions();
        eventually(|| sessions.get(1).is_none()).await;

        // Events for the old connection don't affect the new session
        reconcile.tick().await.unwrap();
        eventually(|| t.transport.plays(1).len() == 2).await;
        t.transport.end_track(1, connection, TrackEndReason::Finished);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(t.transport.plays(1).len(), 2);
    }

    #[tokio::test]
    async fn unconfigured_guilds_are_skipped() {
        let t = test_radio().await;

        let database = &t.radio.context().database;
        database.upsert_radio(new_radio(1, "abc")).await.unwrap();
        database.delete_radio(1).await.unwrap();

        let reconcile = t.radio.reconcile_loop();

        assert!(reconcile.tick().await.unwrap().is_empty());
        assert_eq!(t.transport.connects(1), 0);
    }

    #[tokio::test]
    async fn sessions_without_a_radio_are_stopped() {
        let t = test_radio().await;
        t.resolver.set("abc", &["A"]);

        let database = &t.radio.context().database;
        let radio = database.upsert_radio(new_radio(1, "abc")).await.unwrap();
        database.upsert_radio(new_radio(2, "abc")).await.unwrap();

        // A tick that fetched the radio just before it got deleted starts it anyway
        t.radio.delete_radio(1).await.unwrap();
        let sessions = t.radio.sessions();
        let orphan = sessions.start(radio);
        eventually(|| orphan.state() == SessionState::Playing).await;

        let reconcile = t.radio.reconcile_loop();
        assert_eq!(reconcile.tick().await.unwrap(), vec![2]);

        assert!(sessions.get(1).is_none());
        eventually(|| orphan.state() == SessionState::Disconnected).await;
        assert_eq!(t.transport.live_connections(1), 0);

        // Later ticks leave the deleted radio alone
        eventually(|| t.transport.plays(2).len() == 1).await;
        assert!(reconcile.tick().await.unwrap().is_empty());
        assert!(sessions.get(1).is_none());
        assert_eq!(t.transport.connects(1), 1);
        assert!(sessions.get(2).is_some());
    }

    #[tokio::test]
    async fn spawned_loop_starts_sessions() {
        let t = test_radio().await;
        t.resolver.set("abc", &["A"]);

        let database = &t.radio.context().database;
        database.upsert_radio(new_radio(1, "abc")).await.unwrap();

        let handle = t.radio.reconcile_loop().spawn();

        eventually(|| t.transport.plays(1) == vec!["A"]).await;

        // Configured later, picked up by a following tick
        database.upsert_radio(new_radio(2, "abc")).await.unwrap();
        eventually(|| t.transport.plays(2) == vec!["A"]).await;

        handle.abort();
    }
}
