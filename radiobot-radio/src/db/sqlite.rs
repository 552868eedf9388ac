use std::{collections::HashMap, collections::HashSet, future::Future, str::FromStr, time::Duration};

use async_trait::async_trait;
use log::{info, warn};
use radiobot_core::{Config, GuildId, Snowflake, UserId};
use sqlx::{
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Error as SqlxError, FromRow, QueryBuilder, Sqlite,
};
use tokio::time::sleep;

use crate::{
    Database, DatabaseError, IntoDatabaseError, NewRadio, NewStation, RadioConfig, Result,
    StationInfo, StationRef, StationSource,
};

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS radio_stations (
        station_id      INTEGER     PRIMARY KEY,
        station_name    TEXT        NOT NULL UNIQUE,
        playlist_link   TEXT        NOT NULL,
        owner_id        INTEGER     NOT NULL
    ) STRICT",
    "CREATE TABLE IF NOT EXISTS guild_radios (
        guild_id        INTEGER     NOT NULL PRIMARY KEY,
        channel_id      INTEGER     NOT NULL,
        station_link    TEXT,
        station_id      INTEGER     REFERENCES radio_stations (station_id) ON UPDATE CASCADE ON DELETE CASCADE,
        always_shuffle  INTEGER     NOT NULL DEFAULT TRUE,
        CHECK ((station_link IS NULL) <> (station_id IS NULL))
    ) STRICT, WITHOUT ROWID",
    "CREATE TABLE IF NOT EXISTS guild_managing_roles (
        guild_id        INTEGER     NOT NULL REFERENCES guild_radios (guild_id) ON UPDATE CASCADE ON DELETE CASCADE,
        role_id         INTEGER     NOT NULL,
        PRIMARY KEY (guild_id, role_id)
    ) STRICT, WITHOUT ROWID",
    "CREATE INDEX IF NOT EXISTS guild_radios_station_id ON guild_radios (station_id)",
];

const SELECT_RADIO: &str = "
    SELECT
        guild_radios.guild_id,
        guild_radios.channel_id,
        guild_radios.station_link,
        guild_radios.always_shuffle,
        radio_stations.station_id,
        radio_stations.station_name,
        radio_stations.playlist_link,
        radio_stations.owner_id
    FROM guild_radios
        LEFT JOIN radio_stations ON guild_radios.station_id = radio_stations.station_id";

const SELECT_ROLES: &str =
    "SELECT role_id FROM guild_managing_roles WHERE guild_id = ? ORDER BY role_id";

const SELECT_STATION: &str =
    "SELECT station_id, station_name, playlist_link, owner_id FROM radio_stations";

/// A SQLite database implementation for radiobot
pub struct SqliteDatabase {
    pool: SqlitePool,
    config: Config,
}

#[derive(FromRow)]
struct RadioRow {
    guild_id: i64,
    channel_id: i64,
    station_link: Option<String>,
    always_shuffle: bool,
    station_id: Option<i64>,
    station_name: Option<String>,
    playlist_link: Option<String>,
    owner_id: Option<i64>,
}

#[derive(FromRow)]
struct StationRow {
    station_id: i64,
    station_name: String,
    playlist_link: String,
    owner_id: i64,
}

impl SqliteDatabase {
    /// Opens the database at the given url, creating the file and the schema if needed
    pub async fn new(url: &str, config: Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.any())?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        let database = Self { pool, config };
        database.init().await?;

        info!("Opened database at {}", url);
        Ok(database)
    }

    /// Creates a database that lives as long as the returned value
    pub async fn in_memory(config: Config) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| e.any())?
            .foreign_keys(true);

        // Every connection to :memory: is its own database, so there can only be one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        let database = Self { pool, config };
        database.init().await?;

        Ok(database)
    }

    async fn init(&self) -> Result<()> {
        let pool = &self.pool;

        self.retrying(move || async move {
            let mut tx = pool.begin().await?;

            for statement in SCHEMA {
                query(statement).execute(&mut *tx).await?;
            }

            tx.commit().await
        })
        .await
        .map_err(|e| e.any())
    }

    /// Runs the operation, running it again while the database reports itself as busy
    async fn retrying<T, F, Fut>(&self, operation: F) -> std::result::Result<T, SqlxError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, SqlxError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Err(e) if is_transient(&e) && attempt + 1 < self.config.store_retry_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!("Database is busy, retrying in {:?}: {}", delay, e);

                    sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn upsert_radio(&self, new_radio: NewRadio) -> Result<RadioConfig> {
        let pool = &self.pool;
        let guild_id = to_db(new_radio.guild_id);
        let channel_id = to_db(new_radio.channel_id);
        let always_shuffle = new_radio.always_shuffle;
        let roles = &new_radio.managing_roles;

        let (station_link, station_id) = match &new_radio.station {
            StationRef::Link(link) => (Some(link.as_str()), None),
            StationRef::Catalog(id) => (None, Some(*id)),
        };

        let (row, roles) = self
            .retrying(move || async move {
                let mut tx = pool.begin().await?;

                query(
                    "INSERT INTO guild_radios (guild_id, channel_id, station_link, station_id, always_shuffle)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT (guild_id) DO UPDATE SET
                        channel_id = excluded.channel_id,
                        station_link = excluded.station_link,
                        station_id = excluded.station_id,
                        always_shuffle = excluded.always_shuffle",
                )
                .bind(guild_id)
                .bind(channel_id)
                .bind(station_link)
                .bind(station_id)
                .bind(always_shuffle)
                .execute(&mut *tx)
                .await?;

                query("DELETE FROM guild_managing_roles WHERE guild_id = ?")
                    .bind(guild_id)
                    .execute(&mut *tx)
                    .await?;

                for role_id in roles {
                    query("INSERT OR IGNORE INTO guild_managing_roles (guild_id, role_id) VALUES (?, ?)")
                        .bind(guild_id)
                        .bind(to_db(*role_id))
                        .execute(&mut *tx)
                        .await?;
                }

                // Read back inside the transaction so the caller sees exactly what was written
                let row: RadioRow =
                    query_as(&format!("{} WHERE guild_radios.guild_id = ?", SELECT_RADIO))
                        .bind(guild_id)
                        .fetch_one(&mut *tx)
                        .await?;

                let roles: Vec<i64> = query_scalar(SELECT_ROLES)
                    .bind(guild_id)
                    .fetch_all(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok::<_, SqlxError>((row, roles))
            })
            .await
            .map_err(|e| match e {
                SqlxError::Database(ref db) if db.is_foreign_key_violation() => {
                    DatabaseError::NotFound {
                        resource: "station",
                        identifier: "station_id",
                    }
                }
                e => e.any(),
            })?;

        row.into_config(roles.into_iter().map(from_db).collect())
    }

    async fn radio_by_guild(&self, guild_id: GuildId) -> Result<RadioConfig> {
        let pool = &self.pool;
        let guild_id = to_db(guild_id);

        let (row, roles) = self
            .retrying(move || async move {
                let row: RadioRow =
                    query_as(&format!("{} WHERE guild_radios.guild_id = ?", SELECT_RADIO))
                        .bind(guild_id)
                        .fetch_one(pool)
                        .await?;

                let roles: Vec<i64> = query_scalar(SELECT_ROLES)
                    .bind(guild_id)
                    .fetch_all(pool)
                    .await?;

                Ok::<_, SqlxError>((row, roles))
            })
            .await
            .map_err(|e| e.not_found_or("radio", "guild_id"))?;

        row.into_config(roles.into_iter().map(from_db).collect())
    }

    async fn radios_by_guilds(&self, guild_ids: &[GuildId]) -> Result<Vec<RadioConfig>> {
        if guild_ids.is_empty() {
            return Ok(vec![]);
        }

        let pool = &self.pool;

        let (rows, role_rows) = self
            .retrying(move || async move {
                let mut builder = QueryBuilder::<Sqlite>::new(SELECT_RADIO);
                builder.push(" WHERE guild_radios.guild_id IN ");
                push_guild_ids(&mut builder, guild_ids);

                let rows: Vec<RadioRow> = builder.build_query_as().fetch_all(pool).await?;

                let mut builder = QueryBuilder::<Sqlite>::new(
                    "SELECT guild_id, role_id FROM guild_managing_roles WHERE guild_id IN ",
                );
                push_guild_ids(&mut builder, guild_ids);
                builder.push(" ORDER BY role_id");

                let role_rows: Vec<(i64, i64)> = builder.build_query_as().fetch_all(pool).await?;

                Ok::<_, SqlxError>((rows, role_rows))
            })
            .await
            .map_err(|e| e.any())?;

        let mut roles: HashMap<i64, Vec<Snowflake>> = HashMap::new();

        for (guild_id, role_id) in role_rows {
            roles.entry(guild_id).or_default().push(from_db(role_id));
        }

        rows.into_iter()
            .map(|row| {
                let managing_roles = roles.remove(&row.guild_id).unwrap_or_default();
                row.into_config(managing_roles)
            })
            .collect()
    }

    async fn delete_radio(&self, guild_id: GuildId) -> Result<()> {
        let pool = &self.pool;
        let guild_id = to_db(guild_id);

        self.retrying(move || async move {
            query("DELETE FROM guild_radios WHERE guild_id = ?")
                .bind(guild_id)
                .execute(pool)
                .await
        })
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn list_enabled_guilds(&self) -> Result<HashSet<GuildId>> {
        let pool = &self.pool;

        let guild_ids: Vec<i64> = self
            .retrying(move || async move {
                query_scalar("SELECT guild_id FROM guild_radios")
                    .fetch_all(pool)
                    .await
            })
            .await
            .map_err(|e| e.any())?;

        Ok(guild_ids.into_iter().map(from_db).collect())
    }

    async fn upsert_station(&self, new_station: NewStation) -> Result<StationInfo> {
        let pool = &self.pool;
        let name = new_station.name.as_str();
        let playlist_link = new_station.playlist_link.as_str();
        let owner_id = to_db(new_station.owner_id);

        // The ownership check lives in the upsert itself, so no one can sneak in between
        let row: Option<StationRow> = self
            .retrying(move || async move {
                query_as(
                    "INSERT INTO radio_stations (station_name, playlist_link, owner_id)
                    VALUES (?, ?, ?)
                    ON CONFLICT (station_name) DO UPDATE SET
                        playlist_link = excluded.playlist_link
                    WHERE radio_stations.owner_id = excluded.owner_id
                    RETURNING station_id, station_name, playlist_link, owner_id",
                )
                .bind(name)
                .bind(playlist_link)
                .bind(owner_id)
                .fetch_optional(pool)
                .await
            })
            .await
            .map_err(|e| e.any())?;

        row.map(Into::into).ok_or_else(|| DatabaseError::Conflict {
            resource: "station",
            field: "station_name",
            value: new_station.name.clone(),
        })
    }

    async fn station_by_name(&self, name: &str) -> Result<StationInfo> {
        let pool = &self.pool;

        self.retrying(move || async move {
            query_as::<_, StationRow>(&format!("{} WHERE station_name = ?", SELECT_STATION))
                .bind(name)
                .fetch_one(pool)
                .await
        })
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("station", "station_name"))
    }

    async fn stations_by_owner(&self, owner_id: UserId) -> Result<Vec<StationInfo>> {
        let pool = &self.pool;
        let owner_id = to_db(owner_id);

        let rows = self
            .retrying(move || async move {
                query_as::<_, StationRow>(&format!(
                    "{} WHERE owner_id = ? ORDER BY station_name",
                    SELECT_STATION
                ))
                .bind(owner_id)
                .fetch_all(pool)
                .await
            })
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_stations(&self) -> Result<Vec<StationInfo>> {
        let pool = &self.pool;

        let rows = self
            .retrying(move || async move {
                query_as::<_, StationRow>(&format!("{} ORDER BY station_name", SELECT_STATION))
                    .fetch_all(pool)
                    .await
            })
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_station(&self, name: &str, owner_id: UserId) -> Result<Vec<GuildId>> {
        let pool = &self.pool;
        let owner_id = to_db(owner_id);

        let guild_ids: Vec<i64> = self
            .retrying(move || async move {
                let mut tx = pool.begin().await?;

                let guild_ids: Vec<i64> = query_scalar(
                    "SELECT guild_radios.guild_id FROM guild_radios
                        INNER JOIN radio_stations ON guild_radios.station_id = radio_stations.station_id
                    WHERE radio_stations.station_name = ? AND radio_stations.owner_id = ?",
                )
                .bind(name)
                .bind(owner_id)
                .fetch_all(&mut *tx)
                .await?;

                let deleted =
                    query("DELETE FROM radio_stations WHERE station_name = ? AND owner_id = ?")
                        .bind(name)
                        .bind(owner_id)
                        .execute(&mut *tx)
                        .await?;

                if deleted.rows_affected() == 0 {
                    return Err(SqlxError::RowNotFound);
                }

                tx.commit().await?;
                Ok::<_, SqlxError>(guild_ids)
            })
            .await
            .map_err(|e| e.not_found_or("station", "station_name"))?;

        Ok(guild_ids.into_iter().map(from_db).collect())
    }
}

impl RadioRow {
    fn into_config(self, managing_roles: Vec<Snowflake>) -> Result<RadioConfig> {
        let station = match (
            self.station_link,
            self.station_id,
            self.station_name,
            self.playlist_link,
            self.owner_id,
        ) {
            (Some(link), ..) => StationSource::Link(link),
            (None, Some(id), Some(name), Some(playlist_link), Some(owner_id)) => {
                StationSource::Catalog(StationInfo {
                    id,
                    name,
                    playlist_link,
                    owner_id: from_db(owner_id),
                })
            }
            _ => {
                return Err(DatabaseError::Internal(
                    format!("Radio of guild {} has no station", from_db(self.guild_id)).into(),
                ))
            }
        };

        Ok(RadioConfig {
            guild_id: from_db(self.guild_id),
            channel_id: from_db(self.channel_id),
            station,
            always_shuffle: self.always_shuffle,
            managing_roles,
        })
    }
}

impl From<StationRow> for StationInfo {
    fn from(row: StationRow) -> Self {
        Self {
            id: row.station_id,
            name: row.station_name,
            playlist_link: row.playlist_link,
            owner_id: from_db(row.owner_id),
        }
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

fn push_guild_ids(builder: &mut QueryBuilder<'_, Sqlite>, guild_ids: &[GuildId]) {
    builder.push("(");

    let mut separated = builder.separated(", ");
    for guild_id in guild_ids {
        separated.push_bind(to_db(*guild_id));
    }
    separated.push_unseparated(")");
}

/// Returns true for errors that go away if the operation is tried again later
fn is_transient(error: &SqlxError) -> bool {
    match error {
        SqlxError::Database(e) => e.code().map(|code| is_busy_code(&code)).unwrap_or(false),
        SqlxError::PoolTimedOut => true,
        _ => false,
    }
}

fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .ok()
        // Extended result codes keep the primary code in the low byte
        .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

// Snowflakes use the whole u64 range, SQLite integers are signed
fn to_db(snowflake: Snowflake) -> i64 {
    snowflake as i64
}

fn from_db(value: i64) -> Snowflake {
    value as Snowflake
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::DatabaseResult;

    use super::*;

    async fn database() -> SqliteDatabase {
        SqliteDatabase::in_memory(Config::default()).await.unwrap()
    }

    fn link_radio(guild_id: GuildId, link: &str) -> NewRadio {
        NewRadio {
            guild_id,
            channel_id: 100 + guild_id,
            station: StationRef::Link(link.to_string()),
            always_shuffle: true,
            managing_roles: vec![],
        }
    }

    fn station(name: &str, link: &str, owner_id: UserId) -> NewStation {
        NewStation {
            name: name.to_string(),
            playlist_link: link.to_string(),
            owner_id,
        }
    }

    #[test]
    fn busy_and_locked_codes_are_transient() {
        // SQLITE_BUSY, SQLITE_LOCKED, SQLITE_BUSY_SNAPSHOT, SQLITE_LOCKED_SHAREDCACHE
        for code in ["5", "6", "517", "262"] {
            assert!(is_busy_code(code), "{} should be retried", code);
        }

        // SQLITE_CONSTRAINT, SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_READONLY
        for code in ["19", "787", "8", "busy"] {
            assert!(!is_busy_code(code), "{} should not be retried", code);
        }

        assert!(is_transient(&SqlxError::PoolTimedOut));
        assert!(!is_transient(&SqlxError::RowNotFound));
    }

    #[tokio::test]
    async fn retries_until_the_operation_succeeds() {
        let db = SqliteDatabase::in_memory(Config {
            store_retry_attempts: 3,
            store_retry_backoff: Duration::from_millis(1),
            ..Default::default()
        })
        .await
        .unwrap();

        let calls = AtomicU32::new(0);

        let result = db
            .retrying(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(SqlxError::PoolTimedOut)
                    } else {
                        Ok(call)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let db = SqliteDatabase::in_memory(Config {
            store_retry_attempts: 3,
            store_retry_backoff: Duration::from_millis(1),
            ..Default::default()
        })
        .await
        .unwrap();

        let calls = AtomicU32::new(0);

        let result: std::result::Result<(), _> = db
            .retrying(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SqlxError::PoolTimedOut) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result.map_err(|e| e.any()),
            Err(DatabaseError::Internal(_))
        ));

        // Anything else is surfaced right away
        calls.store(0, Ordering::SeqCst);
        let result: std::result::Result<(), _> = db
            .retrying(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SqlxError::RowNotFound) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_every_field() {
        let db = database().await;

        let mut radio = link_radio(1, "lofi hip hop");
        radio.managing_roles = vec![20, 10];
        let first = db.upsert_radio(radio).await.unwrap();

        assert_eq!(first.station, StationSource::Link("lofi hip hop".to_string()));
        assert_eq!(first.managing_roles, vec![10, 20]);

        let replaced = db
            .upsert_radio(NewRadio {
                guild_id: 1,
                channel_id: 555,
                station: StationRef::Link("synthwave".to_string()),
                always_shuffle: false,
                managing_roles: vec![30],
            })
            .await
            .unwrap();

        assert_eq!(replaced.channel_id, 555);
        assert_eq!(replaced.station.playlist_link(), "synthwave");
        assert!(!replaced.always_shuffle);
        assert_eq!(replaced.managing_roles, vec![30]);
        assert_eq!(db.radio_by_guild(1).await.unwrap(), replaced);
    }

    #[tokio::test]
    async fn keeps_full_range_snowflakes() {
        let db = database().await;
        let guild_id = u64::MAX - 3;

        db.upsert_radio(link_radio(guild_id, "x")).await.unwrap();

        assert_eq!(db.radio_by_guild(guild_id).await.unwrap().guild_id, guild_id);
        assert!(db.list_enabled_guilds().await.unwrap().contains(&guild_id));
    }

    #[tokio::test]
    async fn missing_radios_are_not_found() {
        let db = database().await;

        assert!(matches!(
            db.radio_by_guild(9).await,
            Err(DatabaseError::NotFound { resource: "radio", .. })
        ));
        assert_eq!(db.radio_by_guild(9).await.optional().unwrap(), None);

        // Deleting nothing is fine
        db.delete_radio(9).await.unwrap();
    }

    #[tokio::test]
    async fn batch_fetches_radios_with_roles() {
        let db = database().await;

        let mut with_roles = link_radio(1, "a");
        with_roles.managing_roles = vec![5];
        db.upsert_radio(with_roles).await.unwrap();
        db.upsert_radio(link_radio(2, "b")).await.unwrap();
        db.upsert_radio(link_radio(3, "c")).await.unwrap();

        let mut radios = db.radios_by_guilds(&[1, 2, 42]).await.unwrap();
        radios.sort_by_key(|r| r.guild_id);

        assert_eq!(radios.len(), 2);
        assert_eq!(radios[0].managing_roles, vec![5]);
        assert!(radios[1].managing_roles.is_empty());
        assert!(db.radios_by_guilds(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_radio_removes_its_roles() {
        let db = database().await;

        let mut radio = link_radio(1, "a");
        radio.managing_roles = vec![5, 6];
        db.upsert_radio(radio).await.unwrap();
        db.delete_radio(1).await.unwrap();

        assert!(db.list_enabled_guilds().await.unwrap().is_empty());

        let orphans: i64 = query_scalar("SELECT COUNT(*) FROM guild_managing_roles")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn only_owners_update_stations() {
        let db = database().await;

        let created = db.upsert_station(station("Lofi", "lofi", 7)).await.unwrap();
        let updated = db.upsert_station(station("Lofi", "lofi 2", 7)).await.unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.playlist_link, "lofi 2");

        let stolen = db.upsert_station(station("Lofi", "rickroll", 8)).await;
        assert!(matches!(stolen, Err(DatabaseError::Conflict { .. })));
        assert_eq!(db.station_by_name("Lofi").await.unwrap().playlist_link, "lofi 2");
    }

    #[tokio::test]
    async fn lists_stations_by_owner() {
        let db = database().await;

        db.upsert_station(station("b", "b", 1)).await.unwrap();
        db.upsert_station(station("a", "a", 1)).await.unwrap();
        db.upsert_station(station("c", "c", 2)).await.unwrap();

        let names: Vec<_> = db
            .stations_by_owner(1)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(db.list_stations().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn catalog_radios_follow_their_station() {
        let db = database().await;
        let lofi = db.upsert_station(station("Lofi", "lofi", 7)).await.unwrap();

        let radio = db
            .upsert_radio(NewRadio {
                station: StationRef::Catalog(lofi.id),
                ..link_radio(1, "")
            })
            .await
            .unwrap();
        assert_eq!(radio.station, StationSource::Catalog(lofi));

        db.upsert_station(station("Lofi", "lofi 2", 7)).await.unwrap();
        assert_eq!(db.radio_by_guild(1).await.unwrap().station.playlist_link(), "lofi 2");
    }

    #[tokio::test]
    async fn unknown_station_is_not_found() {
        let db = database().await;

        let result = db
            .upsert_radio(NewRadio {
                station: StationRef::Catalog(404),
                ..link_radio(1, "")
            })
            .await;

        assert!(matches!(
            result,
            Err(DatabaseError::NotFound { resource: "station", .. })
        ));
        assert!(db.list_enabled_guilds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_station_cascades_to_radios() {
        let db = database().await;
        let lofi = db.upsert_station(station("Lofi", "lofi", 7)).await.unwrap();

        for guild_id in [1, 2] {
            db.upsert_radio(NewRadio {
                station: StationRef::Catalog(lofi.id),
                ..link_radio(guild_id, "")
            })
            .await
            .unwrap();
        }
        db.upsert_radio(link_radio(3, "other")).await.unwrap();

        assert!(matches!(
            db.delete_station("Lofi", 8).await,
            Err(DatabaseError::NotFound { .. })
        ));

        let mut deleted = db.delete_station("Lofi", 7).await.unwrap();
        deleted.sort();

        assert_eq!(deleted, vec![1, 2]);
        assert_eq!(db.list_enabled_guilds().await.unwrap(), HashSet::from([3]));
    }
}
