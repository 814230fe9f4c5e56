use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use roster::{
    Player, PlayerId, PlayerRepository, RunJournal, RunRecord, RunStatus, StorageError,
    TriggerReason,
};
use rusqlite::OptionalExtension;
use tracing::debug;

use crate::schema;

/// A SQLite-backed player repository and run journal.
pub struct PlayerStore {
    conn: Mutex<rusqlite::Connection>,
}

impl PlayerStore {
    /// Open a store backed by a file on disk, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        debug!(path = %path.display(), "opened player store");
        Self::from_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: rusqlite::Connection) -> Result<Self, StorageError> {
        schema::migrations()
            .to_latest(&mut conn)
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".into()))
    }

    fn row_to_player(row: &rusqlite::Row) -> rusqlite::Result<Player> {
        let external_id: String = row.get(0)?;

        Ok(Player {
            external_id: PlayerId::new(external_id),
            secondary_id: row.get(1)?,
            full_name: row.get(2)?,
            position: row.get(3)?,
            team: row.get(4)?,
            active: row.get(5)?,
        })
    }

    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let reason: String = row.get(0)?;
        let started_at: String = row.get(1)?;
        let finished_at: String = row.get(2)?;
        let status: String = row.get(3)?;
        let fetched: i64 = row.get(4)?;
        let stored: i64 = row.get(5)?;
        let skipped: i64 = row.get(6)?;

        Ok(RunRecord {
            reason: TriggerReason::parse(&reason)
                .ok_or_else(|| invalid_column(0, format!("unknown reason {reason:?}")))?,
            started_at: parse_timestamp(1, &started_at)?,
            finished_at: parse_timestamp(2, &finished_at)?,
            status: RunStatus::parse(&status)
                .ok_or_else(|| invalid_column(3, format!("unknown status {status:?}")))?,
            fetched: fetched.max(0) as u64,
            stored: stored.max(0) as u64,
            skipped: skipped.max(0) as u64,
            error: row.get(7)?,
        })
    }
}

#[async_trait::async_trait]
impl PlayerRepository for PlayerStore {
    async fn save(&self, player: &Player) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO players
                (external_id, secondary_id, full_name, position, team, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (external_id) DO UPDATE SET
                secondary_id = excluded.secondary_id,
                full_name    = excluded.full_name,
                position     = excluded.position,
                team         = excluded.team,
                active       = excluded.active",
            rusqlite::params![
                player.external_id.as_str(),
                player.secondary_id,
                player.full_name,
                player.position,
                player.team,
                player.active,
            ],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PlayerId) -> Result<Player, StorageError> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT external_id, secondary_id, full_name, position, team, active
             FROM players
             WHERE external_id = ?1",
            [id.as_str()],
            Self::row_to_player,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound(id.clone()),
            other => StorageError::Database(other.to_string()),
        })
    }

    async fn find_all(&self) -> Result<Vec<Player>, StorageError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT external_id, secondary_id, full_name, position, team, active
                 FROM players
                 ORDER BY external_id",
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let players = stmt
            .query_map([], Self::row_to_player)
            .map_err(|e| StorageError::Database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(players)
    }
}

#[async_trait::async_trait]
impl RunJournal for PlayerStore {
    async fn record(&self, run: &RunRecord) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO ingest_runs
                (reason, started_at, finished_at, status, fetched, stored, skipped, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                run.reason.as_str(),
                format_timestamp(run.started_at),
                format_timestamp(run.finished_at),
                run.status.as_str(),
                run.fetched as i64,
                run.stored as i64,
                run.skipped as i64,
                run.error,
            ],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn last_run(&self) -> Result<Option<RunRecord>, StorageError> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT reason, started_at, finished_at, status, fetched, stored, skipped, error
             FROM ingest_runs
             ORDER BY started_at DESC, id DESC
             LIMIT 1",
            [],
            Self::row_to_run,
        )
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| invalid_column(column, e.to_string()))
}

fn invalid_column(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}
