use rusqlite_migration::{M, Migrations};

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "CREATE TABLE players (
                external_id     TEXT PRIMARY KEY NOT NULL,
                secondary_id    TEXT,
                full_name       TEXT NOT NULL,
                position        TEXT,
                team            TEXT,
                active          INTEGER
            );

            CREATE INDEX idx_players_team ON players(team);",
        ),
        M::up(
            "CREATE TABLE ingest_runs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                reason          TEXT NOT NULL,
                started_at      TEXT NOT NULL,
                finished_at     TEXT NOT NULL,
                status          TEXT NOT NULL,
                fetched         INTEGER NOT NULL DEFAULT 0,
                stored          INTEGER NOT NULL DEFAULT 0,
                skipped         INTEGER NOT NULL DEFAULT 0,
                error           TEXT
            );",
        ),
    ])
}
