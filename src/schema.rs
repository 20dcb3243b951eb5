use anyhow::{Context, Result};
use rusqlite::Connection;

/// Creates every table the loaders and reports use. Safe to call on an
/// existing database; nothing is dropped.
///
/// Foreign keys are declared for documentation but `PRAGMA foreign_keys` stays
/// off: players and fixtures are replaced wholesale while picks and attributes
/// still point at them.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS managers (
            id INTEGER PRIMARY KEY,
            club TEXT NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            short_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            short_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fixtures (
            id INTEGER NOT NULL,
            gw INTEGER NOT NULL,
            home_team INTEGER NOT NULL REFERENCES teams(id),
            away_team INTEGER NOT NULL REFERENCES teams(id),
            home_difficulty INTEGER NOT NULL,
            away_difficulty INTEGER NOT NULL,
            kickoff_time TEXT NULL,
            PRIMARY KEY (gw, home_team, away_team)
        );

        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            second_name TEXT NOT NULL,
            web_name TEXT NOT NULL,
            team_id INTEGER NOT NULL REFERENCES teams(id),
            position_id INTEGER NOT NULL REFERENCES positions(id)
        );

        CREATE TABLE IF NOT EXISTS attributes (
            gw INTEGER NOT NULL,
            player_id INTEGER NOT NULL REFERENCES players(id),
            event_points INTEGER NOT NULL,
            form REAL NOT NULL,
            ict REAL NOT NULL,
            price REAL NOT NULL,
            xpts_next REAL NOT NULL,
            opponent_team INTEGER NOT NULL REFERENCES teams(id),
            PRIMARY KEY (gw, player_id)
        );

        CREATE TABLE IF NOT EXISTS picks (
            gw INTEGER NOT NULL,
            manager_id INTEGER NOT NULL REFERENCES managers(id),
            player_id INTEGER NOT NULL REFERENCES players(id),
            position INTEGER NOT NULL,
            multiplier INTEGER NOT NULL,
            points INTEGER NOT NULL,
            is_captain INTEGER NOT NULL,
            is_vice_captain INTEGER NOT NULL,
            PRIMARY KEY (gw, manager_id, player_id)
        );
        CREATE INDEX IF NOT EXISTS idx_picks_manager ON picks(manager_id);

        CREATE TABLE IF NOT EXISTS transfer_history (
            gw INTEGER NOT NULL,
            manager_id INTEGER NOT NULL REFERENCES managers(id),
            transfers INTEGER NOT NULL,
            cost INTEGER NOT NULL,
            PRIMARY KEY (gw, manager_id)
        );

        CREATE TABLE IF NOT EXISTS chips (
            gw INTEGER NOT NULL,
            manager_id INTEGER NOT NULL REFERENCES managers(id),
            chip TEXT NOT NULL,
            PRIMARY KEY (gw, manager_id)
        );

        CREATE TABLE IF NOT EXISTS stat (
            gw INTEGER NOT NULL,
            manager_id INTEGER NOT NULL REFERENCES managers(id),
            rank INTEGER NOT NULL,
            total INTEGER NOT NULL,
            gap_to_next INTEGER NOT NULL,
            gap_to_leader INTEGER NOT NULL,
            transfer_cost INTEGER NOT NULL,
            captain_points INTEGER NOT NULL,
            bench_points INTEGER NOT NULL,
            squad_value REAL NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (gw, manager_id)
        );

        CREATE TABLE IF NOT EXISTS load_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            operation TEXT NOT NULL,
            gw INTEGER NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            rows_written INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::init_schema;
    use rusqlite::Connection;

    #[test]
    fn init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute("INSERT INTO teams(id, name, short_name) VALUES (1, 'Arsenal', 'ARS')", [])
            .unwrap();
        init_schema(&conn).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }
}
