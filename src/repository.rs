use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, params, params_from_iter};

use crate::config::UpsertPolicy;
use crate::schema::init_schema;

/// Owns the single SQLite connection every operation goes through.
pub struct Repository {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .with_context(|| format!("count rows in {table}"))
    }

    pub fn count_rows_for_gameweek(&self, table: &str, gw: u32) -> Result<i64> {
        self.conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE gw = ?1"),
                params![gw as i64],
                |row| row.get(0),
            )
            .with_context(|| format!("count rows in {table} for gameweek {gw}"))
    }

    pub fn manager_ids(&self) -> Result<Vec<u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM managers ORDER BY id ASC")
            .context("prepare manager ids query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, u32>(0))
            .context("query manager ids")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode manager id")?);
        }
        Ok(out)
    }

    pub fn has_fixtures_for_gameweek(&self, gw: u32) -> Result<bool> {
        Ok(self.count_rows_for_gameweek("fixtures", gw)? > 0)
    }

    pub fn fixtures_for_gameweek(&self, gw: u32) -> Result<Vec<FixtureRow>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, gw, home_team, away_team, home_difficulty, away_difficulty, kickoff_time
                FROM fixtures
                WHERE gw = ?1
                ORDER BY id ASC
                "#,
            )
            .context("prepare fixtures query")?;
        let rows = stmt
            .query_map(params![gw as i64], |row| {
                Ok(FixtureRow {
                    id: row.get(0)?,
                    gw: row.get(1)?,
                    home_team: row.get(2)?,
                    away_team: row.get(3)?,
                    home_difficulty: row.get(4)?,
                    away_difficulty: row.get(5)?,
                    kickoff_time: row.get(6)?,
                })
            })
            .context("query fixtures")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode fixture row")?);
        }
        Ok(out)
    }

    /// Player id to team id for every stored player.
    pub fn player_teams(&self) -> Result<HashMap<u32, u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, team_id FROM players")
            .context("prepare player teams query")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?)))
            .context("query player teams")?;
        let mut out = HashMap::new();
        for row in rows {
            let (id, team) = row.context("decode player team")?;
            out.insert(id, team);
        }
        Ok(out)
    }

    /// Player id to event points from the gameweek's attribute snapshot.
    pub fn attribute_points(&self, gw: u32) -> Result<HashMap<u32, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id, event_points FROM attributes WHERE gw = ?1")
            .context("prepare attribute points query")?;
        let rows = stmt
            .query_map(params![gw as i64], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
            })
            .context("query attribute points")?;
        let mut out = HashMap::new();
        for row in rows {
            let (id, points) = row.context("decode attribute points")?;
            out.insert(id, points);
        }
        Ok(out)
    }

    pub fn gameweeks_with_picks(&self) -> Result<Vec<u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT gw FROM picks ORDER BY gw ASC")
            .context("prepare pick gameweeks query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, u32>(0))
            .context("query pick gameweeks")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode gameweek")?);
        }
        Ok(out)
    }

    pub fn begin_run(&self, operation: &str, gw: Option<u32>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO load_runs(operation, gw, started_at, finished_at, rows_written, errors_json)
                 VALUES (?1, ?2, ?3, NULL, 0, '[]')",
                params![operation, gw.map(i64::from), Utc::now().to_rfc3339()],
            )
            .context("insert load run")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_run(&self, run_id: i64, rows_written: usize, errors: &[String]) -> Result<()> {
        let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "UPDATE load_runs
                 SET finished_at = ?1, rows_written = ?2, errors_json = ?3
                 WHERE run_id = ?4",
                params![
                    Utc::now().to_rfc3339(),
                    rows_written as i64,
                    errors_json,
                    run_id
                ],
            )
            .context("update load run")?;
        Ok(())
    }
}

/// A row of one of the reference tables.
pub trait StoredRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<SqlValue>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    pub written: usize,
    pub skipped: usize,
}

/// Writes `rows` into their table under `policy`. Both policies run in one
/// transaction; a replace that fails part-way leaves the old contents.
pub fn store_rows<R: StoredRow>(
    repo: &mut Repository,
    policy: UpsertPolicy,
    rows: &[R],
) -> Result<StoreOutcome> {
    let placeholders = (1..=R::COLUMNS.len())
        .map(|idx| format!("?{idx}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders
    );

    let tx = repo
        .conn_mut()
        .transaction()
        .with_context(|| format!("begin {} transaction", R::TABLE))?;
    if policy == UpsertPolicy::ReplaceAll {
        tx.execute(&format!("DELETE FROM {}", R::TABLE), [])
            .with_context(|| format!("clear {}", R::TABLE))?;
    }

    let mut outcome = StoreOutcome::default();
    {
        let mut stmt = tx
            .prepare(&sql)
            .with_context(|| format!("prepare insert into {}", R::TABLE))?;
        for row in rows {
            match stmt.execute(params_from_iter(row.values())) {
                Ok(_) => outcome.written += 1,
                Err(err) if policy == UpsertPolicy::InsertOrSkip && is_constraint_violation(&err) => {
                    tracing::debug!(table = R::TABLE, error = %err, "row already stored; skipping");
                    outcome.skipped += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("insert into {}", R::TABLE));
                }
            }
        }
    }
    tx.commit()
        .with_context(|| format!("commit {} transaction", R::TABLE))?;
    Ok(outcome)
}

pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerRow {
    pub id: u32,
    pub club: String,
    pub name: String,
}

impl StoredRow for ManagerRow {
    const TABLE: &'static str = "managers";
    const COLUMNS: &'static [&'static str] = &["id", "club", "name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.id.into()),
            SqlValue::Text(self.club.clone()),
            SqlValue::Text(self.name.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub id: u32,
    pub name: String,
    pub short_name: String,
}

impl StoredRow for TeamRow {
    const TABLE: &'static str = "teams";
    const COLUMNS: &'static [&'static str] = &["id", "name", "short_name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.id.into()),
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.short_name.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRow {
    pub id: u32,
    pub name: String,
    pub short_name: String,
}

impl StoredRow for PositionRow {
    const TABLE: &'static str = "positions";
    const COLUMNS: &'static [&'static str] = &["id", "name", "short_name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.id.into()),
            SqlValue::Text(self.name.clone()),
            SqlValue::Text(self.short_name.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub id: u32,
    pub gw: u32,
    pub home_team: u32,
    pub away_team: u32,
    pub home_difficulty: i64,
    pub away_difficulty: i64,
    pub kickoff_time: Option<String>,
}

impl StoredRow for FixtureRow {
    const TABLE: &'static str = "fixtures";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "gw",
        "home_team",
        "away_team",
        "home_difficulty",
        "away_difficulty",
        "kickoff_time",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.id.into()),
            SqlValue::Integer(self.gw.into()),
            SqlValue::Integer(self.home_team.into()),
            SqlValue::Integer(self.away_team.into()),
            SqlValue::Integer(self.home_difficulty),
            SqlValue::Integer(self.away_difficulty),
            self.kickoff_time
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub id: u32,
    pub first_name: String,
    pub second_name: String,
    pub web_name: String,
    pub team_id: u32,
    pub position_id: u32,
}

impl StoredRow for PlayerRow {
    const TABLE: &'static str = "players";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "first_name",
        "second_name",
        "web_name",
        "team_id",
        "position_id",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.id.into()),
            SqlValue::Text(self.first_name.clone()),
            SqlValue::Text(self.second_name.clone()),
            SqlValue::Text(self.web_name.clone()),
            SqlValue::Integer(self.team_id.into()),
            SqlValue::Integer(self.position_id.into()),
        ]
    }
}
