use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "fpl_league_stats";
const DB_FILE: &str = "fpl.sqlite";
const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";
const DEFAULT_LEAGUE_ID: u32 = 2323;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_TIMEOUT_SECS: u64 = 5;

/// Reference entities the loader knows how to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Managers,
    Teams,
    Positions,
    Fixtures,
    Players,
}

impl Entity {
    pub const ALL: [Entity; 5] = [
        Entity::Managers,
        Entity::Teams,
        Entity::Positions,
        Entity::Fixtures,
        Entity::Players,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Entity::Managers => "managers",
            Entity::Teams => "teams",
            Entity::Positions => "positions",
            Entity::Fixtures => "fixtures",
            Entity::Players => "players",
        }
    }

    fn env_key(self) -> &'static str {
        match self {
            Entity::Managers => "FPL_POLICY_MANAGERS",
            Entity::Teams => "FPL_POLICY_TEAMS",
            Entity::Positions => "FPL_POLICY_POSITIONS",
            Entity::Fixtures => "FPL_POLICY_FIXTURES",
            Entity::Players => "FPL_POLICY_PLAYERS",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// How a reload treats rows that are already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertPolicy {
    /// Insert each row; rows whose primary key already exists are skipped.
    InsertOrSkip,
    /// Clear the table and refill it from the latest fetch.
    ReplaceAll,
}

impl UpsertPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "skip" | "insert" | "insert_or_skip" => Some(UpsertPolicy::InsertOrSkip),
            "replace" | "replace_all" => Some(UpsertPolicy::ReplaceAll),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityPolicies {
    pub managers: UpsertPolicy,
    pub teams: UpsertPolicy,
    pub positions: UpsertPolicy,
    pub fixtures: UpsertPolicy,
    pub players: UpsertPolicy,
}

impl Default for EntityPolicies {
    fn default() -> Self {
        Self {
            managers: UpsertPolicy::InsertOrSkip,
            teams: UpsertPolicy::ReplaceAll,
            positions: UpsertPolicy::InsertOrSkip,
            fixtures: UpsertPolicy::ReplaceAll,
            players: UpsertPolicy::ReplaceAll,
        }
    }
}

impl EntityPolicies {
    pub fn get(&self, entity: Entity) -> UpsertPolicy {
        match entity {
            Entity::Managers => self.managers,
            Entity::Teams => self.teams,
            Entity::Positions => self.positions,
            Entity::Fixtures => self.fixtures,
            Entity::Players => self.players,
        }
    }

    pub fn set(&mut self, entity: Entity, policy: UpsertPolicy) {
        match entity {
            Entity::Managers => self.managers = policy,
            Entity::Teams => self.teams = policy,
            Entity::Positions => self.positions = policy,
            Entity::Fixtures => self.fixtures = policy,
            Entity::Players => self.players = policy,
        }
    }

    fn from_env() -> Self {
        let mut out = Self::default();
        for entity in Entity::ALL {
            let Some(raw) = opt_env(entity.env_key()) else {
                continue;
            };
            match UpsertPolicy::parse(&raw) {
                Some(policy) => out.set(entity, policy),
                None => tracing::warn!(
                    key = entity.env_key(),
                    value = %raw,
                    "ignoring unknown upsert policy"
                ),
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub league_id: u32,
    pub api_base: String,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub http_timeout: Duration,
    pub snapshot_dir: Option<PathBuf>,
    pub policies: EntityPolicies,
}

impl Config {
    pub fn from_env() -> Self {
        let league_id = opt_env("FPL_LEAGUE_ID")
            .and_then(|val| val.trim().parse::<u32>().ok())
            .filter(|id| *id != 0)
            .unwrap_or(DEFAULT_LEAGUE_ID);
        let api_base = opt_env("FPL_API_BASE")
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let db_path = opt_env("FPL_DB_PATH")
            .map(PathBuf::from)
            .or_else(default_db_path)
            .unwrap_or_else(|| PathBuf::from(DB_FILE));
        let export_dir = opt_env("FPL_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("exports"));
        let http_timeout = Duration::from_secs(
            opt_env("FPL_HTTP_TIMEOUT_SECS")
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
                .max(MIN_TIMEOUT_SECS),
        );
        let snapshot_dir = opt_env("FPL_SNAPSHOT_DIR").map(PathBuf::from);

        Self {
            league_id,
            api_base,
            db_path,
            export_dir,
            http_timeout,
            snapshot_dir,
            policies: EntityPolicies::from_env(),
        }
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DB_FILE))
}

fn app_data_dir() -> Option<PathBuf> {
    if let Some(base) = opt_env("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = opt_env("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}
