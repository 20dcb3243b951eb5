use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::http_client::get_text;

/// Upper bound on standings pages followed for one league.
const MAX_STANDINGS_PAGES: u32 = 200;

/// The upstream data the loaders read. Implemented over HTTP for real runs and
/// over saved payloads for offline replay and tests.
pub trait FplSource {
    fn standings_page(&self, league_id: u32, page: u32) -> Result<StandingsPage>;
    fn bootstrap(&self) -> Result<Bootstrap>;
    fn fixtures(&self) -> Result<Vec<FixtureRecord>>;
    fn entry_picks(&self, manager_id: u32, gw: u32) -> Result<EntryPicks>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueEntry {
    pub entry: u32,
    pub entry_name: String,
    pub player_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct StandingsPage {
    pub entries: Vec<LeagueEntry>,
    pub has_next: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
    #[serde(default)]
    pub element_types: Vec<PositionRecord>,
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl Bootstrap {
    /// The gameweek upstream marks as current, falling back to the latest
    /// finished one between seasons.
    pub fn current_gameweek(&self) -> Option<u32> {
        if let Some(event) = self.events.iter().find(|e| e.is_current) {
            return Some(event.id);
        }
        self.events
            .iter()
            .filter(|e| e.finished)
            .map(|e| e.id)
            .max()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    pub id: u32,
    pub singular_name: String,
    #[serde(default)]
    pub singular_name_short: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementRecord {
    pub id: u32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub second_name: String,
    #[serde(default)]
    pub web_name: String,
    pub team: u32,
    pub element_type: u32,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub event_points: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub form: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ict_index: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub now_cost: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ep_next: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub id: u32,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRecord {
    pub id: u32,
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub team_h_difficulty: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub team_a_difficulty: i64,
    #[serde(default)]
    pub kickoff_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryPicks {
    #[serde(default)]
    pub picks: Vec<PickRecord>,
    pub entry_history: EntryHistory,
    #[serde(default)]
    pub active_chip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickRecord {
    pub element: u32,
    #[serde(default)]
    pub position: u32,
    pub multiplier: u32,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryHistory {
    pub event: u32,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub event_transfers: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub event_transfers_cost: i64,
}

#[derive(Debug, Deserialize)]
struct StandingsPayload {
    #[serde(default)]
    standings: Option<StandingsBlock<StandingRow>>,
    #[serde(default)]
    new_entries: Option<StandingsBlock<NewEntryRow>>,
}

#[derive(Debug, Deserialize)]
struct StandingsBlock<T> {
    #[serde(default)]
    has_next: bool,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StandingRow {
    entry: u32,
    #[serde(default)]
    entry_name: String,
    #[serde(default)]
    player_name: String,
}

#[derive(Debug, Deserialize)]
struct NewEntryRow {
    entry: u32,
    #[serde(default)]
    entry_name: String,
    #[serde(default)]
    player_first_name: String,
    #[serde(default)]
    player_last_name: String,
}

pub fn parse_standings_json(raw: &str) -> Result<StandingsPage> {
    let payload: StandingsPayload =
        serde_json::from_str(raw.trim()).context("invalid league standings json")?;

    let mut page = StandingsPage::default();
    if let Some(block) = payload.standings {
        page.has_next |= block.has_next;
        page.entries.extend(block.results.into_iter().map(|row| LeagueEntry {
            entry: row.entry,
            entry_name: row.entry_name,
            player_name: row.player_name,
        }));
    }
    if let Some(block) = payload.new_entries {
        page.has_next |= block.has_next;
        page.entries.extend(block.results.into_iter().map(|row| LeagueEntry {
            entry: row.entry,
            entry_name: row.entry_name,
            player_name: format!("{} {}", row.player_first_name, row.player_last_name)
                .trim()
                .to_string(),
        }));
    }
    Ok(page)
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    serde_json::from_str(raw.trim()).context("invalid bootstrap-static json")
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<FixtureRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid fixtures json")
}

pub fn parse_entry_picks_json(raw: &str) -> Result<EntryPicks> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid picks json")?;
    // Unknown entries and unplayed gameweeks come back as {"detail": "Not found."}.
    if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
        return Err(anyhow!("picks unavailable: {detail}"));
    }
    serde_json::from_value(value).context("decode picks payload")
}

/// Follows standings pagination until upstream reports no further page.
/// Entrants listed on more than one page are kept once.
pub fn league_entries(source: &dyn FplSource, league_id: u32) -> Result<Vec<LeagueEntry>> {
    let mut out: Vec<LeagueEntry> = Vec::new();
    let mut page = 1u32;
    loop {
        let chunk = source
            .standings_page(league_id, page)
            .with_context(|| format!("standings page {page} for league {league_id}"))?;
        for entry in chunk.entries {
            if !out.iter().any(|e| e.entry == entry.entry) {
                out.push(entry);
            }
        }
        if !chunk.has_next || page >= MAX_STANDINGS_PAGES {
            break;
        }
        page += 1;
    }
    Ok(out)
}

pub struct HttpFplSource {
    client: &'static Client,
    base: String,
}

impl HttpFplSource {
    pub fn new(client: &'static Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into(),
        }
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.base, path);
        tracing::debug!(%url, "fetching");
        get_text(self.client, &url)
    }
}

impl FplSource for HttpFplSource {
    fn standings_page(&self, league_id: u32, page: u32) -> Result<StandingsPage> {
        let body = self.get(&format!(
            "leagues-classic/{league_id}/standings/?page_standings={page}&page_new_entries={page}"
        ))?;
        parse_standings_json(&body)
    }

    fn bootstrap(&self) -> Result<Bootstrap> {
        let body = self.get("bootstrap-static/")?;
        parse_bootstrap_json(&body)
    }

    fn fixtures(&self) -> Result<Vec<FixtureRecord>> {
        let body = self.get("fixtures/")?;
        parse_fixtures_json(&body)
    }

    fn entry_picks(&self, manager_id: u32, gw: u32) -> Result<EntryPicks> {
        let body = self.get(&format!("entry/{manager_id}/event/{gw}/picks/"))?;
        parse_entry_picks_json(&body)
    }
}

fn lenient_f64<'de, D>(de: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(as_f64_any).unwrap_or(0.0))
}

fn lenient_i64<'de, D>(de: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value
        .as_ref()
        .and_then(as_f64_any)
        .map(|n| n.round() as i64)
        .unwrap_or(0))
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
