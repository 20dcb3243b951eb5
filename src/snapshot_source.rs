use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::fpl_api::{
    Bootstrap, EntryPicks, FixtureRecord, FplSource, LeagueEntry, StandingsPage,
    parse_bootstrap_json, parse_entry_picks_json, parse_fixtures_json, parse_standings_json,
};

/// Offline source. Payloads set in memory take precedence; anything else is
/// read from a directory of saved API responses laid out as
///
/// ```text
/// standings_1.json, standings_2.json, ...
/// bootstrap-static.json
/// fixtures.json
/// picks/<manager>_<gw>.json
/// ```
///
/// A payload that is neither set nor on disk behaves like a failed fetch.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    dir: Option<PathBuf>,
    entries: Option<Vec<LeagueEntry>>,
    page_size: usize,
    bootstrap: Option<Bootstrap>,
    fixtures: Option<Vec<FixtureRecord>>,
    picks: HashMap<(u32, u32), EntryPicks>,
}

impl Default for SnapshotSource {
    fn default() -> Self {
        Self {
            dir: None,
            entries: None,
            page_size: 50,
            bootstrap: None,
            fixtures: None,
            picks: HashMap::new(),
        }
    }
}

impl SnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::new()
        }
    }

    pub fn with_entries(mut self, entries: Vec<LeagueEntry>) -> Self {
        self.entries = Some(entries);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: Bootstrap) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    pub fn with_fixtures(mut self, fixtures: Vec<FixtureRecord>) -> Self {
        self.fixtures = Some(fixtures);
        self
    }

    pub fn with_picks(mut self, manager_id: u32, gw: u32, picks: EntryPicks) -> Self {
        self.picks.insert((manager_id, gw), picks);
        self
    }

    pub fn set_fixtures(&mut self, fixtures: Vec<FixtureRecord>) {
        self.fixtures = Some(fixtures);
    }

    fn read(&self, rel: impl AsRef<Path>) -> Result<String> {
        let Some(dir) = self.dir.as_ref() else {
            return Err(anyhow!(
                "no snapshot for {}",
                rel.as_ref().display()
            ));
        };
        let path = dir.join(rel);
        fs::read_to_string(&path).with_context(|| format!("read snapshot {}", path.display()))
    }
}

impl FplSource for SnapshotSource {
    fn standings_page(&self, league_id: u32, page: u32) -> Result<StandingsPage> {
        if let Some(entries) = self.entries.as_ref() {
            let start = (page.saturating_sub(1) as usize).saturating_mul(self.page_size);
            let chunk = entries
                .iter()
                .skip(start)
                .take(self.page_size)
                .cloned()
                .collect::<Vec<_>>();
            return Ok(StandingsPage {
                entries: chunk,
                has_next: start + self.page_size < entries.len(),
            });
        }
        let raw = self
            .read(format!("standings_{page}.json"))
            .with_context(|| format!("league {league_id}"))?;
        parse_standings_json(&raw)
    }

    fn bootstrap(&self) -> Result<Bootstrap> {
        if let Some(bootstrap) = self.bootstrap.as_ref() {
            return Ok(bootstrap.clone());
        }
        parse_bootstrap_json(&self.read("bootstrap-static.json")?)
    }

    fn fixtures(&self) -> Result<Vec<FixtureRecord>> {
        if let Some(fixtures) = self.fixtures.as_ref() {
            return Ok(fixtures.clone());
        }
        parse_fixtures_json(&self.read("fixtures.json")?)
    }

    fn entry_picks(&self, manager_id: u32, gw: u32) -> Result<EntryPicks> {
        if let Some(picks) = self.picks.get(&(manager_id, gw)) {
            return Ok(picks.clone());
        }
        let rel = PathBuf::from("picks").join(format!("{manager_id}_{gw}.json"));
        parse_entry_picks_json(&self.read(rel)?)
    }
}
