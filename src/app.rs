use anyhow::Result;

use crate::attributes::refresh_attributes;
use crate::command::Command;
use crate::config::{Config, Entity};
use crate::export;
use crate::fpl_api::{FplSource, HttpFplSource};
use crate::http_client::http_client;
use crate::loaders::{self, LoadReport};
use crate::picks::{load_picks, load_picks_range};
use crate::report::{self, Scope, Standing};
use crate::repository::Repository;
use crate::schema::init_schema;
use crate::snapshot_source::SnapshotSource;

pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct App {
    pub config: Config,
    pub repo: Repository,
    pub source: Box<dyn FplSource>,
}

impl App {
    pub fn new(config: Config, repo: Repository, source: Box<dyn FplSource>) -> Self {
        Self {
            config,
            repo,
            source,
        }
    }

    /// Opens the configured database and picks the HTTP or snapshot source.
    pub fn from_config(config: Config) -> Result<Self> {
        let repo = Repository::open(&config.db_path)?;
        let source: Box<dyn FplSource> = match config.snapshot_dir.as_ref() {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "replaying saved api responses");
                Box::new(SnapshotSource::from_dir(dir.clone()))
            }
            None => Box::new(HttpFplSource::new(
                http_client(config.http_timeout)?,
                config.api_base.clone(),
            )),
        };
        Ok(Self::new(config, repo, source))
    }

    pub fn current_gameweek(&self) -> Option<u32> {
        match self.source.bootstrap() {
            Ok(bootstrap) => bootstrap.current_gameweek(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "could not resolve current gameweek");
                None
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        let source = self.source.as_ref();
        let repo = &mut self.repo;
        let export_dir = self.config.export_dir.as_path();

        let message = match command {
            Command::Quit => return Ok(Outcome::Quit),
            Command::InitSchema => {
                init_schema(repo.conn())?;
                format!(
                    "Schema ready at {}",
                    repo.path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ":memory:".to_string())
                )
            }
            Command::LoadReference => {
                let summary = loaders::load_reference_data(
                    repo,
                    source,
                    self.config.league_id,
                    &self.config.policies,
                )?;
                let mut out = summary
                    .reports
                    .iter()
                    .map(describe_load)
                    .collect::<Vec<_>>()
                    .join("\n");
                for err in &summary.errors {
                    out.push_str(&format!("\nfailed: {err}"));
                }
                out
            }
            Command::LoadEntity(entity) => {
                let policy = self.config.policies.get(entity);
                let report = match entity {
                    Entity::Managers => {
                        loaders::load_managers(repo, source, self.config.league_id, policy)
                    }
                    Entity::Teams => loaders::load_teams(repo, source, policy),
                    Entity::Positions => loaders::load_positions(repo, source, policy),
                    Entity::Fixtures => loaders::load_fixtures(repo, source, policy),
                    Entity::Players => loaders::load_players(repo, source, policy),
                }?;
                describe_load(&report)
            }
            Command::RefreshAttributes { gw } => {
                let rows = refresh_attributes(repo, source, gw)?;
                format!("GW{gw}: {rows} attribute rows")
            }
            Command::LoadPicks { gw } => {
                let summary = load_picks(repo, source, gw)?;
                let mut out = format!(
                    "GW{gw}: {}/{} managers, {} picks",
                    summary.managers_loaded, summary.managers_total, summary.picks_written
                );
                for err in &summary.errors {
                    out.push_str(&format!("\nskipped {err}"));
                }
                out
            }
            Command::LoadPicksRange { from, to } => {
                let summary = load_picks_range(repo, source, from, to);
                let mut out = summary
                    .loaded
                    .iter()
                    .map(|s| {
                        format!(
                            "GW{}: {}/{} managers, {} picks",
                            s.gw, s.managers_loaded, s.managers_total, s.picks_written
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                for (gw, err) in &summary.failed {
                    out.push_str(&format!("\nGW{gw} failed: {err}"));
                }
                out
            }
            Command::GameweekReport { gw } => {
                let standings = report::gameweek_report(repo, gw)?;
                let path = export::export_gameweek(export_dir, &standings)?;
                with_path(report::format_standings(&standings), &path)
            }
            Command::SeasonReport => {
                let standings = report::season_report(repo)?;
                let path = export::export_season(export_dir, &standings)?;
                with_path(report::format_standings(&standings), &path)
            }
            Command::ExportPicks { gw } => {
                let rows = report::player_info(repo, Scope::Gameweek(gw))?;
                let path = export::export_picks(export_dir, gw, &rows)?;
                with_path(format!("{} picks", rows.len()), &path)
            }
            Command::ExportCaptains => {
                let rows = report::player_info(repo, Scope::Season)?;
                let captains = report::captain_rows(&rows);
                let path = export::export_captains(export_dir, &captains)?;
                with_path(format!("{} captain picks", captains.len()), &path)
            }
            Command::ExportWorkbook => {
                let rows = report::player_info(repo, Scope::Season)?;
                let season = report::season_report(repo)?;
                let gameweeks = per_gameweek_standings(repo)?;
                let captains = report::captain_rows(&rows);
                let path =
                    export::export_workbook(export_dir, &season, &gameweeks, &rows, &captains)?;
                with_path(format!("{} gameweek rows", gameweeks.len()), &path)
            }
        };
        Ok(Outcome::Continue(message))
    }
}

/// Standings for every gameweek that has picks, computed without touching
/// `stat`.
fn per_gameweek_standings(repo: &Repository) -> Result<Vec<Standing>> {
    let mut out = Vec::new();
    for gw in repo.gameweeks_with_picks()? {
        let scope = Scope::Gameweek(gw);
        let rows = report::player_info(repo, scope)?;
        let costs = report::transfer_costs(repo, scope)?;
        out.extend(report::compute_standings(scope, &rows, &costs));
    }
    Ok(out)
}

fn describe_load(report: &LoadReport) -> String {
    format!(
        "{}: fetched {}, written {}, skipped {} ({:?})",
        report.entity, report.fetched, report.written, report.skipped, report.policy
    )
}

fn with_path(body: String, path: &std::path::Path) -> String {
    format!("{body}\nwritten to {}", path.display())
}

