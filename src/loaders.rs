use anyhow::{Context, Result};

use crate::config::{Entity, EntityPolicies, UpsertPolicy};
use crate::fpl_api::{Bootstrap, FplSource, league_entries};
use crate::repository::{
    FixtureRow, ManagerRow, PlayerRow, PositionRow, Repository, StoredRow, TeamRow, store_rows,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub entity: Entity,
    pub policy: UpsertPolicy,
    pub fetched: usize,
    pub written: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSummary {
    pub reports: Vec<LoadReport>,
    pub errors: Vec<String>,
}

impl ReferenceSummary {
    pub fn report(&self, entity: Entity) -> Option<&LoadReport> {
        self.reports.iter().find(|r| r.entity == entity)
    }
}

pub fn load_managers(
    repo: &mut Repository,
    source: &dyn FplSource,
    league_id: u32,
    policy: UpsertPolicy,
) -> Result<LoadReport> {
    let rows = league_entries(source, league_id)?
        .into_iter()
        .map(|e| ManagerRow {
            id: e.entry,
            club: e.entry_name,
            name: e.player_name,
        })
        .collect::<Vec<_>>();
    store(repo, Entity::Managers, policy, &rows)
}

pub fn load_teams(
    repo: &mut Repository,
    source: &dyn FplSource,
    policy: UpsertPolicy,
) -> Result<LoadReport> {
    let bootstrap = source.bootstrap().context("fetch teams")?;
    store(repo, Entity::Teams, policy, &team_rows(&bootstrap))
}

pub fn load_positions(
    repo: &mut Repository,
    source: &dyn FplSource,
    policy: UpsertPolicy,
) -> Result<LoadReport> {
    let bootstrap = source.bootstrap().context("fetch positions")?;
    store(repo, Entity::Positions, policy, &position_rows(&bootstrap))
}

pub fn load_players(
    repo: &mut Repository,
    source: &dyn FplSource,
    policy: UpsertPolicy,
) -> Result<LoadReport> {
    let bootstrap = source.bootstrap().context("fetch players")?;
    store(repo, Entity::Players, policy, &player_rows(&bootstrap))
}

/// Fixtures without a scheduled gameweek (postponed, not yet rearranged) are
/// not stored.
pub fn load_fixtures(
    repo: &mut Repository,
    source: &dyn FplSource,
    policy: UpsertPolicy,
) -> Result<LoadReport> {
    let fixtures = source.fixtures().context("fetch fixtures")?;
    let total = fixtures.len();
    let rows = fixtures
        .into_iter()
        .filter_map(|f| {
            Some(FixtureRow {
                id: f.id,
                gw: f.event?,
                home_team: f.team_h,
                away_team: f.team_a,
                home_difficulty: f.team_h_difficulty,
                away_difficulty: f.team_a_difficulty,
                kickoff_time: f.kickoff_time,
            })
        })
        .collect::<Vec<_>>();
    if rows.len() < total {
        tracing::info!(
            unscheduled = total - rows.len(),
            "skipping fixtures without a gameweek"
        );
    }
    store(repo, Entity::Fixtures, policy, &rows)
}

/// Loads every reference entity. One entity failing is logged and recorded;
/// the others still load.
pub fn load_reference_data(
    repo: &mut Repository,
    source: &dyn FplSource,
    league_id: u32,
    policies: &EntityPolicies,
) -> Result<ReferenceSummary> {
    let run_id = repo.begin_run("reference", None)?;
    let mut summary = ReferenceSummary::default();

    for entity in Entity::ALL {
        let policy = policies.get(entity);
        let result = match entity {
            Entity::Managers => load_managers(repo, source, league_id, policy),
            Entity::Teams => load_teams(repo, source, policy),
            Entity::Positions => load_positions(repo, source, policy),
            Entity::Fixtures => load_fixtures(repo, source, policy),
            Entity::Players => load_players(repo, source, policy),
        };
        match result {
            Ok(report) => summary.reports.push(report),
            Err(err) => {
                tracing::warn!(%entity, error = %format!("{err:#}"), "reference load failed");
                summary.errors.push(format!("{entity}: {err:#}"));
            }
        }
    }

    let written = summary.reports.iter().map(|r| r.written).sum();
    repo.finish_run(run_id, written, &summary.errors)?;
    Ok(summary)
}

fn store<R: StoredRow>(
    repo: &mut Repository,
    entity: Entity,
    policy: UpsertPolicy,
    rows: &[R],
) -> Result<LoadReport> {
    let outcome = store_rows(repo, policy, rows)?;
    tracing::info!(
        %entity,
        fetched = rows.len(),
        written = outcome.written,
        skipped = outcome.skipped,
        "reference data stored"
    );
    Ok(LoadReport {
        entity,
        policy,
        fetched: rows.len(),
        written: outcome.written,
        skipped: outcome.skipped,
    })
}

fn team_rows(bootstrap: &Bootstrap) -> Vec<TeamRow> {
    bootstrap
        .teams
        .iter()
        .map(|t| TeamRow {
            id: t.id,
            name: t.name.clone(),
            short_name: t.short_name.clone(),
        })
        .collect()
}

fn position_rows(bootstrap: &Bootstrap) -> Vec<PositionRow> {
    bootstrap
        .element_types
        .iter()
        .map(|p| PositionRow {
            id: p.id,
            name: p.singular_name.clone(),
            short_name: p.singular_name_short.clone(),
        })
        .collect()
}

fn player_rows(bootstrap: &Bootstrap) -> Vec<PlayerRow> {
    bootstrap
        .elements
        .iter()
        .map(|e| PlayerRow {
            id: e.id,
            first_name: e.first_name.clone(),
            second_name: e.second_name.clone(),
            web_name: e.web_name.clone(),
            team_id: e.team,
            position_id: e.element_type,
        })
        .collect()
}
