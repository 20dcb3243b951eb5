use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use rusqlite::params;

use crate::error::FplError;
use crate::fpl_api::{ElementRecord, FplSource};
use crate::repository::{FixtureRow, Repository};

/// Upstream prices are tenths of a million.
pub const PRICE_DIVISOR: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    pub gw: u32,
    pub player_id: u32,
    pub event_points: i64,
    pub form: f64,
    pub ict: f64,
    pub price: f64,
    pub xpts_next: f64,
    pub opponent_team: u32,
}

/// Builds the gameweek's attribute rows from current element data.
///
/// Elements with no stored player are dropped, as are players whose team has
/// no fixture that gameweek. A team with more than one fixture is rejected
/// instead of picking one opponent.
pub fn build_attribute_rows(
    gw: u32,
    elements: &[ElementRecord],
    player_teams: &HashMap<u32, u32>,
    fixtures: &[FixtureRow],
) -> Result<Vec<AttributeRow>, FplError> {
    let opponents = opponents_by_team(gw, fixtures)?;

    let mut rows = elements
        .iter()
        .filter_map(|el| {
            let team = player_teams.get(&el.id)?;
            let opponent = opponents.get(team)?;
            Some(AttributeRow {
                gw,
                player_id: el.id,
                event_points: el.event_points,
                form: el.form,
                ict: el.ict_index,
                price: el.now_cost as f64 / PRICE_DIVISOR,
                xpts_next: el.ep_next,
                opponent_team: *opponent,
            })
        })
        .collect::<Vec<_>>();
    rows.sort_by_key(|r| r.player_id);
    Ok(rows)
}

fn opponents_by_team(gw: u32, fixtures: &[FixtureRow]) -> Result<HashMap<u32, u32>, FplError> {
    let mut seen: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for f in fixtures.iter().filter(|f| f.gw == gw) {
        seen.entry(f.home_team).or_default().push(f.away_team);
        seen.entry(f.away_team).or_default().push(f.home_team);
    }

    let mut out = HashMap::with_capacity(seen.len());
    for (team_id, opponents) in seen {
        if opponents.len() > 1 {
            return Err(FplError::DoubleGameweek {
                gw,
                team_id,
                fixtures: opponents.len(),
            });
        }
        out.insert(team_id, opponents[0]);
    }
    Ok(out)
}

/// Rebuilds the attribute snapshot for `gw` from the upstream's current data.
/// The old rows are replaced in the same transaction as the insert.
pub fn refresh_attributes(repo: &mut Repository, source: &dyn FplSource, gw: u32) -> Result<usize> {
    if gw == 0 {
        return Err(FplError::InvalidGameweek {
            got: 0,
            max: crate::command::MAX_GAMEWEEK,
        }
        .into());
    }
    if !repo.has_fixtures_for_gameweek(gw)? {
        return Err(FplError::UnknownGameweek(gw).into());
    }

    let run_id = repo.begin_run("attributes", Some(gw))?;
    let result = rebuild(repo, source, gw);
    let errors = match &result {
        Ok(_) => Vec::new(),
        Err(err) => vec![format!("{err:#}")],
    };
    repo.finish_run(run_id, *result.as_ref().unwrap_or(&0), &errors)?;
    result
}

fn rebuild(repo: &mut Repository, source: &dyn FplSource, gw: u32) -> Result<usize> {
    let bootstrap = source.bootstrap().context("fetch player attributes")?;
    let player_teams = repo.player_teams()?;
    let fixtures = repo.fixtures_for_gameweek(gw)?;
    let rows = build_attribute_rows(gw, &bootstrap.elements, &player_teams, &fixtures)?;

    let tx = repo
        .conn_mut()
        .transaction()
        .context("begin attributes transaction")?;
    tx.execute("DELETE FROM attributes WHERE gw = ?1", params![gw as i64])
        .context("clear gameweek attributes")?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO attributes
                 (gw, player_id, event_points, form, ict, price, xpts_next, opponent_team)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .context("prepare attribute insert")?;
        for r in &rows {
            stmt.execute(params![
                r.gw as i64,
                r.player_id as i64,
                r.event_points,
                r.form,
                r.ict,
                r.price,
                r.xpts_next,
                r.opponent_team as i64,
            ])
            .with_context(|| format!("insert attributes for player {}", r.player_id))?;
        }
    }
    tx.commit().context("commit attributes transaction")?;

    tracing::info!(gw, rows = rows.len(), "attributes refreshed");
    Ok(rows.len())
}
