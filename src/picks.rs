use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use rusqlite::params;

use crate::attributes::refresh_attributes;
use crate::fpl_api::{EntryPicks, FplSource, PickRecord};
use crate::repository::Repository;

#[derive(Debug, Clone, Default)]
pub struct PickLoadSummary {
    pub gw: u32,
    pub attributes_written: usize,
    pub managers_total: usize,
    pub managers_loaded: usize,
    pub picks_written: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RangeSummary {
    pub loaded: Vec<PickLoadSummary>,
    pub failed: Vec<(u32, String)>,
}

/// Refreshes the gameweek's attributes, then fetches every stored manager's
/// picks and rebuilds the gameweek's `picks`. A manager whose fetch fails is
/// logged and left out; the rest still load.
pub fn load_picks(repo: &mut Repository, source: &dyn FplSource, gw: u32) -> Result<PickLoadSummary> {
    let attributes_written = refresh_attributes(repo, source, gw)
        .with_context(|| format!("refresh attributes for gameweek {gw}"))?;

    let run_id = repo.begin_run("picks", Some(gw))?;
    let managers = repo.manager_ids()?;
    let mut summary = PickLoadSummary {
        gw,
        attributes_written,
        managers_total: managers.len(),
        ..PickLoadSummary::default()
    };

    let mut fetched = Vec::with_capacity(managers.len());
    for manager_id in managers {
        match fetch_manager_picks(source, manager_id, gw) {
            Ok(picks) => fetched.push((manager_id, picks)),
            Err(err) => {
                tracing::warn!(gw, manager_id, error = %format!("{err:#}"), "picks fetch failed");
                summary.errors.push(format!("manager {manager_id}: {err:#}"));
            }
        }
    }

    let points = repo.attribute_points(gw)?;
    let written = write_picks(repo, gw, &fetched, &points);
    match written {
        Ok(n) => {
            summary.managers_loaded = fetched.len();
            summary.picks_written = n;
        }
        Err(err) => {
            summary.errors.push(format!("{err:#}"));
            repo.finish_run(run_id, 0, &summary.errors)?;
            return Err(err);
        }
    }
    repo.finish_run(run_id, summary.picks_written, &summary.errors)?;

    tracing::info!(
        gw,
        managers = summary.managers_loaded,
        failed = summary.errors.len(),
        picks = summary.picks_written,
        "picks loaded"
    );
    Ok(summary)
}

/// Loads `from..=to`, carrying on past a gameweek that fails as a whole.
pub fn load_picks_range(
    repo: &mut Repository,
    source: &dyn FplSource,
    from: u32,
    to: u32,
) -> RangeSummary {
    let mut out = RangeSummary::default();
    for gw in from..=to {
        match load_picks(repo, source, gw) {
            Ok(summary) => out.loaded.push(summary),
            Err(err) => {
                tracing::warn!(gw, error = %format!("{err:#}"), "gameweek load failed");
                out.failed.push((gw, format!("{err:#}")));
            }
        }
    }
    out
}

fn fetch_manager_picks(source: &dyn FplSource, manager_id: u32, gw: u32) -> Result<EntryPicks> {
    let picks = source.entry_picks(manager_id, gw)?;
    if picks.entry_history.event != gw {
        return Err(anyhow!(
            "upstream returned gameweek {} instead of {gw}",
            picks.entry_history.event
        ));
    }
    if let Some(problem) = captaincy_problem(&picks.picks) {
        tracing::warn!(gw, manager_id, "{problem}");
    }
    Ok(picks)
}

/// At most one pick may carry a boosted multiplier, and it must be the
/// highest multiplier in the squad.
pub fn captaincy_problem(picks: &[PickRecord]) -> Option<String> {
    let boosted = picks.iter().filter(|p| p.multiplier >= 2).count();
    if boosted > 1 {
        return Some(format!("{boosted} picks carry a captain multiplier"));
    }
    let captain = picks.iter().find(|p| p.is_captain)?;
    let max = picks.iter().map(|p| p.multiplier).max().unwrap_or(0);
    if captain.multiplier > 0 && captain.multiplier < max {
        return Some(format!(
            "captain {} has multiplier {} below squad maximum {max}",
            captain.element, captain.multiplier
        ));
    }
    None
}

fn write_picks(
    repo: &mut Repository,
    gw: u32,
    fetched: &[(u32, EntryPicks)],
    points: &HashMap<u32, i64>,
) -> Result<usize> {
    let tx = repo
        .conn_mut()
        .transaction()
        .context("begin picks transaction")?;
    // A manager whose fetch failed keeps no cost or chip for a gameweek they
    // have no picks in.
    for table in ["picks", "transfer_history", "chips"] {
        tx.execute(
            &format!("DELETE FROM {table} WHERE gw = ?1"),
            params![gw as i64],
        )
        .with_context(|| format!("clear gameweek {table}"))?;
    }

    let mut written = 0usize;
    {
        let mut insert_pick = tx
            .prepare(
                "INSERT INTO picks
                 (gw, manager_id, player_id, position, multiplier, points, is_captain, is_vice_captain)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .context("prepare pick insert")?;
        let mut insert_transfers = tx
            .prepare(
                "INSERT INTO transfer_history (gw, manager_id, transfers, cost)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .context("prepare transfer history insert")?;
        let mut insert_chip = tx
            .prepare("INSERT INTO chips (gw, manager_id, chip) VALUES (?1, ?2, ?3)")
            .context("prepare chip insert")?;

        for (manager_id, entry) in fetched {
            for pick in &entry.picks {
                let pts = match points.get(&pick.element) {
                    Some(p) => *p,
                    None => {
                        tracing::debug!(gw, player_id = pick.element, "no attribute row; scoring 0");
                        0
                    }
                };
                insert_pick
                    .execute(params![
                        gw as i64,
                        *manager_id as i64,
                        pick.element as i64,
                        pick.position as i64,
                        pick.multiplier as i64,
                        pts,
                        pick.is_captain,
                        pick.is_vice_captain,
                    ])
                    .with_context(|| {
                        format!("insert pick {} for manager {manager_id}", pick.element)
                    })?;
                written += 1;
            }

            insert_transfers
                .execute(params![
                    gw as i64,
                    *manager_id as i64,
                    entry.entry_history.event_transfers,
                    entry.entry_history.event_transfers_cost,
                ])
                .with_context(|| format!("store transfer cost for manager {manager_id}"))?;

            if let Some(chip) = entry.active_chip.as_deref().filter(|c| !c.is_empty()) {
                insert_chip
                    .execute(params![gw as i64, *manager_id as i64, chip])
                    .with_context(|| format!("store chip for manager {manager_id}"))?;
            }
        }
    }
    tx.commit().context("commit picks transaction")?;
    Ok(written)
}
