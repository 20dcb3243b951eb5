use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::params;

use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Gameweek(u32),
    Season,
}

impl Scope {
    fn gameweek(self) -> Option<u32> {
        match self {
            Scope::Gameweek(gw) => Some(gw),
            Scope::Season => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Gameweek(gw) => write!(f, "GW{gw}"),
            Scope::Season => f.write_str("season"),
        }
    }
}

/// One pick joined with its manager, player, team, position and the
/// gameweek's attribute snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfoRow {
    pub gw: u32,
    pub manager_id: u32,
    pub club: String,
    pub manager: String,
    pub player_id: u32,
    pub player: String,
    pub team: String,
    pub position: String,
    pub multiplier: u32,
    pub points: i64,
    pub is_captain: bool,
    pub price: f64,
    pub form: f64,
    pub xpts_next: f64,
    pub opponent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub scope: Scope,
    pub manager_id: u32,
    pub club: String,
    pub manager: String,
    pub rank: usize,
    pub starting_points: i64,
    pub total: i64,
    pub gap_to_next: i64,
    pub gap_to_leader: i64,
    pub transfer_cost: i64,
    pub captain_points: i64,
    pub bench_points: i64,
    pub squad_value: f64,
}

pub fn player_info(repo: &Repository, scope: Scope) -> Result<Vec<PlayerInfoRow>> {
    let mut stmt = repo
        .conn()
        .prepare(
            r#"
            SELECT
                p.gw, p.manager_id, m.club, m.name,
                p.player_id, COALESCE(pl.web_name, ''), COALESCE(t.name, ''),
                COALESCE(pos.short_name, ''), p.multiplier, p.points, p.is_captain,
                COALESCE(a.price, 0.0), COALESCE(a.form, 0.0), COALESCE(a.xpts_next, 0.0),
                opp.short_name
            FROM picks p
            JOIN managers m ON m.id = p.manager_id
            LEFT JOIN attributes a ON a.gw = p.gw AND a.player_id = p.player_id
            LEFT JOIN players pl ON pl.id = p.player_id
            LEFT JOIN teams t ON t.id = pl.team_id
            LEFT JOIN positions pos ON pos.id = pl.position_id
            LEFT JOIN teams opp ON opp.id = a.opponent_team
            WHERE (?1 IS NULL OR p.gw = ?1)
            ORDER BY p.gw ASC, p.manager_id ASC, p.position ASC, p.player_id ASC
            "#,
        )
        .context("prepare player info query")?;

    let rows = stmt
        .query_map(params![scope.gameweek().map(i64::from)], |row| {
            Ok(PlayerInfoRow {
                gw: row.get(0)?,
                manager_id: row.get(1)?,
                club: row.get(2)?,
                manager: row.get(3)?,
                player_id: row.get(4)?,
                player: row.get(5)?,
                team: row.get(6)?,
                position: row.get(7)?,
                multiplier: row.get(8)?,
                points: row.get(9)?,
                is_captain: row.get::<_, i64>(10)? != 0,
                price: row.get(11)?,
                form: row.get(12)?,
                xpts_next: row.get(13)?,
                opponent: row.get(14)?,
            })
        })
        .context("query player info")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode player info row")?);
    }
    Ok(out)
}

pub fn transfer_costs(repo: &Repository, scope: Scope) -> Result<HashMap<u32, i64>> {
    let mut stmt = repo
        .conn()
        .prepare(
            "SELECT manager_id, SUM(cost) FROM transfer_history
             WHERE (?1 IS NULL OR gw = ?1)
             GROUP BY manager_id",
        )
        .context("prepare transfer cost query")?;
    let rows = stmt
        .query_map(params![scope.gameweek().map(i64::from)], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
        })
        .context("query transfer costs")?;
    let mut out = HashMap::new();
    for row in rows {
        let (id, cost) = row.context("decode transfer cost")?;
        out.insert(id, cost);
    }
    Ok(out)
}

#[derive(Default)]
struct Tally {
    club: String,
    manager: String,
    starting: i64,
    bench: i64,
    captain: i64,
    value: f64,
}

/// Aggregates picks per manager and ranks by total. Managers without a pick
/// in `rows` do not appear.
pub fn compute_standings(
    scope: Scope,
    rows: &[PlayerInfoRow],
    costs: &HashMap<u32, i64>,
) -> Vec<Standing> {
    let mut tallies: BTreeMap<u32, Tally> = BTreeMap::new();
    for row in rows {
        let tally = tallies.entry(row.manager_id).or_insert_with(|| Tally {
            club: row.club.clone(),
            manager: row.manager.clone(),
            ..Tally::default()
        });
        let scored = row.points * i64::from(row.multiplier);
        if row.multiplier == 0 {
            tally.bench += row.points;
        } else {
            tally.starting += scored;
        }
        if row.multiplier >= 2 {
            tally.captain += scored;
        }
        tally.value += row.price;
    }

    let mut out = tallies
        .into_iter()
        .map(|(manager_id, t)| {
            let transfer_cost = costs.get(&manager_id).copied().unwrap_or(0);
            Standing {
                scope,
                manager_id,
                club: t.club,
                manager: t.manager,
                rank: 0,
                starting_points: t.starting,
                total: t.starting - transfer_cost,
                gap_to_next: 0,
                gap_to_leader: 0,
                transfer_cost,
                captain_points: t.captain,
                bench_points: t.bench,
                squad_value: (t.value * 10.0).round() / 10.0,
            }
        })
        .collect::<Vec<_>>();

    // BTreeMap order makes manager id the tie-break.
    out.sort_by(|a, b| b.total.cmp(&a.total));
    let leader = out.first().map(|s| s.total).unwrap_or(0);
    let mut above: Option<i64> = None;
    for (idx, s) in out.iter_mut().enumerate() {
        s.rank = idx + 1;
        s.gap_to_next = above.map(|t| (t - s.total).abs()).unwrap_or(0);
        s.gap_to_leader = (leader - s.total).abs();
        above = Some(s.total);
    }
    out
}

/// Standings for one gameweek, also written to `stat` in place of that
/// gameweek's previous rows.
pub fn gameweek_report(repo: &mut Repository, gw: u32) -> Result<Vec<Standing>> {
    let scope = Scope::Gameweek(gw);
    let rows = player_info(repo, scope)?;
    let costs = transfer_costs(repo, scope)?;
    let standings = compute_standings(scope, &rows, &costs);
    write_stat(repo, gw, &standings)?;
    tracing::info!(gw, managers = standings.len(), "gameweek stats written");
    Ok(standings)
}

pub fn season_report(repo: &Repository) -> Result<Vec<Standing>> {
    let rows = player_info(repo, Scope::Season)?;
    let costs = transfer_costs(repo, Scope::Season)?;
    Ok(compute_standings(Scope::Season, &rows, &costs))
}

fn write_stat(repo: &mut Repository, gw: u32, standings: &[Standing]) -> Result<()> {
    let updated_at = Utc::now().to_rfc3339();
    let tx = repo
        .conn_mut()
        .transaction()
        .context("begin stat transaction")?;
    tx.execute("DELETE FROM stat WHERE gw = ?1", params![gw as i64])
        .context("clear gameweek stat")?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO stat
                 (gw, manager_id, rank, total, gap_to_next, gap_to_leader, transfer_cost,
                  captain_points, bench_points, squad_value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )
            .context("prepare stat insert")?;
        for s in standings {
            stmt.execute(params![
                gw as i64,
                s.manager_id as i64,
                s.rank as i64,
                s.total,
                s.gap_to_next,
                s.gap_to_leader,
                s.transfer_cost,
                s.captain_points,
                s.bench_points,
                s.squad_value,
                updated_at,
            ])
            .with_context(|| format!("insert stat for manager {}", s.manager_id))?;
        }
    }
    tx.commit().context("commit stat transaction")?;
    Ok(())
}

pub fn captain_rows(rows: &[PlayerInfoRow]) -> Vec<&PlayerInfoRow> {
    rows.iter().filter(|r| r.multiplier >= 2).collect()
}

/// Fixed-width table for the terminal.
pub fn format_standings(standings: &[Standing]) -> String {
    let mut out = format!(
        "{:>4}  {:<24} {:<20} {:>6} {:>5} {:>6} {:>5} {:>5} {:>5} {:>6}\n",
        "Rank", "Club", "Manager", "Total", "Next", "Leader", "Hits", "Capt", "Bench", "Value"
    );
    for s in standings {
        out.push_str(&format!(
            "{:>4}  {:<24} {:<20} {:>6} {:>5} {:>6} {:>5} {:>5} {:>5} {:>6.1}\n",
            s.rank,
            clip(&s.club, 24),
            clip(&s.manager, 20),
            s.total,
            s.gap_to_next,
            s.gap_to_leader,
            s.transfer_cost,
            s.captain_points,
            s.bench_points,
            s.squad_value
        ));
    }
    out
}

fn clip(raw: &str, max: usize) -> String {
    raw.chars().take(max).collect()
}
