use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::report::{PlayerInfoRow, Standing};

pub const SEASON_FILE: &str = "season_stats.csv";
pub const GAMEWEEK_FILE: &str = "gameweek_stats.csv";
pub const CAPTAINS_FILE: &str = "captains.csv";
pub const WORKBOOK_FILE: &str = "fpl_report.xlsx";

const STANDINGS_HEADER: [&str; 12] = [
    "scope",
    "manager_id",
    "club",
    "manager",
    "rank",
    "total",
    "gap_to_next",
    "gap_to_leader",
    "transfer_cost",
    "captain_points",
    "bench_points",
    "squad_value",
];

const PICKS_HEADER: [&str; 14] = [
    "gw",
    "manager_id",
    "club",
    "manager",
    "player_id",
    "player",
    "team",
    "position",
    "opponent",
    "multiplier",
    "points",
    "price",
    "form",
    "xpts_next",
];

pub fn picks_file(gw: u32) -> String {
    format!("picks_gw{gw}.csv")
}

/// Overwrites the season standings file.
pub fn export_season(dir: &Path, standings: &[Standing]) -> Result<PathBuf> {
    let path = prepare(dir, SEASON_FILE)?;
    let rows = standings.iter().map(standing_record).collect::<Vec<_>>();
    write_csv(&path, &STANDINGS_HEADER, &rows)?;
    Ok(path)
}

/// Appends gameweek standings. The header is written only when the file is
/// new, so exporting the same gameweek twice leaves both copies in the file.
pub fn export_gameweek(dir: &Path, standings: &[Standing]) -> Result<PathBuf> {
    let path = prepare(dir, GAMEWEEK_FILE)?;
    let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer
            .write_record(STANDINGS_HEADER)
            .context("write gameweek header")?;
    }
    for s in standings {
        writer
            .write_record(standing_record(s))
            .context("write gameweek row")?;
    }
    writer.flush().context("flush gameweek stats")?;
    Ok(path)
}

pub fn export_picks(dir: &Path, gw: u32, rows: &[PlayerInfoRow]) -> Result<PathBuf> {
    let path = prepare(dir, &picks_file(gw))?;
    let records = rows
        .iter()
        .filter(|r| r.gw == gw)
        .map(pick_record)
        .collect::<Vec<_>>();
    write_csv(&path, &PICKS_HEADER, &records)?;
    Ok(path)
}

pub fn export_captains(dir: &Path, rows: &[&PlayerInfoRow]) -> Result<PathBuf> {
    let path = prepare(dir, CAPTAINS_FILE)?;
    let records = rows.iter().map(|r| pick_record(r)).collect::<Vec<_>>();
    write_csv(&path, &PICKS_HEADER, &records)?;
    Ok(path)
}

/// Season, per-gameweek, pick and captain sheets in one workbook.
pub fn export_workbook(
    dir: &Path,
    season: &[Standing],
    gameweeks: &[Standing],
    picks: &[PlayerInfoRow],
    captains: &[&PlayerInfoRow],
) -> Result<PathBuf> {
    let path = prepare(dir, WORKBOOK_FILE)?;

    let with_header = |header: &[&str], rows: Vec<Vec<String>>| {
        let mut out = vec![header.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        out.extend(rows);
        out
    };

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Season")?;
        write_rows(
            sheet,
            &with_header(&STANDINGS_HEADER, season.iter().map(standing_record).collect()),
        )?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Gameweeks")?;
        write_rows(
            sheet,
            &with_header(&STANDINGS_HEADER, gameweeks.iter().map(standing_record).collect()),
        )?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Picks")?;
        write_rows(
            sheet,
            &with_header(&PICKS_HEADER, picks.iter().map(pick_record).collect()),
        )?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Captains")?;
        write_rows(
            sheet,
            &with_header(&PICKS_HEADER, captains.iter().map(|r| pick_record(r)).collect()),
        )?;
    }

    workbook
        .save(&path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(path)
}

fn prepare(dir: &Path, file: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create export dir {}", dir.display()))?;
    Ok(dir.join(file))
}

fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(header).context("write header")?;
    for row in rows {
        writer.write_record(row).context("write row")?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}

fn standing_record(s: &Standing) -> Vec<String> {
    vec![
        s.scope.to_string(),
        s.manager_id.to_string(),
        s.club.clone(),
        s.manager.clone(),
        s.rank.to_string(),
        s.total.to_string(),
        s.gap_to_next.to_string(),
        s.gap_to_leader.to_string(),
        s.transfer_cost.to_string(),
        s.captain_points.to_string(),
        s.bench_points.to_string(),
        format!("{:.1}", s.squad_value),
    ]
}

fn pick_record(r: &PlayerInfoRow) -> Vec<String> {
    vec![
        r.gw.to_string(),
        r.manager_id.to_string(),
        r.club.clone(),
        r.manager.clone(),
        r.player_id.to_string(),
        r.player.clone(),
        r.team.clone(),
        r.position.clone(),
        r.opponent.clone().unwrap_or_default(),
        r.multiplier.to_string(),
        r.points.to_string(),
        format!("{:.1}", r.price),
        format!("{:.1}", r.form),
        format!("{:.1}", r.xpts_next),
    ]
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            // Header row stays text even when a column name looks numeric.
            let number = if row_idx > 0 { numeric_cell(value) } else { None };
            let written = match number {
                Some(n) => worksheet.write_number(r, c, n),
                None => worksheet.write_string(r, c, value),
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

/// Finite numbers only; names like "NaN" or "Infinity" stay text.
fn numeric_cell(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}
