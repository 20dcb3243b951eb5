use std::path::PathBuf;

use fpl_league_stats::config::EntityPolicies;
use fpl_league_stats::fpl_api::{EntryHistory, EntryPicks, PickRecord, parse_entry_picks_json};
use fpl_league_stats::loaders::load_reference_data;
use fpl_league_stats::picks::{load_picks, load_picks_range};
use fpl_league_stats::report::season_report;
use fpl_league_stats::repository::Repository;
use fpl_league_stats::snapshot_source::SnapshotSource;

fn league_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("league")
}

fn loaded(source: &SnapshotSource) -> Repository {
    let mut repo = Repository::open_in_memory().unwrap();
    load_reference_data(&mut repo, source, 2323, &EntityPolicies::default()).unwrap();
    repo
}

fn picks_for(repo: &Repository, gw: u32, manager_id: u32) -> i64 {
    repo.conn()
        .query_row(
            "SELECT COUNT(*) FROM picks WHERE gw = ?1 AND manager_id = ?2",
            [gw, manager_id],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn failed_manager_is_skipped_and_others_load() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);

    // No saved picks for manager 103 in gameweek 1.
    let summary = load_picks(&mut repo, &source, 1).unwrap();
    assert_eq!(summary.managers_total, 3);
    assert_eq!(summary.managers_loaded, 2);
    assert_eq!(summary.picks_written, 8);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("manager 103"));

    assert_eq!(picks_for(&repo, 1, 103), 0);
    assert_eq!(repo.count_rows("managers").unwrap(), 3);

    let gw2 = load_picks(&mut repo, &source, 2).unwrap();
    assert!(gw2.errors.is_empty());
    assert_eq!(picks_for(&repo, 2, 103), 3);
}

#[test]
fn pick_points_come_from_the_attribute_snapshot() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);
    load_picks(&mut repo, &source, 1).unwrap();

    let (points, multiplier): (i64, i64) = repo
        .conn()
        .query_row(
            "SELECT points, multiplier FROM picks WHERE gw = 1 AND manager_id = 101 AND player_id = 2",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(points, 8);
    assert_eq!(multiplier, 2);
}

#[test]
fn reloading_a_gameweek_replaces_its_picks() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);
    load_picks(&mut repo, &source, 2).unwrap();
    load_picks(&mut repo, &source, 2).unwrap();
    assert_eq!(repo.count_rows_for_gameweek("picks", 2).unwrap(), 10);
    assert_eq!(repo.count_rows_for_gameweek("transfer_history", 2).unwrap(), 3);
}

#[test]
fn transfer_costs_and_chips_are_recorded() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);
    load_picks(&mut repo, &source, 1).unwrap();
    load_picks(&mut repo, &source, 2).unwrap();

    let (transfers, cost): (i64, i64) = repo
        .conn()
        .query_row(
            "SELECT transfers, cost FROM transfer_history WHERE gw = 2 AND manager_id = 102",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((transfers, cost), (3, 8));

    let chips = repo
        .conn()
        .prepare("SELECT gw, manager_id, chip FROM chips ORDER BY gw, manager_id")
        .unwrap()
        .query_map([], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?, row.get::<_, String>(2)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        chips,
        vec![(1, 102, "3xc".to_string()), (2, 103, "bboost".to_string())]
    );
}

#[test]
fn mismatched_gameweek_payload_is_rejected() {
    let stale = EntryPicks {
        picks: vec![PickRecord {
            element: 1,
            position: 1,
            multiplier: 1,
            is_captain: false,
            is_vice_captain: false,
        }],
        entry_history: EntryHistory {
            event: 1,
            event_transfers: 0,
            event_transfers_cost: 0,
        },
        active_chip: None,
    };
    let source = SnapshotSource::from_dir(league_dir()).with_picks(101, 2, stale);
    let mut repo = loaded(&source);

    let summary = load_picks(&mut repo, &source, 2).unwrap();
    assert_eq!(summary.managers_loaded, 2);
    assert_eq!(picks_for(&repo, 2, 101), 0);
}

#[test]
fn range_carries_on_past_a_failed_gameweek() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);

    // Gameweek 4 has no fixtures, so it fails as a whole.
    let summary = load_picks_range(&mut repo, &source, 1, 4);
    assert_eq!(
        summary.loaded.iter().map(|s| s.gw).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, 4);
    assert_eq!(repo.gameweeks_with_picks().unwrap(), vec![1, 2]);
}

#[test]
fn failed_reload_drops_stale_transfer_cost() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);
    load_picks(&mut repo, &source, 1).unwrap();
    load_picks(&mut repo, &source, 2).unwrap();

    // Manager 102 now answers gameweek 2 with last week's payload.
    let gw1_payload =
        std::fs::read_to_string(league_dir().join("picks").join("102_1.json")).unwrap();
    let failing = SnapshotSource::from_dir(league_dir())
        .with_picks(102, 2, parse_entry_picks_json(&gw1_payload).unwrap());
    let summary = load_picks(&mut repo, &failing, 2).unwrap();
    assert_eq!(summary.errors.len(), 1);

    assert_eq!(picks_for(&repo, 2, 102), 0);
    let stale_costs: i64 = repo
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM transfer_history WHERE gw = 2 AND manager_id = 102",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stale_costs, 0);
    assert_eq!(repo.count_rows_for_gameweek("transfer_history", 2).unwrap(), 2);

    let season = season_report(&repo).unwrap();
    let bo = season.iter().find(|s| s.manager_id == 102).unwrap();
    // Gameweek 1 only: 39 points, no hit.
    assert_eq!(bo.transfer_cost, 0);
    assert_eq!(bo.total, 39);
}

#[test]
fn reload_clears_chip_no_longer_played() {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = loaded(&source);
    load_picks(&mut repo, &source, 2).unwrap();

    let gw2_payload =
        std::fs::read_to_string(league_dir().join("picks").join("103_2.json")).unwrap();
    let mut no_chip = parse_entry_picks_json(&gw2_payload).unwrap();
    no_chip.active_chip = None;
    let source = SnapshotSource::from_dir(league_dir()).with_picks(103, 2, no_chip);
    load_picks(&mut repo, &source, 2).unwrap();

    assert_eq!(repo.count_rows_for_gameweek("chips", 2).unwrap(), 0);
}
