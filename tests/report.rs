use std::collections::HashMap;
use std::path::PathBuf;

use fpl_league_stats::config::EntityPolicies;
use fpl_league_stats::loaders::load_reference_data;
use fpl_league_stats::picks::load_picks;
use fpl_league_stats::report::{
    PlayerInfoRow, Scope, Standing, captain_rows, compute_standings, gameweek_report,
    player_info, season_report,
};
use fpl_league_stats::repository::Repository;
use fpl_league_stats::snapshot_source::SnapshotSource;

fn league_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("league")
}

fn season_repo() -> Repository {
    let source = SnapshotSource::from_dir(league_dir());
    let mut repo = Repository::open_in_memory().unwrap();
    load_reference_data(&mut repo, &source, 2323, &EntityPolicies::default()).unwrap();
    load_picks(&mut repo, &source, 1).unwrap();
    load_picks(&mut repo, &source, 2).unwrap();
    repo
}

fn row(manager_id: u32, player_id: u32, multiplier: u32, points: i64, price: f64) -> PlayerInfoRow {
    PlayerInfoRow {
        gw: 5,
        manager_id,
        club: format!("Club {manager_id}"),
        manager: format!("Manager {manager_id}"),
        player_id,
        player: format!("P{player_id}"),
        team: "ARS".to_string(),
        position: "MID".to_string(),
        multiplier,
        points,
        is_captain: multiplier >= 2,
        price,
        form: 0.0,
        xpts_next: 0.0,
        opponent: None,
    }
}

fn by_manager(standings: &[Standing], manager_id: u32) -> &Standing {
    standings
        .iter()
        .find(|s| s.manager_id == manager_id)
        .unwrap()
}

#[test]
fn captain_starter_and_bench_with_a_hit() {
    let rows = vec![
        row(1, 10, 2, 8, 10.0),
        row(1, 11, 1, 4, 5.5),
        row(1, 12, 0, 5, 4.0),
    ];
    let costs = HashMap::from([(1, 4)]);
    let standings = compute_standings(Scope::Gameweek(5), &rows, &costs);

    assert_eq!(standings.len(), 1);
    let s = &standings[0];
    assert_eq!(s.starting_points, 20);
    assert_eq!(s.total, 16);
    assert_eq!(s.captain_points, 16);
    assert_eq!(s.bench_points, 5);
    assert_eq!(s.rank, 1);
    assert_eq!(s.gap_to_leader, 0);
    assert!((s.squad_value - 19.5).abs() < 1e-9);
}

#[test]
fn ties_rank_by_manager_id() {
    let rows = vec![row(9, 1, 1, 10, 5.0), row(3, 1, 1, 10, 5.0), row(5, 1, 1, 12, 5.0)];
    let standings = compute_standings(Scope::Gameweek(5), &rows, &HashMap::new());
    let order = standings.iter().map(|s| s.manager_id).collect::<Vec<_>>();
    assert_eq!(order, vec![5, 3, 9]);
    assert_eq!(standings[1].gap_to_next, 2);
    assert_eq!(standings[2].gap_to_next, 0);
    assert_eq!(standings[2].gap_to_leader, 2);
}

#[test]
fn no_picks_means_no_standings() {
    assert!(compute_standings(Scope::Season, &[], &HashMap::new()).is_empty());
}

#[test]
fn gameweek_one_standings() {
    let mut repo = season_repo();
    let standings = gameweek_report(&mut repo, 1).unwrap();
    assert_eq!(standings.len(), 2);

    let leader = &standings[0];
    assert_eq!(leader.manager_id, 102);
    assert_eq!(leader.total, 39);
    assert_eq!(leader.captain_points, 36);
    assert_eq!(leader.bench_points, 6);
    assert!((leader.squad_value - 27.0).abs() < 1e-9);

    let second = by_manager(&standings, 101);
    assert_eq!(second.rank, 2);
    assert_eq!(second.starting_points, 34);
    assert_eq!(second.transfer_cost, 4);
    assert_eq!(second.total, 30);
    assert_eq!(second.bench_points, 4);
    assert_eq!(second.captain_points, 16);
    assert_eq!(second.gap_to_next, 9);
    assert_eq!(second.gap_to_leader, 9);
    assert!((second.squad_value - 32.5).abs() < 1e-9);
}

#[test]
fn gameweek_two_standings() {
    let mut repo = season_repo();
    let standings = gameweek_report(&mut repo, 2).unwrap();
    let order = standings.iter().map(|s| s.manager_id).collect::<Vec<_>>();
    assert_eq!(order, vec![101, 102, 103]);

    assert_eq!(standings[0].total, 34);
    assert_eq!(standings[1].total, 24);
    assert_eq!(standings[1].transfer_cost, 8);
    assert_eq!(standings[1].gap_to_next, 10);
    assert_eq!(standings[2].total, 22);
    assert_eq!(standings[2].bench_points, 0);
    assert_eq!(standings[2].gap_to_next, 2);
    assert_eq!(standings[2].gap_to_leader, 12);
}

#[test]
fn total_is_starting_points_minus_cost() {
    let repo = season_repo();
    for s in season_report(&repo).unwrap() {
        assert_eq!(s.total, s.starting_points - s.transfer_cost);
        assert!(s.gap_to_leader >= 0);
    }
}

#[test]
fn season_sums_every_gameweek() {
    let repo = season_repo();
    let standings = season_report(&repo).unwrap();

    let ann = by_manager(&standings, 101);
    assert_eq!(ann.rank, 1);
    assert_eq!(ann.total, 64);
    assert_eq!(ann.bench_points, 5);
    assert_eq!(ann.captain_points, 40);

    let bo = by_manager(&standings, 102);
    assert_eq!(bo.starting_points, 71);
    assert_eq!(bo.total, 63);
    assert_eq!(bo.gap_to_next, 1);
    assert_eq!(bo.bench_points, 10);
    assert_eq!(bo.captain_points, 60);

    let sam = by_manager(&standings, 103);
    assert_eq!(sam.total, 22);
    assert_eq!(sam.gap_to_next, 41);
    assert_eq!(sam.gap_to_leader, 42);
}

#[test]
fn gameweek_report_rewrites_stat() {
    let mut repo = season_repo();
    gameweek_report(&mut repo, 2).unwrap();
    gameweek_report(&mut repo, 2).unwrap();
    assert_eq!(repo.count_rows_for_gameweek("stat", 2).unwrap(), 3);

    let (rank, total): (i64, i64) = repo
        .conn()
        .query_row(
            "SELECT rank, total FROM stat WHERE gw = 2 AND manager_id = 103",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((rank, total), (3, 22));
}

#[test]
fn player_info_joins_names_and_opponents() {
    let repo = season_repo();
    let rows = player_info(&repo, Scope::Gameweek(2)).unwrap();
    assert_eq!(rows.len(), 10);

    let palmer = rows
        .iter()
        .find(|r| r.manager_id == 101 && r.player_id == 4)
        .unwrap();
    assert_eq!(palmer.club, "Gunners XI");
    assert_eq!(palmer.player, "Palmer");
    assert_eq!(palmer.team, "Chelsea");
    assert_eq!(palmer.position, "MID");
    assert_eq!(palmer.opponent.as_deref(), Some("BUR"));
    assert!(palmer.is_captain);

    let captains = captain_rows(&player_info(&repo, Scope::Season).unwrap())
        .into_iter()
        .map(|r| (r.gw, r.manager_id, r.player_id))
        .collect::<Vec<_>>();
    assert_eq!(captains, vec![(1, 101, 2), (1, 102, 4), (2, 101, 4), (2, 102, 4), (2, 103, 6)]);
}
