use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use fpl_league_stats::app::{App, Outcome};
use fpl_league_stats::command::Command;
use fpl_league_stats::config::{Config, Entity, EntityPolicies};
use fpl_league_stats::export::{GAMEWEEK_FILE, SEASON_FILE, WORKBOOK_FILE, picks_file};

fn league_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("league")
}

fn offline_app(work: &std::path::Path) -> App {
    let config = Config {
        league_id: 2323,
        api_base: "http://127.0.0.1:9".to_string(),
        db_path: work.join("data").join("fpl.sqlite"),
        export_dir: work.join("exports"),
        http_timeout: Duration::from_secs(5),
        snapshot_dir: Some(league_dir()),
        policies: EntityPolicies::default(),
    };
    App::from_config(config).unwrap()
}

fn run(app: &mut App, command: Command) -> String {
    match app.execute(command).unwrap() {
        Outcome::Continue(message) => message,
        Outcome::Quit => panic!("unexpected quit"),
    }
}

#[test]
fn full_session_from_saved_responses() {
    let work = tempfile::tempdir().unwrap();
    let mut app = offline_app(work.path());
    assert_eq!(app.current_gameweek(), Some(2));

    run(&mut app, Command::InitSchema);
    let loaded = run(&mut app, Command::LoadReference);
    assert!(!loaded.contains("failed"), "{loaded}");

    let range = run(&mut app, Command::LoadPicksRange { from: 1, to: 2 });
    assert!(range.contains("GW1: 2/3 managers"), "{range}");
    assert!(range.contains("GW2: 3/3 managers"), "{range}");

    let gw2 = run(&mut app, Command::GameweekReport { gw: 2 });
    assert!(gw2.contains("Gunners XI"));
    run(&mut app, Command::SeasonReport);
    run(&mut app, Command::ExportPicks { gw: 2 });
    run(&mut app, Command::ExportCaptains);
    run(&mut app, Command::ExportWorkbook);

    let exports = work.path().join("exports");
    for file in [GAMEWEEK_FILE, SEASON_FILE, WORKBOOK_FILE] {
        assert!(exports.join(file).exists(), "{file} missing");
    }
    let picks = fs::read_to_string(exports.join(picks_file(2))).unwrap();
    assert_eq!(picks.lines().count(), 11);

    let season = fs::read_to_string(exports.join(SEASON_FILE)).unwrap();
    assert!(season.lines().nth(1).unwrap().starts_with("season,101,Gunners XI,Ann Lee,1,64,"));
}

#[test]
fn reopening_keeps_stored_data() {
    let work = tempfile::tempdir().unwrap();
    {
        let mut app = offline_app(work.path());
        run(&mut app, Command::LoadEntity(Entity::Managers));
    }
    let app = offline_app(work.path());
    assert_eq!(app.repo.count_rows("managers").unwrap(), 3);
}

#[test]
fn quit_stops_the_session() {
    let work = tempfile::tempdir().unwrap();
    let mut app = offline_app(work.path());
    assert!(matches!(app.execute(Command::Quit).unwrap(), Outcome::Quit));
}

#[test]
fn operation_errors_surface_to_the_caller() {
    let work = tempfile::tempdir().unwrap();
    let mut app = offline_app(work.path());
    // No fixtures loaded yet.
    assert!(app.execute(Command::RefreshAttributes { gw: 1 }).is_err());
}
