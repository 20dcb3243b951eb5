use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fpl_league_stats::attributes::build_attribute_rows;
use fpl_league_stats::fpl_api::{parse_bootstrap_json, parse_entry_picks_json};
use fpl_league_stats::report::{PlayerInfoRow, Scope, compute_standings};
use fpl_league_stats::repository::FixtureRow;

fn bench_bootstrap_parse(c: &mut Criterion) {
    c.bench_function("bootstrap_parse", |b| {
        b.iter(|| {
            let bootstrap = parse_bootstrap_json(black_box(BOOTSTRAP_JSON)).unwrap();
            black_box(bootstrap.elements.len());
        })
    });
}

fn bench_entry_picks_parse(c: &mut Criterion) {
    c.bench_function("entry_picks_parse", |b| {
        b.iter(|| {
            let picks = parse_entry_picks_json(black_box(PICKS_JSON)).unwrap();
            black_box(picks.picks.len());
        })
    });
}

fn bench_attribute_rows(c: &mut Criterion) {
    let bootstrap = parse_bootstrap_json(BOOTSTRAP_JSON).expect("valid fixture json");
    // Scale the fixture up to a full 20-team league.
    let elements = (0..100)
        .flat_map(|copy| {
            bootstrap.elements.iter().map(move |el| {
                let mut el = el.clone();
                el.id += copy * 10;
                el.team = (el.id % 20) + 1;
                el
            })
        })
        .collect::<Vec<_>>();
    let player_teams = elements
        .iter()
        .map(|el| (el.id, el.team))
        .collect::<HashMap<_, _>>();
    let fixtures = (0..10)
        .map(|idx| FixtureRow {
            id: idx + 1,
            gw: 5,
            home_team: idx * 2 + 1,
            away_team: idx * 2 + 2,
            home_difficulty: 3,
            away_difficulty: 3,
            kickoff_time: None,
        })
        .collect::<Vec<_>>();

    c.bench_function("attribute_rows_build", |b| {
        b.iter(|| {
            let rows = build_attribute_rows(
                5,
                black_box(&elements),
                black_box(&player_teams),
                black_box(&fixtures),
            )
            .unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_season_standings(c: &mut Criterion) {
    // 50 managers, 38 gameweeks, 15 picks each.
    let rows = (1..=38u32)
        .flat_map(|gw| {
            (1..=50u32).flat_map(move |manager_id| {
                (1..=15u32).map(move |slot| PlayerInfoRow {
                    gw,
                    manager_id,
                    club: format!("Club {manager_id}"),
                    manager: format!("Manager {manager_id}"),
                    player_id: slot + manager_id,
                    player: format!("Player {slot}"),
                    team: "ARS".to_string(),
                    position: "MID".to_string(),
                    multiplier: match slot {
                        1 => 2,
                        12..=15 => 0,
                        _ => 1,
                    },
                    points: i64::from((slot * manager_id + gw) % 13),
                    is_captain: slot == 1,
                    price: 5.0 + f64::from(slot) * 0.5,
                    form: 3.0,
                    xpts_next: 4.0,
                    opponent: Some("CHE".to_string()),
                })
            })
        })
        .collect::<Vec<_>>();
    let costs = (1..=50u32)
        .map(|id| (id, i64::from(id % 3) * 4))
        .collect::<HashMap<_, _>>();

    c.bench_function("season_standings", |b| {
        b.iter(|| {
            let standings = compute_standings(Scope::Season, black_box(&rows), black_box(&costs));
            black_box(standings.len());
        })
    });
}

criterion_group!(
    perf,
    bench_bootstrap_parse,
    bench_entry_picks_parse,
    bench_attribute_rows,
    bench_season_standings
);
criterion_main!(perf);

static BOOTSTRAP_JSON: &str = include_str!("../tests/fixtures/league/bootstrap-static.json");
static PICKS_JSON: &str = include_str!("../tests/fixtures/league/picks/101_1.json");
