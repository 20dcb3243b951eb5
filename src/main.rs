use std::io::{self, BufRead, Write};

use anyhow::Result;

use fpl_league_stats::app::{App, Outcome};
use fpl_league_stats::command::{
    Answer, Command, MenuChoice, Prompt, menu_text, parse_gameweek, parse_gameweek_range,
};
use fpl_league_stats::config::Config;
use fpl_league_stats::logging;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init()?;

    let config = Config::from_env();
    tracing::info!(
        league = config.league_id,
        db = %config.db_path.display(),
        exports = %config.export_dir.display(),
        "starting"
    );
    let mut app = App::from_config(config)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}> ", menu_text());
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let choice = match MenuChoice::parse(&line) {
            Ok(choice) => choice,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        let answer = match read_answer(&app, choice, &mut lines) {
            Ok(Some(answer)) => answer,
            Ok(None) => break,
            Err(err) => {
                println!("{err:#}");
                continue;
            }
        };

        let command = match Command::build(choice, answer) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match app.execute(command) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Continue(message)) => println!("{message}"),
            Err(err) => {
                tracing::warn!(?command, error = %format!("{err:#}"), "command failed");
                println!("failed: {err:#}");
            }
        }
    }

    println!("bye");
    Ok(())
}

/// Asks whatever `choice` needs. `None` means stdin closed mid-prompt.
fn read_answer(
    app: &App,
    choice: MenuChoice,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<Answer>> {
    match choice.prompt() {
        Prompt::Nothing => Ok(Some(Answer::None)),
        Prompt::Gameweek => {
            let Some(raw) = ask("Gameweek (empty = current): ", lines)? else {
                return Ok(None);
            };
            let current = if raw.trim().is_empty() {
                app.current_gameweek()
            } else {
                None
            };
            Ok(Some(Answer::Gameweek(parse_gameweek(&raw, current)?)))
        }
        Prompt::GameweekRange => {
            let Some(raw) = ask("Gameweeks (e.g. 1-5): ", lines)? else {
                return Ok(None);
            };
            let (from, to) = parse_gameweek_range(&raw)?;
            Ok(Some(Answer::Range(from, to)))
        }
    }
}

fn ask(
    prompt: &str,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?)),
        None => Ok(None),
    }
}
