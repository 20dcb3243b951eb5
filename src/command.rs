use crate::config::Entity;
use crate::error::FplError;

/// Last gameweek of a Premier League season.
pub const MAX_GAMEWEEK: u32 = 38;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    InitSchema,
    LoadReference,
    LoadManagers,
    LoadTeams,
    LoadPositions,
    LoadFixtures,
    LoadPlayers,
    RefreshAttributes,
    LoadPicks,
    LoadPicksRange,
    GameweekReport,
    SeasonReport,
    ExportPicks,
    ExportCaptains,
    ExportWorkbook,
    Quit,
}

/// What a menu choice needs to ask before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Nothing,
    Gameweek,
    GameweekRange,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 16] = [
        MenuChoice::InitSchema,
        MenuChoice::LoadReference,
        MenuChoice::LoadManagers,
        MenuChoice::LoadTeams,
        MenuChoice::LoadPositions,
        MenuChoice::LoadFixtures,
        MenuChoice::LoadPlayers,
        MenuChoice::RefreshAttributes,
        MenuChoice::LoadPicks,
        MenuChoice::LoadPicksRange,
        MenuChoice::GameweekReport,
        MenuChoice::SeasonReport,
        MenuChoice::ExportPicks,
        MenuChoice::ExportCaptains,
        MenuChoice::ExportWorkbook,
        MenuChoice::Quit,
    ];

    pub fn key(self) -> u8 {
        match self {
            MenuChoice::InitSchema => 1,
            MenuChoice::LoadReference => 2,
            MenuChoice::LoadManagers => 3,
            MenuChoice::LoadTeams => 4,
            MenuChoice::LoadPositions => 5,
            MenuChoice::LoadFixtures => 6,
            MenuChoice::LoadPlayers => 7,
            MenuChoice::RefreshAttributes => 8,
            MenuChoice::LoadPicks => 9,
            MenuChoice::LoadPicksRange => 10,
            MenuChoice::GameweekReport => 11,
            MenuChoice::SeasonReport => 12,
            MenuChoice::ExportPicks => 13,
            MenuChoice::ExportCaptains => 14,
            MenuChoice::ExportWorkbook => 15,
            MenuChoice::Quit => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::InitSchema => "Initialise database",
            MenuChoice::LoadReference => "Load all reference data",
            MenuChoice::LoadManagers => "Load managers",
            MenuChoice::LoadTeams => "Load teams",
            MenuChoice::LoadPositions => "Load positions",
            MenuChoice::LoadFixtures => "Load fixtures",
            MenuChoice::LoadPlayers => "Load players",
            MenuChoice::RefreshAttributes => "Refresh player attributes for a gameweek",
            MenuChoice::LoadPicks => "Load picks for a gameweek",
            MenuChoice::LoadPicksRange => "Load picks for a range of gameweeks",
            MenuChoice::GameweekReport => "Gameweek standings (writes stat + gameweek_stats.csv)",
            MenuChoice::SeasonReport => "Season standings (season_stats.csv)",
            MenuChoice::ExportPicks => "Export pick detail for a gameweek",
            MenuChoice::ExportCaptains => "Export captain detail",
            MenuChoice::ExportWorkbook => "Export workbook",
            MenuChoice::Quit => "Quit",
        }
    }

    pub fn prompt(self) -> Prompt {
        match self {
            MenuChoice::RefreshAttributes
            | MenuChoice::LoadPicks
            | MenuChoice::GameweekReport
            | MenuChoice::ExportPicks => Prompt::Gameweek,
            MenuChoice::LoadPicksRange => Prompt::GameweekRange,
            _ => Prompt::Nothing,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, FplError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("q") {
            return Ok(MenuChoice::Quit);
        }
        let key = trimmed
            .parse::<u8>()
            .map_err(|_| FplError::UnknownMenuChoice(trimmed.to_string()))?;
        MenuChoice::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or_else(|| FplError::UnknownMenuChoice(trimmed.to_string()))
    }
}

pub fn menu_text() -> String {
    let mut out = String::from("\n== FPL league stats ==\n");
    for choice in MenuChoice::ALL {
        out.push_str(&format!("{:>3}) {}\n", choice.key(), choice.label()));
    }
    out
}

/// A validated operation, ready to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    InitSchema,
    LoadReference,
    LoadEntity(Entity),
    RefreshAttributes { gw: u32 },
    LoadPicks { gw: u32 },
    LoadPicksRange { from: u32, to: u32 },
    GameweekReport { gw: u32 },
    SeasonReport,
    ExportPicks { gw: u32 },
    ExportCaptains,
    ExportWorkbook,
    Quit,
}

/// Answers collected for a choice's prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    None,
    Gameweek(u32),
    Range(u32, u32),
}

impl Command {
    pub fn build(choice: MenuChoice, answer: Answer) -> Result<Self, FplError> {
        let gw = || match answer {
            Answer::Gameweek(gw) => validate_gameweek(i64::from(gw)),
            _ => Err(FplError::InvalidGameweek {
                got: 0,
                max: MAX_GAMEWEEK,
            }),
        };
        Ok(match choice {
            MenuChoice::InitSchema => Command::InitSchema,
            MenuChoice::LoadReference => Command::LoadReference,
            MenuChoice::LoadManagers => Command::LoadEntity(Entity::Managers),
            MenuChoice::LoadTeams => Command::LoadEntity(Entity::Teams),
            MenuChoice::LoadPositions => Command::LoadEntity(Entity::Positions),
            MenuChoice::LoadFixtures => Command::LoadEntity(Entity::Fixtures),
            MenuChoice::LoadPlayers => Command::LoadEntity(Entity::Players),
            MenuChoice::RefreshAttributes => Command::RefreshAttributes { gw: gw()? },
            MenuChoice::LoadPicks => Command::LoadPicks { gw: gw()? },
            MenuChoice::LoadPicksRange => {
                let Answer::Range(from, to) = answer else {
                    return Err(FplError::EmptyRange { from: 0, to: 0 });
                };
                let from = validate_gameweek(i64::from(from))?;
                let to = validate_gameweek(i64::from(to))?;
                if from > to {
                    return Err(FplError::EmptyRange { from, to });
                }
                Command::LoadPicksRange { from, to }
            }
            MenuChoice::GameweekReport => Command::GameweekReport { gw: gw()? },
            MenuChoice::SeasonReport => Command::SeasonReport,
            MenuChoice::ExportPicks => Command::ExportPicks { gw: gw()? },
            MenuChoice::ExportCaptains => Command::ExportCaptains,
            MenuChoice::ExportWorkbook => Command::ExportWorkbook,
            MenuChoice::Quit => Command::Quit,
        })
    }
}

pub fn validate_gameweek(n: i64) -> Result<u32, FplError> {
    if n < 1 || n > i64::from(MAX_GAMEWEEK) {
        return Err(FplError::InvalidGameweek {
            got: n,
            max: MAX_GAMEWEEK,
        });
    }
    Ok(n as u32)
}

/// Parses a typed gameweek. An empty answer means `current`.
pub fn parse_gameweek(raw: &str, current: Option<u32>) -> Result<u32, FplError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return current.ok_or(FplError::NoCurrentGameweek);
    }
    let n = trimmed
        .parse::<i64>()
        .map_err(|_| FplError::NotANumber(trimmed.to_string()))?;
    validate_gameweek(n)
}

/// Parses `from-to`, `from..to` or a single gameweek.
pub fn parse_gameweek_range(raw: &str) -> Result<(u32, u32), FplError> {
    let trimmed = raw.trim();
    let (a, b) = trimmed
        .split_once("..")
        .or_else(|| trimmed.split_once('-'))
        .unwrap_or((trimmed, trimmed));
    let from = parse_gameweek(a, None)?;
    let to = parse_gameweek(b, None)?;
    if from > to {
        return Err(FplError::EmptyRange { from, to });
    }
    Ok((from, to))
}
