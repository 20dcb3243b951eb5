#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FplError {
    #[error("gameweek must be between 1 and {max}, got {got}")]
    InvalidGameweek { got: i64, max: u32 },

    #[error("no fixtures stored for gameweek {0}; load fixtures first")]
    UnknownGameweek(u32),

    #[error("team {team_id} plays {fixtures} fixtures in gameweek {gw}; double gameweeks are not supported")]
    DoubleGameweek { gw: u32, team_id: u32, fixtures: usize },

    #[error("expected a whole number, got {0:?}")]
    NotANumber(String),

    #[error("gameweek range {from}..{to} is empty")]
    EmptyRange { from: u32, to: u32 },

    #[error("unknown menu choice: {0}")]
    UnknownMenuChoice(String),

    #[error("upstream reports no current gameweek")]
    NoCurrentGameweek,
}
