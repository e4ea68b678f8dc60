//! Line commands read from stdin and the text shown for them.

use std::fmt::{self, Write as _};

use claimloop_shared::ranking::{OwnerStanding, format_km2};
use claimloop_shared::travel::PathStats;
use claimloop_shared::{GeoPoint, TerritorySet};

pub const HELP: &str = "commands: click <lat> <lng> | undo | reset | ranking | list | stats | help | quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Click(GeoPoint),
    Undo,
    Reset,
    Ranking,
    List,
    Stats,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    BadNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty command"),
            ParseError::Unknown(word) => write!(f, "unknown command `{word}`"),
            ParseError::MissingArgument(name) => write!(f, "missing argument <{name}>"),
            ParseError::BadNumber(raw) => write!(f, "`{raw}` is not a number"),
        }
    }
}

impl std::error::Error for ParseError {}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err(ParseError::Empty);
    };

    match word.to_ascii_lowercase().as_str() {
        "click" | "c" => {
            let lat = number(words.next(), "lat")?;
            let lng = number(words.next(), "lng")?;
            Ok(Command::Click(GeoPoint::new(lat, lng)))
        }
        "undo" | "u" => Ok(Command::Undo),
        "reset" => Ok(Command::Reset),
        "ranking" | "rank" => Ok(Command::Ranking),
        "list" | "ls" => Ok(Command::List),
        "stats" => Ok(Command::Stats),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        _ => Err(ParseError::Unknown(word.to_string())),
    }
}

/// Non-finite values parse here and are rejected by the session.
fn number(raw: Option<&str>, name: &'static str) -> Result<f64, ParseError> {
    let raw = raw.ok_or(ParseError::MissingArgument(name))?;
    raw.trim_end_matches(',')
        .parse::<f64>()
        .map_err(|_| ParseError::BadNumber(raw.to_string()))
}

pub fn render_ranking(standings: &[OwnerStanding]) -> String {
    let mut out = String::new();
    for (rank, standing) in standings.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:<6} {:>12}  ({} territories)",
            rank + 1,
            standing.owner.as_str(),
            format_km2(standing.area_km2),
            standing.territories
        );
    }
    out
}

pub fn render_territories(territories: &TerritorySet) -> String {
    if territories.is_empty() {
        return "no territories\n".to_string();
    }
    let mut out = String::new();
    for territory in territories.iter() {
        let _ = writeln!(
            out,
            "{}  {:<6} {}  {} vertices",
            territory.id,
            territory.owner.as_str(),
            format_km2(territory.area_km2),
            territory.ring.vertices().len()
        );
    }
    out
}

pub fn render_stats(points: usize, stats: PathStats) -> String {
    format!(
        "path: {points} points, {:.2} km, {:.0} min\n",
        stats.distance_km, stats.minutes
    )
}
