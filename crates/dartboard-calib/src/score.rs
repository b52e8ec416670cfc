//! Score zones and their wire strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a dart landed.
///
/// Displays and (de)serializes as the strings consumed by the scoring layer:
/// `"T20"`, `"D5"`, `"S7IN"`, `"S7OUT"`, `"B"`, `"DB"`, `"OUT"`. `SingleInner`
/// is the single area between the bull and the treble ring, `SingleOuter` the
/// one between the treble and double rings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ScoreZone {
    Out,
    Bull,
    DoubleBull,
    Double(u8),
    Treble(u8),
    SingleInner(u8),
    SingleOuter(u8),
}

impl ScoreZone {
    /// Points scored.
    pub fn value(&self) -> u32 {
        match *self {
            Self::Out => 0,
            Self::Bull => 25,
            Self::DoubleBull => 50,
            Self::Double(n) => 2 * u32::from(n),
            Self::Treble(n) => 3 * u32::from(n),
            Self::SingleInner(n) | Self::SingleOuter(n) => u32::from(n),
        }
    }

    /// Sector number, `None` for bulls and misses.
    pub fn sector(&self) -> Option<u8> {
        match *self {
            Self::Double(n) | Self::Treble(n) | Self::SingleInner(n) | Self::SingleOuter(n) => {
                Some(n)
            }
            Self::Out | Self::Bull | Self::DoubleBull => None,
        }
    }
}

impl fmt::Display for ScoreZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Out => f.write_str("OUT"),
            Self::Bull => f.write_str("B"),
            Self::DoubleBull => f.write_str("DB"),
            Self::Double(n) => write!(f, "D{n}"),
            Self::Treble(n) => write!(f, "T{n}"),
            Self::SingleInner(n) => write!(f, "S{n}IN"),
            Self::SingleOuter(n) => write!(f, "S{n}OUT"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid score zone {0:?}")]
pub struct ScoreZoneParseError(pub String);

fn parse_sector(raw: &str, whole: &str) -> Result<u8, ScoreZoneParseError> {
    match raw.parse::<u8>() {
        Ok(n @ 1..=20) if !raw.starts_with('+') => Ok(n),
        _ => Err(ScoreZoneParseError(whole.to_owned())),
    }
}

impl FromStr for ScoreZone {
    type Err = ScoreZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OUT" => return Ok(Self::Out),
            "B" => return Ok(Self::Bull),
            "DB" => return Ok(Self::DoubleBull),
            _ => {}
        }
        if let Some(rest) = s.strip_prefix('S') {
            if let Some(n) = rest.strip_suffix("OUT") {
                return parse_sector(n, s).map(Self::SingleOuter);
            }
            if let Some(n) = rest.strip_suffix("IN") {
                return parse_sector(n, s).map(Self::SingleInner);
            }
        }
        if let Some(n) = s.strip_prefix('T') {
            return parse_sector(n, s).map(Self::Treble);
        }
        if let Some(n) = s.strip_prefix('D') {
            return parse_sector(n, s).map(Self::Double);
        }
        Err(ScoreZoneParseError(s.to_owned()))
    }
}

impl From<ScoreZone> for String {
    fn from(z: ScoreZone) -> Self {
        z.to_string()
    }
}

impl TryFrom<String> for ScoreZone {
    type Error = ScoreZoneParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
