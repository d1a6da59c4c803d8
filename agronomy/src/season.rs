//! India-centric cropping seasons.

use crate::error::{AgronomyError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    /// Monsoon crop, June to September
    Kharif,
    /// Winter crop, October to February
    Rabi,
    /// Summer gap crop, March to May
    Zaid,
}

impl Season {
    pub const ALL: [Season; 3] = [Season::Kharif, Season::Rabi, Season::Zaid];

    /// Season for a calendar month (1-12). `None` outside that range.
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            6..=9 => Some(Season::Kharif),
            10..=12 | 1..=2 => Some(Season::Rabi),
            3..=5 => Some(Season::Zaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Kharif => "Kharif",
            Season::Rabi => "Rabi",
            Season::Zaid => "Zaid",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Season::ALL
            .into_iter()
            .find(|season| season.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AgronomyError::UnknownSeason(s.to_string()))
    }
}

/// Season containing `date`.
pub fn season_for(date: NaiveDate) -> Season {
    // chrono months are always 1-12
    Season::from_month(date.month()).unwrap_or(Season::Rabi)
}

/// An explicit season always wins over the date-derived one.
pub fn resolve_season(date: NaiveDate, explicit: Option<Season>) -> Season {
    explicit.unwrap_or_else(|| season_for(date))
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AgronomyError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_month_has_exactly_one_season() {
        let expected = [
            Season::Rabi,
            Season::Rabi,
            Season::Zaid,
            Season::Zaid,
            Season::Zaid,
            Season::Kharif,
            Season::Kharif,
            Season::Kharif,
            Season::Kharif,
            Season::Rabi,
            Season::Rabi,
            Season::Rabi,
        ];
        for (idx, season) in expected.iter().enumerate() {
            let month = idx as u32 + 1;
            assert_eq!(Season::from_month(month), Some(*season), "month {month}");
            let date = NaiveDate::from_ymd_opt(2024, month, 15).unwrap();
            assert_eq!(season_for(date), *season);
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_explicit_season_wins() {
        let july = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(resolve_season(july, None), Season::Kharif);
        assert_eq!(resolve_season(july, Some(Season::Zaid)), Season::Zaid);
    }

    #[test]
    fn test_parse() {
        assert_eq!("kharif".parse::<Season>().unwrap(), Season::Kharif);
        assert_eq!(" RABI ".parse::<Season>().unwrap(), Season::Rabi);
        assert!("monsoon".parse::<Season>().is_err());
        assert_eq!(
            parse_date("2024-11-03").unwrap(),
            NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()
        );
        assert!(parse_date("03/11/2024").is_err());
    }
}
