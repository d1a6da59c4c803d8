//! Soil-type canonicalisation.

use serde::Serialize;
use std::fmt;

/// Soil types the knowledge base has profiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SoilType {
    Loamy,
    Sandy,
    Clay,
}

/// Substring hints tried in order when a label is not an exact key.
const SOIL_HINTS: [(&str, SoilType); 3] = [
    ("loam", SoilType::Loamy),
    ("sand", SoilType::Sandy),
    ("clay", SoilType::Clay),
];

impl SoilType {
    pub const ALL: [SoilType; 3] = [SoilType::Loamy, SoilType::Sandy, SoilType::Clay];

    /// Used when a label matches no known soil type.
    pub const DEFAULT: SoilType = SoilType::Loamy;

    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Loamy => "Loamy",
            SoilType::Sandy => "Sandy",
            SoilType::Clay => "Clay",
        }
    }
}

impl fmt::Display for SoilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of mapping a free-form soil label onto a [`SoilType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoilMatch {
    pub soil: SoilType,
    /// `true` when nothing in the label matched and [`SoilType::DEFAULT`]
    /// was substituted. Callers should surface this to the user.
    pub approximate: bool,
}

/// Map a classifier label such as `"Red Clay Soil"` to a known soil type.
///
/// Order: exact key (case-insensitive), then the first of `loam`, `sand`,
/// `clay` contained in the label, then [`SoilType::DEFAULT`] flagged as
/// approximate.
pub fn canonicalize(label: &str) -> SoilMatch {
    let trimmed = label.trim();
    if let Some(soil) = SoilType::ALL
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(trimmed))
    {
        return SoilMatch {
            soil,
            approximate: false,
        };
    }

    let lower = trimmed.to_lowercase();
    match SOIL_HINTS.iter().find(|(hint, _)| lower.contains(hint)) {
        Some((_, soil)) => SoilMatch {
            soil: *soil,
            approximate: false,
        },
        None => {
            log::debug!(
                "Soil label {:?} matches no known type; defaulting to {}",
                label,
                SoilType::DEFAULT
            );
            SoilMatch {
                soil: SoilType::DEFAULT,
                approximate: true,
            }
        }
    }
}
