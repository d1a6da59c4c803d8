//! Agronomy knowledge: seasons, soil profiles and crop suitability.
//!
//! Everything here is static data and pure functions; no model is involved.

pub mod engine;
pub mod error;
pub mod knowledge;
pub mod season;
pub mod soil;
pub mod suitability;

pub use engine::{Recommendation, SeasonalRecommendationEngine};
pub use error::{AgronomyError, Result};
pub use knowledge::{profile, profiles, SeasonalCropEntry, SoilProfile};
pub use season::{parse_date, resolve_season, season_for, Season};
pub use soil::{canonicalize, SoilMatch, SoilType};
pub use suitability::{ideal_ranges, suitability, IdealRanges, Range, Suitability};
