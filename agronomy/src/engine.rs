//! Season-filtered crop recommendations.

use crate::knowledge::{profile, SeasonalCropEntry};
use crate::season::{resolve_season, Season};
use crate::soil::{canonicalize, SoilType};
use chrono::NaiveDate;
use serde::Serialize;

/// Crops, irrigation and soil care for one soil label in one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub soil_label: String,
    pub soil: SoilType,
    /// The label matched no soil type and the default profile was used.
    pub approximate: bool,
    pub season: Season,
    pub crops: Vec<SeasonalCropEntry>,
    pub irrigation: &'static str,
    pub soil_advice: &'static str,
}

/// Read-only view over the embedded knowledge base.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalRecommendationEngine;

impl SeasonalRecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Crops for `soil_label` whose seasons include `season`.
    pub fn recommend(&self, soil_label: &str, season: Season) -> Recommendation {
        let matched = canonicalize(soil_label);
        let profile = profile(matched.soil);
        let crops: Vec<SeasonalCropEntry> = profile
            .crops
            .iter()
            .filter(|c| c.grows_in(season))
            .cloned()
            .collect();

        log::debug!(
            "{} crops for {:?} ({}{}) in {}",
            crops.len(),
            soil_label,
            matched.soil,
            if matched.approximate { ", approximate" } else { "" },
            season
        );

        Recommendation {
            soil_label: soil_label.to_string(),
            soil: matched.soil,
            approximate: matched.approximate,
            season,
            crops,
            irrigation: profile.irrigation,
            soil_advice: profile.soil_advice,
        }
    }

    /// [`recommend`](Self::recommend) with the season taken from `date`
    /// unless `explicit` is given.
    pub fn recommend_on(
        &self,
        soil_label: &str,
        date: NaiveDate,
        explicit: Option<Season>,
    ) -> Recommendation {
        self.recommend(soil_label, resolve_season(date, explicit))
    }
}
