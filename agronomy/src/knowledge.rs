//! The embedded crop knowledge base.

use crate::season::Season;
use crate::soil::SoilType;
use serde::Serialize;

/// One crop a soil type can carry, with the seasons it is sown in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonalCropEntry {
    pub name: &'static str,
    pub climate_note: &'static str,
    pub tip: &'static str,
    pub suitable_seasons: &'static [Season],
}

impl SeasonalCropEntry {
    pub fn grows_in(&self, season: Season) -> bool {
        self.suitable_seasons.contains(&season)
    }
}

/// Everything the knowledge base knows about one soil type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoilProfile {
    pub soil: SoilType,
    pub crops: &'static [SeasonalCropEntry],
    pub irrigation: &'static str,
    pub soil_advice: &'static str,
}

const WHEAT: SeasonalCropEntry = SeasonalCropEntry {
    name: "Wheat",
    climate_note: "Cool, moderate rainfall",
    tip: "Use balanced NPK, irrigate biweekly",
    suitable_seasons: &[Season::Rabi],
};

const LOAMY_CROPS: &[SeasonalCropEntry] = &[
    WHEAT,
    SeasonalCropEntry {
        name: "Sugarcane",
        climate_note: "Warm, high moisture",
        tip: "Apply organic fertilizer every month",
        suitable_seasons: &[Season::Kharif, Season::Zaid],
    },
    SeasonalCropEntry {
        name: "Maize",
        climate_note: "Warm, moderate rainfall",
        tip: "Hybrid seeds, timely irrigation",
        suitable_seasons: &[Season::Kharif, Season::Rabi],
    },
    SeasonalCropEntry {
        name: "Chickpea",
        climate_note: "Cool, dry",
        tip: "Rotate with cereals for soil health",
        suitable_seasons: &[Season::Rabi],
    },
];

const SANDY_CROPS: &[SeasonalCropEntry] = &[
    SeasonalCropEntry {
        name: "Groundnut",
        climate_note: "Warm, low to moderate rainfall",
        tip: "Use frequent light irrigation and organic matter to retain moisture",
        suitable_seasons: &[Season::Kharif],
    },
    SeasonalCropEntry {
        name: "Millet",
        climate_note: "Hot, dry",
        tip: "Low fertilizer; drought-tolerant varieties preferred",
        suitable_seasons: &[Season::Kharif],
    },
    SeasonalCropEntry {
        name: "Moong",
        climate_note: "Warm, short duration",
        tip: "Short duration, fits summer gap",
        suitable_seasons: &[Season::Zaid],
    },
];

const CLAY_CROPS: &[SeasonalCropEntry] = &[
    SeasonalCropEntry {
        name: "Rice",
        climate_note: "Warm, high moisture",
        tip: "Ensure proper puddling and drainage management",
        suitable_seasons: &[Season::Kharif],
    },
    SeasonalCropEntry {
        name: "Cotton",
        climate_note: "Warm, moderate rainfall",
        tip: "Improve aeration and avoid waterlogging",
        suitable_seasons: &[Season::Kharif],
    },
    WHEAT,
];

static PROFILES: [SoilProfile; 3] = [
    SoilProfile {
        soil: SoilType::Loamy,
        crops: LOAMY_CROPS,
        irrigation: "Medium water holding capacity. Irrigate every 7-10 days.",
        soil_advice: "Loamy soil is ideal for most crops; rotate crops for best results.",
    },
    SoilProfile {
        soil: SoilType::Sandy,
        crops: SANDY_CROPS,
        irrigation: "Low water retention. Irrigate more frequently with smaller amounts.",
        soil_advice: "Add organic matter and mulches to improve moisture retention.",
    },
    SoilProfile {
        soil: SoilType::Clay,
        crops: CLAY_CROPS,
        irrigation: "High water holding capacity; avoid waterlogging by improving drainage.",
        soil_advice: "Incorporate organic matter and avoid compaction.",
    },
];

pub fn profile(soil: SoilType) -> &'static SoilProfile {
    match soil {
        SoilType::Loamy => &PROFILES[0],
        SoilType::Sandy => &PROFILES[1],
        SoilType::Clay => &PROFILES[2],
    }
}

pub fn profiles() -> &'static [SoilProfile] {
    &PROFILES
}
