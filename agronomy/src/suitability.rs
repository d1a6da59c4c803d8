//! How well a user-chosen crop fits a measured pH and moisture.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn mid(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// 1 at the midpoint, falling linearly to 0 one full width away.
    fn closeness(&self, x: f64) -> f64 {
        let width = self.max - self.min;
        (1.0 - (x - self.mid()).abs() / width).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdealRanges {
    pub ph: Range,
    pub moisture: Range,
}

const IDEAL_RANGES: [(&str, IdealRanges); 4] = [
    (
        "Wheat",
        IdealRanges {
            ph: Range::new(6.0, 7.5),
            moisture: Range::new(20.0, 40.0),
        },
    ),
    (
        "Maize",
        IdealRanges {
            ph: Range::new(5.5, 7.0),
            moisture: Range::new(25.0, 50.0),
        },
    ),
    (
        "Soybean",
        IdealRanges {
            ph: Range::new(5.0, 6.5),
            moisture: Range::new(20.0, 45.0),
        },
    ),
    (
        "Cotton",
        IdealRanges {
            ph: Range::new(6.0, 8.0),
            moisture: Range::new(15.0, 35.0),
        },
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suitability {
    /// 0-100, absent when no crop was given.
    pub score: Option<u32>,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ideal_ranges: Option<IdealRanges>,
}

/// Ideal ranges for `crop`, matching either name containing the other.
pub fn ideal_ranges(crop: &str) -> Option<(&'static str, IdealRanges)> {
    let wanted = crop.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    IDEAL_RANGES.iter().copied().find(|(name, _)| {
        let name = name.to_lowercase();
        name == wanted || name.contains(&wanted) || wanted.contains(&name)
    })
}

pub fn suitability(crop: &str, ph: f64, moisture: f64) -> Suitability {
    if crop.trim().is_empty() {
        return Suitability {
            score: None,
            message: "No crop provided",
            ideal_ranges: None,
        };
    }

    match ideal_ranges(crop) {
        Some((_, ranges)) => {
            let mean = (ranges.ph.closeness(ph) + ranges.moisture.closeness(moisture)) / 2.0;
            let score = to_score(mean * 100.0);
            let message = if score >= 60 {
                "Suitable"
            } else if score >= 35 {
                "Marginal"
            } else {
                "Not suitable"
            };
            Suitability {
                score: Some(score),
                message,
                ideal_ranges: Some(ranges),
            }
        }
        None => {
            let score = to_score(100.0 - (ph - 7.0).abs() * 20.0);
            let message = if score >= 50 {
                "Roughly suitable"
            } else {
                "Unknown crop, limited guidance"
            };
            Suitability {
                score: Some(score),
                message,
                ideal_ranges: None,
            }
        }
    }
}

/// Truncate into 0..=100; NaN scores as 0.
fn to_score(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0) as u32
}
