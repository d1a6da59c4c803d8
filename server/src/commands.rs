//! Subcommand implementations. Each returns the JSON it would print.

use crate::config::SoilsenseConfig;
use anyhow::{bail, Context, Result};
use common::{Capability, ImageInput, InputKind, PredictionResult};
use serde_json::{json, Value};
use chrono::NaiveDate;
use soilsense_agronomy::{parse_date, resolve_season, Season, SeasonalRecommendationEngine};
use soilsense_artifacts::scan;
use soilsense_pipeline::{
    known_fields, parse_raw_input, schema_for, FeatureVectorBuilder, InferenceRouter, SoilAdvisor,
    SoilImageAdvice, SoilReport,
};
use soilsense_registry::{ModelRegistry, RegistryError};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load the registry. Having no model sources is reported, not fatal.
pub fn load_registry(config: &SoilsenseConfig) -> Result<Arc<ModelRegistry>> {
    let registry = Arc::new(ModelRegistry::new());
    match registry.load(&config.model_dirs) {
        Ok(state) => info!(
            "Registry ready: {} artifacts, {} load errors",
            state.discovered().len(),
            state.errors().len()
        ),
        Err(RegistryError::NoArtifactSources { dirs }) => {
            warn!("No model directory found among {:?}; every capability uses its fallback", dirs)
        }
        Err(err) => return Err(err).context("Failed to load models"),
    }
    Ok(registry)
}

pub fn scan_command(config: &SoilsenseConfig) -> Result<Value> {
    let artifacts: Vec<Value> = scan(&config.model_dirs)
        .into_iter()
        .map(|d| {
            json!({
                "path": d.path,
                "kind": d.kind,
                "format": d.format,
                "capability": d.capability(),
            })
        })
        .collect();
    Ok(json!({ "directories": config.model_dirs, "artifacts": artifacts }))
}

pub fn status_command(config: &SoilsenseConfig) -> Result<Value> {
    let registry = load_registry(config)?;
    Ok(serde_json::to_value(registry.snapshot().report())?)
}

pub async fn predict_command(
    config: &SoilsenseConfig,
    capability: Capability,
    input: Option<&Path>,
    image: Option<&Path>,
) -> Result<PredictionResult> {
    let router = InferenceRouter::new(load_registry(config)?);
    let timeout = config.timeout();

    let result = match capability.input_kind() {
        InputKind::Image => {
            let Some(path) = image else {
                bail!("{} needs --image", capability);
            };
            let image = ImageInput::from_path(path)
                .with_context(|| format!("Failed to read image {:?}", path))?;
            router.predict_within(capability, image, timeout).await
        }
        InputKind::Tabular => {
            if image.is_some() {
                bail!("{} takes --input, not --image", capability);
            }
            let raw = match input {
                Some(path) => read_input(path)?,
                None => serde_json::Map::new(),
            };
            let features = FeatureVectorBuilder::build(capability, &raw);
            router.predict_within(capability, features, timeout).await
        }
    };

    info!(
        "{} -> {} ({:?}, confidence {:?})",
        capability, result.value, result.source, result.confidence
    );
    Ok(result)
}

pub fn recommend_command(soil_label: &str, season: Option<Season>, date: Option<&str>) -> Result<Value> {
    let rec = SeasonalRecommendationEngine::new().recommend_on(soil_label, resolve_date(date)?, season);
    if rec.approximate {
        warn!(
            "Soil label {:?} matched no known soil type; showing {} crops as an approximation",
            soil_label, rec.soil
        );
    }
    Ok(serde_json::to_value(rec)?)
}

/// Classify a soil photo, then recommend crops for the predicted soil type.
pub fn classify_command(
    config: &SoilsenseConfig,
    image: &Path,
    season: Option<Season>,
    date: Option<&str>,
) -> Result<SoilImageAdvice> {
    let season = resolve_season(resolve_date(date)?, season);
    let image = ImageInput::from_path(image).with_context(|| format!("Failed to read image {:?}", image))?;
    let advisor = SoilAdvisor::new(InferenceRouter::new(load_registry(config)?));
    let advice = advisor.classify_soil(image, season);
    info!(
        "Soil image -> {} ({}, confidence {:?}), {} crops for {}",
        advice.soil_type.value,
        advice.soil_type.origin,
        advice.soil_type.confidence,
        advice.recommendation.crops.len(),
        season
    );
    Ok(advice)
}

pub fn report_command(config: &SoilsenseConfig, input: &Path, image: Option<&Path>) -> Result<SoilReport> {
    let raw = read_input(input)?;
    let image = image
        .map(|p| ImageInput::from_path(p).with_context(|| format!("Failed to read image {:?}", p)))
        .transpose()?;
    let advisor = SoilAdvisor::new(InferenceRouter::new(load_registry(config)?));
    Ok(advisor.assess_with_image(&raw, image))
}

pub fn fields_command() -> Value {
    let schemas: serde_json::Map<String, Value> = Capability::ALL
        .iter()
        .filter(|cap| cap.input_kind() == InputKind::Tabular)
        .map(|cap| (cap.to_string(), json!(schema_for(*cap))))
        .collect();
    json!({ "schemas": schemas, "known_fields": known_fields() })
}

/// `YYYY-MM-DD`, or today when absent.
fn resolve_date(date: Option<&str>) -> Result<NaiveDate> {
    Ok(match date {
        Some(text) => parse_date(text)?,
        None => chrono::Local::now().date_naive(),
    })
}

fn read_input(path: &Path) -> Result<serde_json::Map<String, Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {:?}", path))?;
    parse_raw_input(&text).with_context(|| format!("Invalid input file {:?}", path))
}
