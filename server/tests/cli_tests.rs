//! End-to-end command tests against temporary model directories.

use common::{Capability, FallbackReason, Source};
use soilsense_server::commands::{
    classify_command, fields_command, load_registry, predict_command, recommend_command, report_command,
    scan_command, status_command,
};
use soilsense_server::SoilsenseConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn config_for(dirs: &[&Path]) -> SoilsenseConfig {
    SoilsenseConfig {
        model_dirs: dirs.iter().map(|d| d.to_path_buf()).collect(),
        ..SoilsenseConfig::default()
    }
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_scan_lists_classified_artifacts() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "cropRecommendation.pkl", "x");
    write(tmp.path(), "labels.json", r#"["Loamy"]"#);
    write(tmp.path(), "notes.md", "ignored");

    let out = scan_command(&config_for(&[tmp.path()])).unwrap();
    let artifacts = out["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 2);
    let crop = artifacts
        .iter()
        .find(|a| a["capability"] == "crop-recommender")
        .unwrap();
    assert_eq!(crop["kind"], "tabular-model");
}

#[test]
fn test_status_without_sources_still_reports() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing");
    let out = status_command(&config_for(&[&missing])).unwrap();
    assert_eq!(out["capabilities"]["crop-recommender"]["status"], "absent");
    assert_eq!(out["missing_dirs"][0], missing.display().to_string());
}

#[cfg(not(feature = "python"))]
#[test]
fn test_status_records_unavailable_backend() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "predictNitrogen.pkl", "x");
    write(tmp.path(), "classes.txt", "Loamy\nClay\n");

    let config = config_for(&[tmp.path()]);
    let out = status_command(&config).unwrap();
    assert_eq!(out["capabilities"]["nitrogen-estimator"]["status"], "failed");
    assert_eq!(out["label_count"], 2);

    let registry = load_registry(&config).unwrap();
    assert!(registry.get(Capability::NitrogenEstimator).is_some());
}

#[tokio::test]
async fn test_predict_falls_back_without_models() {
    let tmp = TempDir::new().unwrap();
    let input = write(tmp.path(), "input.json", r#"{"ph": "6.5"}"#);
    let config = config_for(&[tmp.path()]);

    let result = predict_command(&config, Capability::CropRecommender, Some(&input), None)
        .await
        .unwrap();
    assert_eq!(result.source, Source::Fallback);
    assert_eq!(result.fallback_reason, Some(FallbackReason::NoModel));
    assert_eq!(result.value.as_label(), Some("Wheat"));
}

#[tokio::test]
async fn test_predict_image_capability_needs_an_image() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(&[tmp.path()]);
    assert!(predict_command(&config, Capability::SoilImageClassifier, None, None)
        .await
        .is_err());

    let image = write(tmp.path(), "soil.png", "not really a png");
    let result = predict_command(&config, Capability::SoilImageClassifier, None, Some(&image))
        .await
        .unwrap();
    assert_eq!(result.value.as_label(), Some("Loamy"));
}

#[tokio::test]
async fn test_predict_rejects_non_object_input() {
    let tmp = TempDir::new().unwrap();
    let input = write(tmp.path(), "input.json", "[1, 2, 3]");
    let config = config_for(&[tmp.path()]);
    assert!(predict_command(&config, Capability::NitrogenEstimator, Some(&input), None)
        .await
        .is_err());
}

#[test]
fn test_recommend_with_date_and_override() {
    let out = recommend_command("Clay", None, Some("2024-07-15")).unwrap();
    assert_eq!(out["season"], "Kharif");
    let names: Vec<_> = out["crops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Rice", "Cotton"]);

    let out = recommend_command("Clay", Some(soilsense_agronomy::Season::Rabi), Some("2024-07-15")).unwrap();
    assert_eq!(out["crops"][0]["name"], "Wheat");

    assert!(recommend_command("Clay", None, Some("15/07/2024")).is_err());
}

#[test]
fn test_classify_recommends_for_fallback_soil() {
    let tmp = TempDir::new().unwrap();
    let image = write(tmp.path(), "soil.png", "not really a png");
    let config = config_for(&[tmp.path()]);

    let advice = classify_command(&config, &image, None, Some("2024-07-15")).unwrap();
    assert_eq!(advice.soil_type.value, "Loamy");
    assert_eq!(advice.soil_type.origin, "fallback");
    assert_eq!(advice.soil_type.confidence, Some(0.6));

    let out = serde_json::to_value(&advice).unwrap();
    assert_eq!(out["recommendation"]["season"], "Kharif");
    assert_eq!(out["recommendation"]["soil"], "Loamy");
    assert!(out["recommendation"]["irrigation"].as_str().is_some());

    let advice = classify_command(&config, &image, Some(soilsense_agronomy::Season::Rabi), Some("2024-07-15")).unwrap();
    assert_eq!(advice.recommendation.crops[0].name, "Wheat");

    assert!(classify_command(&config, &tmp.path().join("missing.png"), None, None).is_err());
    assert!(classify_command(&config, &image, None, Some("July")).is_err());
}

#[test]
fn test_report_from_file() {
    let tmp = TempDir::new().unwrap();
    let input = write(
        tmp.path(),
        "reading.json",
        r#"{"ph": 6.0, "soil_moisture": 30, "nitrogen": 20, "phosphorus": 5, "crop_type": "Maize", "soil_type": "Clay"}"#,
    );
    let report = report_command(&config_for(&[tmp.path()]), &input, None).unwrap();
    assert_eq!(report.recommended_crop.value.as_label(), Some("Wheat"));
    assert_eq!(
        report.fertilizer_suggestion.value.as_label(),
        Some("DAP (Phosphorus rich)")
    );
    assert_eq!(report.soil_type.value, "Clay");
    assert_eq!(report.user_crop.message, "Suitable");
}

#[test]
fn test_fields_lists_schemas() {
    let out = fields_command();
    assert_eq!(out["schemas"]["crop-recommender"][2]["name"], "ph");
    assert!(out["schemas"].get("soil-image-classifier").is_none());
    assert!(out["known_fields"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "phosphorous"));
}
