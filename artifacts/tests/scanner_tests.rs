//! Scanner behaviour against real directory trees.

use common::{ArtifactKind, Capability};
use soilsense_artifacts::{scan, scan_report, ArtifactFormat, LabelList};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn touch(dir: &Path, rel: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"stub").unwrap();
}

#[test]
fn test_missing_directories_are_empty() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist");

    let report = scan_report(&[&missing]);
    assert!(report.descriptors.is_empty());
    assert!(report.readable_dirs.is_empty());
    assert_eq!(report.missing_dirs, vec![missing]);
}

#[test]
fn test_classifies_a_typical_model_dir() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "soil_cnn.h5");
    touch(dir, "cropRecommendation.pkl");
    touch(dir, "fertilizerRecommendation.pkl");
    touch(dir, "predictNitrogen.pkl");
    touch(dir, "preprocessor copy.pkl");
    touch(dir, "labels.json");
    touch(dir, "README.md");

    let found = scan(&[dir]);
    assert_eq!(found.len(), 6);

    let by_name = |name: &str| {
        found
            .iter()
            .find(|d| d.name_key() == name.to_lowercase())
            .unwrap_or_else(|| panic!("{name} not found"))
    };
    assert_eq!(by_name("soil_cnn.h5").kind, ArtifactKind::ImageClassifier);
    assert_eq!(
        by_name("soil_cnn.h5").capability(),
        Some(Capability::SoilImageClassifier)
    );
    assert_eq!(
        by_name("predictNitrogen.pkl").capability(),
        Some(Capability::NitrogenEstimator)
    );
    assert_eq!(by_name("preprocessor copy.pkl").kind, ArtifactKind::Preprocessor);
    assert_eq!(by_name("labels.json").format, ArtifactFormat::LabelJson);
}

#[test]
fn test_scan_is_recursive_sorted_and_skips_hidden() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "b/predictPotassium.joblib");
    touch(dir, "a/predictPhosphorus.joblib");
    touch(dir, ".cache/predictNitrogen.joblib");
    touch(dir, ".hidden_crop.pkl");

    let found = scan(&[dir]);
    let names: Vec<String> = found.iter().map(|d| d.name_key()).collect();
    assert_eq!(names, vec!["predictphosphorus.joblib", "predictpotassium.joblib"]);
}

#[test]
fn test_first_directory_wins_on_duplicate_names() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    touch(first.path(), "cropRecommendation.pkl");
    touch(second.path(), "CropRecommendation.pkl");
    touch(second.path(), "predictNitrogen.pkl");

    let report = scan_report(&[first.path(), second.path()]);
    assert_eq!(report.descriptors.len(), 2);
    assert!(report.descriptors[0].path.starts_with(first.path()));
    assert_eq!(report.duplicates.len(), 1);
    assert!(report.duplicates[0].starts_with(second.path()));
    assert_eq!(report.readable_dirs.len(), 2);
}

#[test]
fn test_scan_is_deterministic() {
    let tmp = TempDir::new().unwrap();
    for name in ["z_crop.pkl", "m_nitrogen.pkl", "a_leaf.pt", "classes.txt"] {
        touch(tmp.path(), name);
    }
    assert_eq!(scan(&[tmp.path()]), scan(&[tmp.path()]));
}

#[test]
fn test_saved_model_directory() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "cnn_model/saved_model.pb");
    touch(tmp.path(), "cnn_model/variables/variables.index");

    let found = scan(&[tmp.path()]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].format, ArtifactFormat::SavedModel);
    assert_eq!(found[0].path, tmp.path().join("cnn_model"));
    assert_eq!(found[0].capability(), Some(Capability::SoilImageClassifier));
}

#[test]
fn test_label_list_from_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("classes.txt");
    fs::write(&path, "Loamy\nSandy\nClay\n").unwrap();

    let labels = LabelList::from_path(&path, ArtifactFormat::LabelText).unwrap();
    assert_eq!(labels.label_for(2), "Clay");
    assert_eq!(labels.label_for(3), "class_3");

    let bad = tmp.path().join("labels.json");
    fs::write(&bad, "{ nope").unwrap();
    assert!(LabelList::from_path(&bad, ArtifactFormat::LabelJson).is_err());
}
