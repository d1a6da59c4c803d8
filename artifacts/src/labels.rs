use crate::descriptor::ArtifactFormat;
use crate::error::{Result, ScanError};
use serde_json::Value;
use std::path::Path;

const MAX_CLASSES: usize = 100_000;

/// Class index → label mapping for image classifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelList {
    labels: Vec<String>,
}

impl LabelList {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Load a label list, picking the parser from the artifact format.
    pub fn from_path(path: &Path, format: ArtifactFormat) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        match format {
            ArtifactFormat::LabelJson => Self::parse_json(&text).map_err(|reason| {
                ScanError::InvalidLabels {
                    path: path.to_path_buf(),
                    reason,
                }
            }),
            ArtifactFormat::LabelText => Ok(Self::parse_text(&text)),
            other => Err(ScanError::InvalidLabels {
                path: path.to_path_buf(),
                reason: format!("{other:?} is not a label list format"),
            }),
        }
    }

    /// Parse `labels.json`: either `["a", "b"]` or `{"0": "a", "1": "b"}`.
    ///
    /// Missing indices in the object form become `class_{i}`.
    pub fn parse_json(text: &str) -> std::result::Result<Self, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        match value {
            Value::Array(items) => Ok(Self::new(items.iter().map(label_text).collect())),
            Value::Object(map) => {
                let mut indexed = Vec::with_capacity(map.len());
                for (key, label) in &map {
                    let idx: usize = key
                        .trim()
                        .parse()
                        .map_err(|_| format!("key '{key}' is not a class index"))?;
                    indexed.push((idx, label_text(label)));
                }
                let len = indexed.iter().map(|(idx, _)| idx + 1).max().unwrap_or(0);
                if len > MAX_CLASSES {
                    return Err(format!("class index {} out of range", len - 1));
                }
                let mut labels: Vec<String> = (0..len).map(placeholder).collect();
                for (idx, label) in indexed {
                    labels[idx] = label;
                }
                Ok(Self::new(labels))
            }
            _ => Err("expected a JSON array or object".to_string()),
        }
    }

    /// Parse one label per non-blank line.
    pub fn parse_text(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    /// Label for a class index, `class_{idx}` when out of range.
    pub fn label_for(&self, idx: usize) -> String {
        self.get(idx).map(str::to_string).unwrap_or_else(|| placeholder(idx))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

/// Name used for a class index with no known label.
pub fn placeholder(idx: usize) -> String {
    format!("class_{idx}")
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
