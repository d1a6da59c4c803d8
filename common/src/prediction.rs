//! `PredictionResult`: the value every caller of the core receives.
//!
//! Never null. Confidence is either within `[0, 1]` or explicitly absent.

use crate::capability::Capability;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Tagged prediction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PredictionValue {
    Label(String),
    Scalar(f64),
    Struct(Map<String, Value>),
}

impl PredictionValue {
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::Scalar(v) => write!(f, "{v:.3}"),
            Self::Struct(map) => write!(f, "{}", Value::Object(map.clone())),
        }
    }
}

/// Who produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Model,
    Fallback,
}

/// Why the router fell through to the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// No artifact occupies the capability slot
    NoModel,
    /// An artifact exists but failed to load
    LoadFailed,
    /// The model call returned an error or panicked
    ModelFailed,
    /// The model call exceeded the caller's deadline
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub capability: Capability,
    pub value: PredictionValue,
    pub confidence: Option<f64>,
    pub source: Source,

    /// Set iff `source == Fallback`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,

    /// Short explanatory tag naming the rule or model path that produced the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Human readable advice accompanying the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl PredictionResult {
    /// Model-sourced result. Confidence is normalised to `[0, 1]`.
    pub fn from_model(capability: Capability, value: PredictionValue, confidence: Option<f64>) -> Self {
        Self {
            capability,
            value,
            confidence: confidence.and_then(normalize_confidence),
            source: Source::Model,
            fallback_reason: None,
            tag: None,
            advisory: None,
        }
    }

    /// Fallback-sourced result with its rule tag.
    pub fn from_fallback(
        capability: Capability,
        value: PredictionValue,
        confidence: f64,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            capability,
            value,
            confidence: normalize_confidence(confidence),
            source: Source::Fallback,
            fallback_reason: Some(FallbackReason::NoModel),
            tag: Some(tag.into()),
            advisory: None,
        }
    }

    pub fn with_reason(mut self, reason: FallbackReason) -> Self {
        if self.source == Source::Fallback {
            self.fallback_reason = Some(reason);
        }
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_advisory(mut self, advisory: impl Into<String>) -> Self {
        self.advisory = Some(advisory.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Source::Fallback
    }
}

/// Clip a confidence into `[0, 1]`; non-finite values become absent.
pub fn normalize_confidence(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}
