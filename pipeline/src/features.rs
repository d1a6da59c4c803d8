//! Per-capability feature schemas and the builder that fills them.
//!
//! Every tabular capability declares an ordered list of fields with
//! defaults. [`FeatureVectorBuilder::build`] always yields exactly that many
//! values in that order: a missing field, a `null`, or a value that cannot
//! be read as a finite number all take the declared default.

use common::{Capability, SchemaMismatchError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One named input field with its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: f64,
    /// Alternative spellings accepted from callers
    pub aliases: &'static [&'static str],
}

const fn field(name: &'static str, default: f64) -> FieldSpec {
    FieldSpec {
        name,
        default,
        aliases: &[],
    }
}

const TEMPERATURE: FieldSpec = field("temperature", 25.0);
const HUMIDITY: FieldSpec = field("humidity", 50.0);
const PH: FieldSpec = field("ph", 7.0);
const NITROGEN: FieldSpec = field("nitrogen", 10.0);
const POTASSIUM: FieldSpec = field("potassium", 10.0);
const SOIL_MOISTURE: FieldSpec = FieldSpec {
    name: "soil_moisture",
    default: 30.0,
    aliases: &["moisture"],
};
const PHOSPHORUS: FieldSpec = FieldSpec {
    name: "phosphorus",
    default: 10.0,
    aliases: &["phosphorous"],
};

const CROP_SCHEMA: &[FieldSpec] = &[TEMPERATURE, SOIL_MOISTURE, PH];
const FERTILIZER_SCHEMA: &[FieldSpec] = &[NITROGEN, PHOSPHORUS, POTASSIUM, PH, SOIL_MOISTURE];
const NUTRIENT_SCHEMA: &[FieldSpec] = &[PH, SOIL_MOISTURE, TEMPERATURE];

/// Numeric fields of a manual soil report, in report order.
pub const REPORT_SCHEMA: &[FieldSpec] = &[
    TEMPERATURE,
    HUMIDITY,
    SOIL_MOISTURE,
    PH,
    NITROGEN,
    PHOSPHORUS,
    POTASSIUM,
];

/// Ordered schema for `capability`. Image capabilities take no fields.
pub fn schema_for(capability: Capability) -> &'static [FieldSpec] {
    match capability {
        Capability::CropRecommender => CROP_SCHEMA,
        Capability::FertilizerRecommender => FERTILIZER_SCHEMA,
        Capability::NitrogenEstimator
        | Capability::PhosphorusEstimator
        | Capability::PotassiumEstimator => NUTRIENT_SCHEMA,
        Capability::SoilImageClassifier | Capability::DiseaseClassifier => &[],
    }
}

/// Every field name and alias any schema accepts, sorted.
pub fn known_fields() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Capability::ALL
        .iter()
        .flat_map(|cap| schema_for(*cap).iter())
        .chain(REPORT_SCHEMA.iter())
        .flat_map(|spec| std::iter::once(spec.name).chain(spec.aliases.iter().copied()))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Ordered, fully populated numeric input for one capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    capability: Capability,
    names: Vec<&'static str>,
    values: Vec<f64>,
    /// Fields that took their declared default
    defaulted: Vec<&'static str>,
}

impl FeatureVector {
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn defaulted(&self) -> &[&'static str] {
        &self.defaulted
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.names.iter().copied().zip(self.values.iter().copied())
    }
}

/// Looks up raw fields case-insensitively, trying aliases after the name.
pub(crate) struct RawFields<'a> {
    by_key: HashMap<String, &'a Value>,
}

impl<'a> RawFields<'a> {
    pub(crate) fn new(raw: &'a Map<String, Value>) -> Self {
        let mut by_key = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            // First spelling wins when keys differ only by case.
            by_key.entry(key.trim().to_lowercase()).or_insert(value);
        }
        Self { by_key }
    }

    pub(crate) fn lookup(&self, name: &str, aliases: &[&str]) -> Option<&'a Value> {
        std::iter::once(name)
            .chain(aliases.iter().copied())
            .filter_map(|key| self.by_key.get(key).copied())
            .find(|value| !value.is_null())
    }

    /// Value for `spec`, or its default. `Err` carries the rejected raw value.
    pub(crate) fn number(&self, spec: &FieldSpec) -> std::result::Result<Option<f64>, SchemaMismatchError> {
        let Some(raw) = self.lookup(spec.name, spec.aliases) else {
            return Ok(None);
        };
        match coerce(raw) {
            Some(v) => Ok(Some(v)),
            None => Err(SchemaMismatchError {
                field: spec.name,
                raw: raw.to_string(),
                default: spec.default,
            }),
        }
    }

    /// Trimmed text value; numbers are rendered, anything else is absent.
    pub(crate) fn text(&self, name: &str) -> Option<String> {
        match self.lookup(name, &[])? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn coerce(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Read `spec` from `fields`, logging and defaulting on a mismatch.
pub(crate) fn resolve(fields: &RawFields<'_>, spec: &FieldSpec) -> (f64, bool) {
    match fields.number(spec) {
        Ok(Some(v)) => (v, false),
        Ok(None) => (spec.default, true),
        Err(mismatch) => {
            log::debug!("{}", mismatch);
            (spec.default, true)
        }
    }
}

/// Builds [`FeatureVector`]s from loosely-typed input records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorBuilder;

impl FeatureVectorBuilder {
    /// Fill `capability`'s schema from `raw`. Never fails.
    pub fn build(capability: Capability, raw: &Map<String, Value>) -> FeatureVector {
        let fields = RawFields::new(raw);
        let schema = schema_for(capability);

        let mut values = Vec::with_capacity(schema.len());
        let mut defaulted = Vec::new();
        for spec in schema {
            let (value, was_default) = resolve(&fields, spec);
            if was_default {
                defaulted.push(spec.name);
            }
            values.push(value);
        }

        FeatureVector {
            capability,
            names: schema.iter().map(|s| s.name).collect(),
            values,
            defaulted,
        }
    }

    /// All-defaults vector for `capability`.
    pub fn defaults(capability: Capability) -> FeatureVector {
        Self::build(capability, &Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_schema_order_and_defaults() {
        let fv = FeatureVectorBuilder::defaults(Capability::FertilizerRecommender);
        assert_eq!(
            fv.names(),
            &["nitrogen", "phosphorus", "potassium", "ph", "soil_moisture"]
        );
        assert_eq!(fv.values(), &[10.0, 10.0, 10.0, 7.0, 30.0]);
        assert_eq!(fv.defaulted().len(), 5);
    }

    #[test]
    fn test_coercion() {
        let raw = obj(json!({
            "PH": "5.5",
            "temperature": "warm",
            "moisture": 41,
        }));
        let fv = FeatureVectorBuilder::build(Capability::CropRecommender, &raw);
        assert_eq!(fv.values(), &[25.0, 41.0, 5.5]);
        assert_eq!(fv.defaulted(), &["temperature"]);
        assert_eq!(fv.get("ph"), Some(5.5));
        assert_eq!(fv.get("humidity"), None);
    }

    #[test]
    fn test_canonical_name_beats_alias() {
        let raw = obj(json!({"phosphorous": 3, "phosphorus": 4}));
        let fv = FeatureVectorBuilder::build(Capability::FertilizerRecommender, &raw);
        assert_eq!(fv.get("phosphorus"), Some(4.0));

        let raw = obj(json!({"phosphorus": null, "phosphorous": 3}));
        let fv = FeatureVectorBuilder::build(Capability::FertilizerRecommender, &raw);
        assert_eq!(fv.get("phosphorus"), Some(3.0));
    }

    #[test]
    fn test_non_finite_and_odd_types_default() {
        let raw = obj(json!({"ph": "NaN", "soil_moisture": true, "temperature": [1]}));
        let fv = FeatureVectorBuilder::build(Capability::NitrogenEstimator, &raw);
        assert_eq!(fv.values(), &[7.0, 30.0, 25.0]);
    }

    #[test]
    fn test_image_capabilities_have_no_schema() {
        assert!(FeatureVectorBuilder::defaults(Capability::SoilImageClassifier).is_empty());
    }

    #[test]
    fn test_known_fields_include_aliases() {
        let fields = known_fields();
        for name in ["ph", "soil_moisture", "moisture", "phosphorous", "humidity"] {
            assert!(fields.contains(&name), "{name}");
        }
        let mut sorted = fields.clone();
        sorted.sort_unstable();
        assert_eq!(fields, sorted);
    }
}
