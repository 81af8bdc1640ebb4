use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reads an explicit JSON `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One named environmental statistic (NDVI, land surface temperature, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentalStat {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub min: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub mean: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub percentile_25: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub percentile_75: f64,
}

/// Suitability statistic for one crop, same shape as [`EnvironmentalStat`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSuitabilityStat {
    #[serde(deserialize_with = "null_as_default")]
    pub crop: String,
    #[serde(deserialize_with = "null_as_default")]
    pub min: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub mean: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub percentile_25: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub percentile_75: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_pixels: u64,
    pub valid_pixels: u64,
    pub bands_processed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub best_crop: String,
    pub prediction: String,
    pub environmental_stats: Vec<EnvironmentalStat>,
    pub crop_suitability_stats: Vec<CropSuitabilityStat>,
    /// Crop or band name mapped to an encoded image payload.
    pub suitability_images: BTreeMap<String, String>,
    pub soil_type_image: String,
    pub summary: AnalysisSummary,
}

/// Partial outcome when only metadata could be extracted from the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitedAnalysis {
    pub message: String,
    pub metadata: Value,
    pub raw_metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AnalysisResult {
    Full(FullAnalysis),
    Limited(LimitedAnalysis),
}

impl AnalysisResult {
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited(_))
    }

    pub fn headline(&self) -> String {
        match self {
            Self::Full(full) => format!("Best crop: {}", full.best_crop),
            Self::Limited(limited) => limited.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentProtocols {
    pub organic: String,
    pub chemical: String,
    pub application: String,
}

/// LLM-generated advice the backend attaches to a prediction when available.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseRecommendations {
    pub disease_overview: String,
    pub immediate_actions: String,
    pub treatment_protocols: TreatmentProtocols,
    pub prevention: String,
    pub monitoring: String,
    pub cost_effective: String,
    pub severity_level: String,
    pub professional_help: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionItem {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub confidence_percentage: String,
}

/// Body of `POST /predict/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub predictions: Vec<PredictionItem>,
    #[serde(default)]
    pub total_classes: u32,
    #[serde(default)]
    pub recommendations: Option<DiseaseRecommendations>,
    #[serde(default)]
    pub llm_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Confidence is a percentage in `0.0..=100.0`.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 80.0 {
            Self::Severe
        } else if confidence > 60.0 {
            Self::Moderate
        } else {
            Self::Mild
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        };
        f.write_str(label)
    }
}

/// Single-image disease detection outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub disease: String,
    /// Percentage rounded to one decimal.
    pub confidence: f64,
    pub severity: Severity,
    pub crop_type: String,
    pub image_path: String,
    pub recommendations: Option<DiseaseRecommendations>,
    pub llm_available: bool,
}
