use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::result::{
    null_as_default, AnalysisResult, AnalysisSummary, CropSuitabilityStat, DetectionResult,
    EnvironmentalStat, FullAnalysis, LimitedAnalysis, PredictionResponse, Severity,
};

pub const LIMITED_FALLBACK_MESSAGE: &str =
    "Only metadata extracted. Full analysis requires band files.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptError {
    #[error("No analysis results received")]
    MissingResults,
    #[error("malformed analysis results: {0}")]
    Malformed(String),
    #[error("No predictions received")]
    NoPredictions,
    #[error("Invalid prediction data")]
    InvalidPrediction,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSummary {
    #[serde(deserialize_with = "null_as_default")]
    total_pixels: u64,
    #[serde(deserialize_with = "null_as_default")]
    valid_pixels: u64,
    #[serde(deserialize_with = "null_as_default")]
    bands_processed: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResults {
    #[serde(deserialize_with = "null_as_default")]
    best_crop: String,
    #[serde(deserialize_with = "null_as_default")]
    prediction: String,
    #[serde(deserialize_with = "null_as_default")]
    environmental_statistics: Vec<EnvironmentalStat>,
    #[serde(deserialize_with = "null_as_default")]
    crop_suitability_statistics: Vec<CropSuitabilityStat>,
    #[serde(deserialize_with = "null_as_default")]
    suitability_images: BTreeMap<String, Option<String>>,
    #[serde(deserialize_with = "null_as_default")]
    soil_type_image: String,
    #[serde(deserialize_with = "null_as_default")]
    analysis_summary: RawSummary,
}

/// Convert a completed job's payload into the view-model result.
///
/// The payload is limited when its top-level status is `"limited"` or when
/// `results.analysis_summary` is absent; every other payload is a full result.
pub fn adapt_analysis(payload: &Value) -> Result<AnalysisResult, AdaptError> {
    let results = payload
        .get("results")
        .and_then(Value::as_object)
        .ok_or(AdaptError::MissingResults)?;

    let limited_status = payload.get("status").and_then(Value::as_str) == Some("limited");
    let has_summary = results
        .get("analysis_summary")
        .is_some_and(|summary| !summary.is_null());

    if limited_status || !has_summary {
        return Ok(AnalysisResult::Limited(limited_from(results)));
    }

    let raw: RawResults = serde_json::from_value(Value::Object(results.clone()))
        .map_err(|err| AdaptError::Malformed(err.to_string()))?;

    Ok(AnalysisResult::Full(FullAnalysis {
        best_crop: raw.best_crop,
        prediction: raw.prediction,
        environmental_stats: raw.environmental_statistics,
        crop_suitability_stats: raw.crop_suitability_statistics,
        suitability_images: raw
            .suitability_images
            .into_iter()
            .filter_map(|(name, image)| image.map(|image| (name, image)))
            .collect(),
        soil_type_image: raw.soil_type_image,
        summary: AnalysisSummary {
            total_pixels: raw.analysis_summary.total_pixels,
            valid_pixels: raw.analysis_summary.valid_pixels,
            bands_processed: raw.analysis_summary.bands_processed,
        },
    }))
}

fn limited_from(results: &Map<String, Value>) -> LimitedAnalysis {
    let object_or_empty = |key: &str| {
        results
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    };
    LimitedAnalysis {
        message: results
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or(LIMITED_FALLBACK_MESSAGE)
            .to_string(),
        metadata: object_or_empty("metadata"),
        raw_metadata: object_or_empty("raw_metadata"),
    }
}

/// Name of the uploaded bundle as echoed by the backend, if any.
pub fn payload_filename(payload: &Value) -> Option<String> {
    payload
        .get("filename")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
}

/// Convert a single-image prediction into a detection result using the top prediction.
pub fn adapt_prediction(
    response: &PredictionResponse,
    image_path: &str,
) -> Result<DetectionResult, AdaptError> {
    let top = response
        .predictions
        .first()
        .ok_or(AdaptError::NoPredictions)?;
    if top.class_name.trim().is_empty() {
        return Err(AdaptError::InvalidPrediction);
    }

    let confidence = top.confidence * 100.0;
    Ok(DetectionResult {
        disease: top.class_name.clone(),
        confidence: (confidence * 10.0).round() / 10.0,
        severity: Severity::from_confidence(confidence),
        crop_type: crop_type_for(&top.class_name).to_string(),
        image_path: image_path.to_string(),
        recommendations: response.recommendations.clone(),
        llm_available: response.llm_available,
    })
}

fn crop_type_for(disease: &str) -> &'static str {
    let lower = disease.to_lowercase();
    [
        ("cashew", "Cashew"),
        ("cassava", "Cassava"),
        ("maize", "Maize"),
        ("tomato", "Tomato"),
    ]
    .into_iter()
    .find(|(needle, _)| lower.contains(needle))
    .map(|(_, crop)| crop)
    .unwrap_or("Unknown Crop")
}
