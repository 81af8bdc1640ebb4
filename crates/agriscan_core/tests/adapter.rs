use agriscan_core::{
    adapt_analysis, adapt_prediction, payload_filename, AdaptError, AnalysisResult,
    PredictionResponse, Severity, LIMITED_FALLBACK_MESSAGE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn full_payload() -> serde_json::Value {
    json!({
        "status": "success",
        "filename": "LC09_bands.zip",
        "analysis_type": "multispectral",
        "results": {
            "best_crop": "Cassava",
            "prediction": "Cassava is the most suitable crop for this area.",
            "environmental_statistics": [
                {"name": "NDVI", "min": 0.1, "max": 0.9, "mean": 0.5, "percentile_25": 0.3, "percentile_75": 0.7},
                {"name": "LST", "min": 290.0, "max": 310.0, "mean": 301.5, "percentile_25": 298.0, "percentile_75": 304.0},
                {"name": "Moisture", "min": 0.0, "max": 0.4, "mean": 0.2, "percentile_25": 0.1, "percentile_75": 0.3}
            ],
            "crop_suitability_statistics": [
                {"crop": "Cashew", "min": 0.0, "max": 0.8, "mean": 0.4, "percentile_25": 0.2, "percentile_75": 0.6},
                {"crop": "Cassava", "min": 0.2, "max": 1.0, "mean": 0.7, "percentile_25": 0.5, "percentile_75": 0.9},
                {"crop": "Maize", "min": 0.0, "max": 0.7, "mean": 0.3, "percentile_25": 0.1, "percentile_75": 0.5}
            ],
            "suitability_images": {"Cashew": "aW1n", "Cassava": "aW1nMg==", "Maize": "aW1nMw=="},
            "soil_type_image": "c29pbA==",
            "analysis_summary": {
                "total_pixels": 1000,
                "valid_pixels": 950,
                "bands_processed": ["B2", "B4", "B5", "B6", "B10"]
            }
        }
    })
}

#[test]
fn payload_without_summary_is_limited() {
    let payload = json!({
        "status": "success",
        "results": {
            "message": "Only MTL metadata found.",
            "metadata": {"sun_elevation": 54.2},
            "raw_metadata": {"SPACECRAFT_ID": "LANDSAT_9"}
        }
    });

    let result = adapt_analysis(&payload).expect("limited result");
    match result {
        AnalysisResult::Limited(limited) => {
            assert_eq!(limited.message, "Only MTL metadata found.");
            assert_eq!(limited.metadata, json!({"sun_elevation": 54.2}));
            assert_eq!(limited.raw_metadata, json!({"SPACECRAFT_ID": "LANDSAT_9"}));
        }
        other => panic!("expected limited result, got {other:?}"),
    }
}

#[test]
fn limited_defaults_fill_missing_fields() {
    let result = adapt_analysis(&json!({"results": {}})).expect("limited result");
    match result {
        AnalysisResult::Limited(limited) => {
            assert_eq!(limited.message, LIMITED_FALLBACK_MESSAGE);
            assert_eq!(limited.metadata, json!({}));
            assert_eq!(limited.raw_metadata, json!({}));
        }
        other => panic!("expected limited result, got {other:?}"),
    }
}

#[test]
fn limited_status_wins_over_summary() {
    let mut payload = full_payload();
    payload["status"] = json!("limited");
    assert!(adapt_analysis(&payload).unwrap().is_limited());
}

#[test]
fn full_payload_keeps_every_statistic() {
    let payload = full_payload();
    let result = adapt_analysis(&payload).expect("full result");
    let AnalysisResult::Full(full) = result else {
        panic!("expected full result");
    };

    let names: Vec<_> = full
        .environmental_stats
        .iter()
        .map(|stat| stat.name.as_str())
        .collect();
    assert_eq!(names, vec!["NDVI", "LST", "Moisture"]);

    let crops: Vec<_> = full
        .crop_suitability_stats
        .iter()
        .map(|stat| stat.crop.as_str())
        .collect();
    assert_eq!(crops, vec!["Cashew", "Cassava", "Maize"]);

    assert_eq!(full.best_crop, "Cassava");
    assert_eq!(full.crop_suitability_stats[1].percentile_75, 0.9);
    assert_eq!(full.suitability_images.len(), 3);
    assert_eq!(full.soil_type_image, "c29pbA==");
    assert_eq!(full.summary.total_pixels, 1000);
    assert_eq!(full.summary.valid_pixels, 950);
    assert_eq!(full.summary.bands_processed.len(), 5);
    assert_eq!(payload_filename(&payload).as_deref(), Some("LC09_bands.zip"));
}

#[test]
fn missing_results_is_a_hard_error() {
    assert_eq!(
        adapt_analysis(&json!({"status": "success"})),
        Err(AdaptError::MissingResults)
    );
    assert_eq!(adapt_analysis(&serde_json::Value::Null), Err(AdaptError::MissingResults));
}

#[test]
fn prediction_uses_top_class() {
    let response: PredictionResponse = serde_json::from_value(json!({
        "status": "success",
        "predictions": [
            {"class": "Cassava_Brown_Streak", "confidence": 0.8734, "confidence_percentage": "87.34%"},
            {"class": "Cassava_Mosaic", "confidence": 0.1, "confidence_percentage": "10.00%"}
        ],
        "total_classes": 22,
        "llm_available": false
    }))
    .unwrap();

    let detection = adapt_prediction(&response, "leaf.jpg").unwrap();
    assert_eq!(detection.disease, "Cassava_Brown_Streak");
    assert_eq!(detection.confidence, 87.3);
    assert_eq!(detection.severity, Severity::Severe);
    assert_eq!(detection.crop_type, "Cassava");
    assert_eq!(detection.image_path, "leaf.jpg");
    assert!(detection.recommendations.is_none());
}

#[test]
fn prediction_without_classes_is_rejected() {
    let response: PredictionResponse =
        serde_json::from_value(json!({"status": "success", "predictions": []})).unwrap();
    assert_eq!(
        adapt_prediction(&response, "leaf.jpg"),
        Err(AdaptError::NoPredictions)
    );
}
