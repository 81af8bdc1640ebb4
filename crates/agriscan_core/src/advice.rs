use std::collections::BTreeMap;

use crate::result::{CropSuitabilityStat, DiseaseRecommendations};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentInfo {
    pub about: String,
    pub immediate_actions: Vec<String>,
    pub treatment_options: Vec<String>,
    pub prevention: Vec<String>,
    pub severity: String,
    pub monitoring: String,
    /// False when the fallback text is used because the backend had no LLM advice.
    pub llm_generated: bool,
}

/// Treatment advice for a detected disease, preferring the backend's LLM recommendations.
pub fn treatment_info(disease: &str, recommendations: Option<&DiseaseRecommendations>) -> TreatmentInfo {
    let Some(rec) = recommendations else {
        return TreatmentInfo {
            about: format!(
                "This is {disease}, a common crop disease. For detailed treatment recommendations, \
                 please ensure the recommendation service is properly configured."
            ),
            immediate_actions: owned(&[
                "Isolate affected plants",
                "Remove severely infected leaves",
                "Improve air circulation",
            ]),
            treatment_options: owned(&[
                "Apply appropriate fungicide",
                "Use organic treatments if available",
            ]),
            prevention: owned(&[
                "Maintain proper spacing between plants",
                "Avoid overhead watering",
                "Monitor plants regularly",
            ]),
            severity: "Moderate".to_string(),
            monitoring: "Check for new infections weekly".to_string(),
            llm_generated: false,
        };
    };

    let protocols = &rec.treatment_protocols;
    TreatmentInfo {
        about: rec.disease_overview.clone(),
        immediate_actions: sentences(&rec.immediate_actions),
        treatment_options: [&protocols.organic, &protocols.chemical, &protocols.application]
            .into_iter()
            .filter(|option| !option.trim().is_empty())
            .cloned()
            .collect(),
        prevention: sentences(&rec.prevention),
        severity: rec.severity_level.clone(),
        monitoring: rec.monitoring.clone(),
        llm_generated: true,
    }
}

fn sentences(text: &str) -> Vec<String> {
    text.split(". ")
        .filter(|part| !part.trim().is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CropSuitabilityInfo {
    pub best_crop: String,
    pub scores: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
}

/// Rank crops by mean suitability and produce planting recommendations for the best one.
pub fn crop_suitability_info(stats: &[CropSuitabilityStat]) -> CropSuitabilityInfo {
    let Some(best) = stats
        .iter()
        .reduce(|best, current| if best.mean > current.mean { best } else { current })
    else {
        return CropSuitabilityInfo {
            best_crop: "Unknown".to_string(),
            scores: BTreeMap::new(),
            recommendations: vec!["No crop suitability data available".to_string()],
        };
    };

    let scores = stats
        .iter()
        .map(|stat| (stat.crop.clone(), stat.mean))
        .collect();

    CropSuitabilityInfo {
        best_crop: best.crop.clone(),
        scores,
        recommendations: crop_recommendations(&best.crop, best.mean),
    }
}

fn crop_recommendations(crop: &str, score: f64) -> Vec<String> {
    let mut out = Vec::new();
    let band = if score >= 0.8 {
        "Excellent"
    } else if score >= 0.6 {
        "Good"
    } else if score >= 0.4 {
        "Moderate"
    } else {
        "Low"
    };
    if band == "Low" {
        out.push(format!(
            "Low suitability for {crop} cultivation - consider alternatives"
        ));
    } else {
        out.push(format!("{band} suitability for {crop} cultivation"));
    }

    let specific: &[&str] = match crop.to_lowercase().as_str() {
        "cashew" => &[
            "Ensure proper spacing (7-9m between trees) for optimal growth",
            "Cashew trees thrive in warm climates with well-drained soils",
        ],
        "cassava" => &[
            "Plant cuttings at 1m spacing for optimal yield",
            "Cassava grows well in various soil types but prefers sandy loams",
        ],
        "tomatoes" => &[
            "Consider drip irrigation for optimal water management",
            "Tomatoes require consistent moisture and fertile soil",
        ],
        "maize" => &[
            "Plant in rows with 75cm spacing for optimal growth",
            "Maize performs best in deep, well-drained soils with good organic matter",
        ],
        _ => &[],
    };
    out.extend(owned(specific));

    out.extend(owned(&[
        "Conduct soil tests to verify nutrient levels before planting",
        "Consider crop rotation to maintain soil health",
        "Monitor weather forecasts for optimal planting and harvesting times",
    ]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TreatmentProtocols;

    fn stat(crop: &str, mean: f64) -> CropSuitabilityStat {
        CropSuitabilityStat {
            crop: crop.to_string(),
            mean,
            ..CropSuitabilityStat::default()
        }
    }

    #[test]
    fn best_crop_has_highest_mean() {
        let info = crop_suitability_info(&[stat("Cassava", 0.41), stat("Maize", 0.83)]);
        assert_eq!(info.best_crop, "Maize");
        assert_eq!(info.scores.len(), 2);
        assert_eq!(info.recommendations[0], "Excellent suitability for Maize cultivation");
        assert!(info
            .recommendations
            .iter()
            .any(|rec| rec.contains("75cm spacing")));
        assert_eq!(info.recommendations.len(), 6);
    }

    #[test]
    fn empty_stats_yield_unknown() {
        let info = crop_suitability_info(&[]);
        assert_eq!(info.best_crop, "Unknown");
        assert_eq!(info.recommendations, vec!["No crop suitability data available"]);
    }

    #[test]
    fn low_score_suggests_alternatives() {
        let info = crop_suitability_info(&[stat("Sorghum", 0.2)]);
        assert_eq!(
            info.recommendations[0],
            "Low suitability for Sorghum cultivation - consider alternatives"
        );
        assert_eq!(info.recommendations.len(), 4);
    }

    #[test]
    fn llm_recommendations_are_split_into_sentences() {
        let rec = DiseaseRecommendations {
            disease_overview: "Fungal disease.".to_string(),
            immediate_actions: "Remove leaves. Burn debris. ".to_string(),
            treatment_protocols: TreatmentProtocols {
                organic: "Neem oil".to_string(),
                chemical: " ".to_string(),
                application: "Weekly".to_string(),
            },
            severity_level: "High".to_string(),
            ..DiseaseRecommendations::default()
        };
        let info = treatment_info("Blight", Some(&rec));
        assert!(info.llm_generated);
        assert_eq!(info.immediate_actions, vec!["Remove leaves", "Burn debris"]);
        assert_eq!(info.treatment_options, vec!["Neem oil", "Weekly"]);
        assert_eq!(info.severity, "High");
    }

    #[test]
    fn fallback_advice_mentions_disease() {
        let info = treatment_info("Leaf Spot", None);
        assert!(!info.llm_generated);
        assert!(info.about.starts_with("This is Leaf Spot"));
        assert_eq!(info.immediate_actions.len(), 3);
    }
}
