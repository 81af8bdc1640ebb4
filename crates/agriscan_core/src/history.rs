use serde::Serialize;

use crate::result::{AnalysisResult, DetectionResult};

/// Preview shown for `.txt`/`.zip` bundles, which have no image to display.
pub const SPECTRAL_PREVIEW_PLACEHOLDER: &str = "placeholder.svg";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum EntryResult {
    Multispectral(AnalysisResult),
    Detection(DetectionResult),
}

/// One analysed upload paired with its outcome. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatHistoryEntry {
    pub file_name: String,
    pub preview: Option<String>,
    pub result: EntryResult,
}

impl ChatHistoryEntry {
    pub fn is_multispectral(&self) -> bool {
        matches!(self.result, EntryResult::Multispectral(_))
    }

    pub fn headline(&self) -> String {
        match &self.result {
            EntryResult::Multispectral(result) => result.headline(),
            EntryResult::Detection(detection) => format!(
                "{} ({:.1}%, {})",
                detection.disease, detection.confidence, detection.severity
            ),
        }
    }
}
