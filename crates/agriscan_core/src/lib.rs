//! Agriscan core: pure analysis state machine, result adapters and view-model helpers.
mod adapter;
mod advice;
mod effect;
mod history;
mod job;
mod msg;
mod result;
mod state;
mod update;
mod upload;
mod view_model;

pub use adapter::{adapt_analysis, adapt_prediction, payload_filename, AdaptError, LIMITED_FALLBACK_MESSAGE};
pub use advice::{crop_suitability_info, treatment_info, CropSuitabilityInfo, TreatmentInfo};
pub use effect::Effect;
pub use history::{ChatHistoryEntry, EntryResult, SPECTRAL_PREVIEW_PLACEHOLDER};
pub use job::{JobId, JobStatus};
pub use msg::Msg;
pub use result::{
    AnalysisResult, AnalysisSummary, CropSuitabilityStat, DetectionResult, DiseaseRecommendations,
    EnvironmentalStat, FullAnalysis, LimitedAnalysis, PredictionItem, PredictionResponse,
    Severity, TreatmentProtocols,
};
pub use state::{progress_for_iteration, AnalysisPhase, AppState, FailureCategory};
pub use update::update;
pub use upload::{
    check_size, classify_file, plan_upload, FileKind, SelectedFile, UploadRoute, ValidationError,
    MAX_FILE_BYTES,
};
pub use view_model::{AppViewModel, HistoryRowView};
