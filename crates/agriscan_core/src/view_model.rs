use crate::AnalysisPhase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub phase: AnalysisPhase,
    pub busy: bool,
    pub progress_percent: u8,
    pub log: Vec<String>,
    pub selected_files: Vec<String>,
    pub multispectral: bool,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    /// Bumped each time a run starts; the log belongs to the current run.
    pub run: u64,
    pub history: Vec<HistoryRowView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub index: usize,
    pub file_name: String,
    pub is_multispectral: bool,
    pub headline: String,
}
