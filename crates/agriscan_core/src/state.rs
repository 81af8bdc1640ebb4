use crate::upload::MAX_FILE_BYTES;
use crate::view_model::{AppViewModel, HistoryRowView};
use crate::{ChatHistoryEntry, JobId, SelectedFile};

const DEFAULT_TOP_K: u32 = 3;

/// Heuristic progress shown while polling. The backend reports no real progress.
pub fn progress_for_iteration(iteration: u32) -> f32 {
    (10.0 + iteration as f32 * 0.7).min(99.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Validation,
    Submission,
    Transport,
    Job,
    MalformedResult,
    Prediction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Submitting,
    Predicting,
    Polling {
        job_id: JobId,
        iteration: u32,
    },
    Completed,
    Failed {
        category: FailureCategory,
        message: String,
    },
    TimedOut,
    Cancelled,
}

impl AnalysisPhase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::Predicting | Self::Polling { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Predicting => "predicting",
            Self::Polling { .. } => "polling",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    phase: AnalysisPhase,
    selected: Vec<SelectedFile>,
    multispectral: bool,
    log: Vec<String>,
    progress: f32,
    last_error: Option<String>,
    notice: Option<String>,
    history: Vec<ChatHistoryEntry>,
    max_file_bytes: u64,
    top_k: u32,
    run: u64,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_limits(MAX_FILE_BYTES, DEFAULT_TOP_K)
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_file_bytes: u64, top_k: u32) -> Self {
        Self {
            phase: AnalysisPhase::Idle,
            selected: Vec::new(),
            multispectral: false,
            log: Vec::new(),
            progress: 0.0,
            last_error: None,
            notice: None,
            history: Vec::new(),
            max_file_bytes,
            top_k,
            run: 0,
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase.clone(),
            busy: self.phase.is_busy(),
            progress_percent: self.progress.round().clamp(0.0, 100.0) as u8,
            log: self.log.clone(),
            selected_files: self.selected.iter().map(|file| file.name.clone()).collect(),
            multispectral: self.multispectral,
            last_error: self.last_error.clone(),
            notice: self.notice.clone(),
            run: self.run,
            history: self
                .history
                .iter()
                .enumerate()
                .map(|(index, entry)| HistoryRowView {
                    index,
                    file_name: entry.file_name.clone(),
                    is_multispectral: entry.is_multispectral(),
                    headline: entry.headline(),
                })
                .collect(),
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> &AnalysisPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn history(&self) -> &[ChatHistoryEntry] {
        &self.history
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Returns whether anything changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn selected(&self) -> &[SelectedFile] {
        &self.selected
    }

    pub(crate) fn multispectral(&self) -> bool {
        self.multispectral
    }

    pub(crate) fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub(crate) fn top_k(&self) -> u32 {
        self.top_k
    }

    pub(crate) fn polling_job(&self) -> Option<&JobId> {
        match &self.phase {
            AnalysisPhase::Polling { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    pub(crate) fn set_selection(&mut self, files: Vec<SelectedFile>) {
        self.selected = files;
        self.last_error = None;
        self.mark_dirty();
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selected.clear();
        self.mark_dirty();
    }

    pub(crate) fn set_multispectral(&mut self, on: bool) {
        self.multispectral = on;
        self.mark_dirty();
    }

    /// Start a fresh run: new phase, empty log, no stale error or notice.
    pub(crate) fn begin(&mut self, phase: AnalysisPhase, progress: f32) {
        self.run += 1;
        self.phase = phase;
        self.log.clear();
        self.progress = progress;
        self.last_error = None;
        self.notice = None;
        self.mark_dirty();
    }

    pub(crate) fn enter(&mut self, phase: AnalysisPhase) {
        self.phase = phase;
        self.mark_dirty();
    }

    pub(crate) fn set_poll_iteration(&mut self, iteration: u32) {
        if let AnalysisPhase::Polling {
            iteration: current, ..
        } = &mut self.phase
        {
            *current = iteration;
        }
        self.bump_progress(progress_for_iteration(iteration));
    }

    /// Progress never moves backwards.
    pub(crate) fn bump_progress(&mut self, progress: f32) {
        if progress > self.progress {
            self.progress = progress.min(100.0);
            self.mark_dirty();
        }
    }

    pub(crate) fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, category: FailureCategory, message: impl Into<String>) {
        let message = message.into();
        self.last_error = Some(message.clone());
        self.phase = AnalysisPhase::Failed { category, message };
        self.mark_dirty();
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.mark_dirty();
    }

    pub(crate) fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.mark_dirty();
    }

    /// Append-only: entries are never edited or removed once recorded.
    pub(crate) fn record(&mut self, entry: ChatHistoryEntry) {
        self.history.push(entry);
        self.mark_dirty();
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
