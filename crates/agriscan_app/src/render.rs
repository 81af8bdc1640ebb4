//! Terminal rendering of the view-model and of finished history entries.

use std::io::{self, Write};

use agriscan_core::{
    crop_suitability_info, treatment_info, AnalysisResult, AppViewModel, ChatHistoryEntry,
    DetectionResult, EntryResult, FullAnalysis, LimitedAnalysis,
};
use chrono::Local;

/// Prints only what changed since the previous render.
pub struct Renderer {
    run: Option<u64>,
    printed_log: usize,
    last_progress: Option<u8>,
    last_error: Option<String>,
    last_notice: Option<String>,
    quiet: bool,
    clock: Box<dyn Fn() -> String>,
}

impl Renderer {
    pub fn new(quiet: bool) -> Self {
        Self::with_clock(quiet, Box::new(|| Local::now().format("%H:%M:%S").to_string()))
    }

    pub fn with_clock(quiet: bool, clock: Box<dyn Fn() -> String>) -> Self {
        Self {
            run: None,
            printed_log: 0,
            last_progress: None,
            last_error: None,
            last_notice: None,
            quiet,
            clock,
        }
    }

    pub fn render(&mut self, view: &AppViewModel, out: &mut impl Write) -> io::Result<()> {
        if self.run != Some(view.run) {
            self.run = Some(view.run);
            self.printed_log = 0;
            self.last_progress = None;
        }

        if !self.quiet {
            for line in &view.log[self.printed_log..] {
                writeln!(out, "[{}] {}", (self.clock)(), line)?;
            }
            if view.busy && self.last_progress != Some(view.progress_percent) {
                writeln!(out, "    {} {:>3}%", progress_bar(view.progress_percent), view.progress_percent)?;
                self.last_progress = Some(view.progress_percent);
            }
        }
        self.printed_log = view.log.len();

        if view.last_error != self.last_error {
            if let Some(error) = &view.last_error {
                writeln!(out, "error: {error}")?;
            }
            self.last_error = view.last_error.clone();
        }
        if view.notice != self.last_notice {
            if let (Some(notice), false) = (&view.notice, self.quiet) {
                writeln!(out, "{notice}")?;
            }
            self.last_notice = view.notice.clone();
        }
        Ok(())
    }
}

fn progress_bar(percent: u8) -> String {
    const WIDTH: usize = 30;
    let filled = usize::from(percent.min(100)) * WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

pub fn describe_entry(entry: &ChatHistoryEntry) -> String {
    let mut text = format!("== {} ==\n", entry.file_name);
    match &entry.result {
        EntryResult::Multispectral(AnalysisResult::Full(full)) => describe_full(full, &mut text),
        EntryResult::Multispectral(AnalysisResult::Limited(limited)) => {
            describe_limited(limited, &mut text)
        }
        EntryResult::Detection(detection) => describe_detection(detection, &mut text),
    }
    text
}

fn describe_full(full: &FullAnalysis, text: &mut String) {
    text.push_str(&format!("Best crop: {}\n", full.best_crop));
    if !full.prediction.is_empty() {
        text.push_str(&format!("{}\n", full.prediction));
    }
    let summary = &full.summary;
    text.push_str(&format!(
        "Pixels: {} valid of {} | Bands: {}\n",
        summary.valid_pixels,
        summary.total_pixels,
        summary.bands_processed.join(", ")
    ));

    if !full.environmental_stats.is_empty() {
        text.push_str("\nEnvironmental statistics\n");
        text.push_str(&format!(
            "  {:<12} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "name", "min", "p25", "mean", "p75", "max"
        ));
        for stat in &full.environmental_stats {
            text.push_str(&format!(
                "  {:<12} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}\n",
                stat.name, stat.min, stat.percentile_25, stat.mean, stat.percentile_75, stat.max
            ));
        }
    }

    let ranking = crop_suitability_info(&full.crop_suitability_stats);
    text.push_str("\nCrop suitability\n");
    let mut scores: Vec<_> = ranking.scores.iter().collect();
    scores.sort_by(|a, b| b.1.total_cmp(a.1));
    for (crop, score) in scores {
        text.push_str(&format!("  {:<12} {:>5.1}%\n", crop, score * 100.0));
    }
    for line in &ranking.recommendations {
        text.push_str(&format!("  - {line}\n"));
    }

    if !full.suitability_images.is_empty() {
        let names: Vec<&str> = full.suitability_images.keys().map(String::as_str).collect();
        text.push_str(&format!("\nSuitability maps: {}\n", names.join(", ")));
    }
}

fn describe_limited(limited: &LimitedAnalysis, text: &mut String) {
    text.push_str(&format!("{}\n", limited.message));
    for (label, value) in [("Metadata", &limited.metadata), ("Raw metadata", &limited.raw_metadata)] {
        let is_empty = value.as_object().is_some_and(|map| map.is_empty());
        if is_empty {
            continue;
        }
        let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        text.push_str(&format!("\n{label}\n{pretty}\n"));
    }
}

fn describe_detection(detection: &DetectionResult, text: &mut String) {
    text.push_str(&format!(
        "Disease: {}\nConfidence: {:.1}%\nSeverity: {}\nCrop: {}\n",
        detection.disease, detection.confidence, detection.severity, detection.crop_type
    ));

    let info = treatment_info(&detection.disease, detection.recommendations.as_ref());
    text.push_str(&format!("\n{}\n", info.about));
    let sections = [
        ("Immediate actions", &info.immediate_actions),
        ("Treatment options", &info.treatment_options),
        ("Prevention", &info.prevention),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        text.push_str(&format!("\n{title}\n"));
        for item in items {
            text.push_str(&format!("  - {item}\n"));
        }
    }
    text.push_str(&format!("\nMonitoring: {}\n", info.monitoring));
    if !info.llm_generated {
        text.push_str("(general guidance; detailed recommendations unavailable)\n");
    }
}
