use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use agriscan_core::{update, AnalysisPhase, AppState, ChatHistoryEntry, Msg, SelectedFile};
use agriscan_logging::scan_debug;
use anyhow::{bail, Context};

use crate::effects::EffectRunner;
use crate::render::{describe_entry, Renderer};

const TICK: Duration = Duration::from_millis(100);

/// Owns the state container and drives it: messages in, effects out, engine
/// events back in, until the state is no longer busy.
pub struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    out: W,
    json: bool,
}

impl<W: Write> App<W> {
    pub fn new(state: AppState, runner: EffectRunner, renderer: Renderer, out: W) -> Self {
        Self {
            state,
            runner,
            renderer,
            out,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let mut inbox = vec![msg];
        while let Some(msg) = inbox.pop() {
            let state = std::mem::take(&mut self.state);
            let (mut state, effects) = update(state, msg);
            if state.consume_dirty() {
                self.renderer
                    .render(&state.view(), &mut self.out)
                    .context("failed to write to terminal")?;
            }
            self.state = state;
            let mut follow_up = self.runner.run(effects);
            follow_up.reverse();
            inbox.extend(follow_up);
        }
        Ok(())
    }

    /// Blocks until the current run reaches a terminal phase.
    pub fn wait_until_idle(&mut self) -> anyhow::Result<()> {
        while self.state.is_busy() {
            if let Some(msg) = self.runner.next_message(TICK) {
                self.dispatch(msg)?;
            }
        }
        Ok(())
    }

    /// Offers the job a previous session left behind; returns whether one was resumed.
    pub fn resume_pending(&mut self) -> anyhow::Result<bool> {
        let pending_job = self
            .runner
            .guard()
            .pending()
            .context("failed to read the pending job")?;
        let resumed = pending_job.is_some();
        self.dispatch(Msg::Started { pending_job })?;
        if resumed {
            let before = self.state.history().len();
            self.wait_until_idle()?;
            self.report(before)?;
        }
        Ok(resumed)
    }

    pub fn analyze(&mut self, paths: &[PathBuf], multispectral: bool) -> anyhow::Result<()> {
        let files = paths
            .iter()
            .map(|path| {
                let meta = fs::metadata(path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                if !meta.is_file() {
                    bail!("{} is not a file", path.display());
                }
                Ok(SelectedFile::new(path.clone(), meta.len()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        self.dispatch(Msg::MultispectralModeSet(multispectral))?;
        self.dispatch(Msg::FilesSelected(files))?;
        let view = self.state.view();
        if view.selected_files.is_empty() {
            let message = view
                .last_error
                .unwrap_or_else(|| "No files selected.".to_string());
            bail!(message);
        }

        let before = self.state.history().len();
        self.dispatch(Msg::SubmitClicked)?;
        self.wait_until_idle()?;
        self.report(before)
    }

    /// Prints entries recorded since `before`; a failed run becomes an error.
    fn report(&mut self, before: usize) -> anyhow::Result<()> {
        let entries: Vec<ChatHistoryEntry> = self.state.history()[before..].to_vec();
        for entry in &entries {
            if self.json {
                let json = serde_json::to_string_pretty(entry).context("failed to encode result")?;
                writeln!(self.out, "{json}")?;
            } else {
                writeln!(self.out)?;
                write!(self.out, "{}", describe_entry(entry))?;
            }
        }
        self.out.flush()?;

        scan_debug!("Run ended in phase {}", self.state.phase().label());
        match self.state.phase() {
            AnalysisPhase::Failed { message, .. } => bail!("{message}"),
            AnalysisPhase::TimedOut => bail!("analysis timed out"),
            AnalysisPhase::Cancelled => bail!("analysis cancelled"),
            _ => Ok(()),
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
