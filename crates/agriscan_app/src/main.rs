use std::io;
use std::sync::Arc;

use agriscan_core::AppState;
use agriscan_engine::{
    ensure_data_dir, ClientSettings, EngineHandle, FileStore, KeyValueStore, ResumptionGuard,
    AUTH_TOKEN_KEY,
};
use agriscan_logging::{level_for, scan_info};
use anyhow::Context;
use clap::Parser;

mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod render;

use app::App;
use cli::{Cli, Commands};
use effects::EffectRunner;
use render::Renderer;

fn main() {
    if let Err(error) = run() {
        eprintln!("agriscan error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref())?;
    ensure_data_dir(&data_dir)
        .with_context(|| format!("cannot use data directory {}", data_dir.display()))?;
    logging::initialize(
        logging::LogDestination::for_verbosity(cli.verbose),
        level_for(cli.quiet, cli.verbose),
        &data_dir,
    );

    let settings = config::load_settings(cli.config.as_deref(), &data_dir, cli.api_url.as_deref())?;
    let store: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::open(&data_dir).context("failed to open the client store")?);
    let guard = ResumptionGuard::new(store.clone());

    match cli.command {
        Commands::Login { token } => {
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("token must not be empty");
            }
            store.set(AUTH_TOKEN_KEY, token).context("failed to store token")?;
            scan_info!("Stored bearer token");
            println!("Signed in.");
            Ok(())
        }
        Commands::Logout => {
            store.remove(AUTH_TOKEN_KEY).context("failed to remove token")?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Status => {
            let signed_in = store
                .get(AUTH_TOKEN_KEY)
                .context("failed to read token")?
                .is_some_and(|token| !token.trim().is_empty());
            println!("backend:     {}", settings.base_url);
            println!("data dir:    {}", data_dir.display());
            println!("signed in:   {}", if signed_in { "yes" } else { "no" });
            match guard.pending().context("failed to read the pending job")? {
                Some(job_id) => println!("pending job: {job_id}"),
                None => println!("pending job: none"),
            }
            Ok(())
        }
        Commands::Cancel => {
            match guard.pending().context("failed to read the pending job")? {
                Some(job_id) => {
                    guard.clear().context("failed to clear the pending job")?;
                    println!("Stopped tracking job {job_id}.");
                }
                None => println!("No pending analysis."),
            }
            Ok(())
        }
        Commands::Resume { json } => {
            let mut app = build_app(settings, store, guard, cli.quiet)?.with_json(json);
            if !app.resume_pending()? {
                println!("No pending analysis.");
            }
            Ok(())
        }
        Commands::Analyze {
            files,
            multispectral,
            top_k,
            json,
        } => {
            let mut settings = settings;
            if let Some(k) = top_k {
                settings.top_k = k;
            }
            let mut app = build_app(settings, store, guard, cli.quiet)?.with_json(json);
            // A job left over from a previous run is finished first.
            if let Err(err) = app.resume_pending() {
                eprintln!("agriscan: previous analysis: {err:#}");
            }
            app.analyze(&files, multispectral)
        }
    }
}

fn build_app(
    settings: ClientSettings,
    store: Arc<dyn KeyValueStore>,
    guard: ResumptionGuard,
    quiet: bool,
) -> anyhow::Result<App<io::Stdout>> {
    let state = AppState::with_limits(settings.max_file_bytes, settings.top_k);
    let engine = EngineHandle::new(settings, store).context("failed to start the engine")?;
    let runner = EffectRunner::new(engine, guard);
    runner.watch_interrupts();
    Ok(App::new(state, runner, Renderer::new(quiet), io::stdout()))
}
