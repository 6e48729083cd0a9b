mod cli;
mod config;
mod error;
mod hub;
mod model;
mod report;

use anyhow::Context;
use clap::Parser;
use cli::{Action, Cli, USAGE_EXAMPLES};
use config::Config;
use error::Error;
use hub::{HfHubClient, HubClient};
use model::{Catalog, LinePrompter, ModelDownloader};
use std::process::ExitCode;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn print_header() {
    let rule = "=".repeat(60);
    println!("\n{rule}\n  gguf-fetch Model Download\n{rule}\n");
}

/// Creates the models directory, then hands out a downloader bound to it.
fn start_downloads<'a>(
    config: &mut Config,
    catalog: &'a Catalog,
    hub: &'a dyn HubClient,
) -> error::Result<ModelDownloader<'a>> {
    config.prepare_models_dir()?;
    Ok(ModelDownloader::new(
        config,
        catalog,
        hub,
        Box::new(LinePrompter::stdin()),
    ))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    print_header();

    let mut config = Config::from_cli(&cli)?;
    let hub = HfHubClient::new(config.cache_dir.clone(), config.progress)?;
    let catalog = Catalog::load(config.catalog_path.as_deref()).context("Failed to load catalog")?;

    tracing::debug!(
        models = catalog.models().len(),
        presets = catalog.presets().len(),
        policy = ?config.policy,
        "Catalog ready"
    );

    let tally = match cli.action() {
        Action::ListModels => {
            print!("{}", report::ModelsTable(&catalog));
            return Ok(ExitCode::SUCCESS);
        }
        Action::ListPresets => {
            println!("{}", report::PresetsTable(&catalog));
            return Ok(ExitCode::SUCCESS);
        }
        Action::Browse(repo_id) => {
            let files = match hub.list_files(&repo_id, config.token.as_deref()) {
                Ok(files) => report::model_files(files),
                Err(e) => {
                    println!("⚠️  Warning: Could not list files in {}: {}", repo_id, e);
                    Vec::new()
                }
            };
            let listing = report::BrowseListing {
                repo_id: &repo_id,
                files: &files,
            };
            print!("{}", listing);
            return Ok(ExitCode::SUCCESS);
        }
        Action::NoModels => {
            println!("❌ No models specified\n\n{}", USAGE_EXAMPLES);
            return Ok(ExitCode::FAILURE);
        }
        Action::Preset(name) => {
            let mut downloader = start_downloads(&mut config, &catalog, &hub)?;
            match downloader.download_preset(&name) {
                Ok(tally) => tally,
                Err(Error::UnknownPreset(name)) => {
                    println!("❌ Unknown preset: {}", name);
                    println!("   Available presets: {}", catalog.preset_names().join(", "));
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Action::Models(keys) => start_downloads(&mut config, &catalog, &hub)?.download_many(&keys),
    };

    let summary = report::summarize(&config.models_dir)
        .with_context(|| format!("Could not scan {}", config.models_dir.display()))?;
    println!("{}", summary);
    println!("{}", tally);

    tracing::info!(succeeded = tally.succeeded, failed = tally.failed, "Done");

    Ok(tally.exit_code())
}
