//! Geoflow engine - Entry Point
//!
//! Runs scheduled AI analysis workflows for the geospatial catalog and
//! exposes a local control API.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use geoflow::app::options::AppOptions;
use geoflow::app::run::run;
use geoflow::filesys::file::File;
use geoflow::logs::{init_logging, LogLevel, LogOptions};
use geoflow::models::workflow::Workflow;
use geoflow::storage::layout::StorageLayout;
use geoflow::storage::settings::Settings;
use geoflow::utils::{load_settings, run_diagnostic, version_info};

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    let settings_file = match cli_args.get("config") {
        Some(path) => File::new(path),
        None => layout.settings_file(),
    };

    // Run diagnostics
    if cli_args.contains_key("diagnostic") || cli_args.contains_key("diag") {
        if run_diagnostic(&layout, &settings_file).await {
            return ExitCode::SUCCESS;
        }
        return ExitCode::FAILURE;
    }

    // Write default settings and an empty seed file
    if cli_args.contains_key("init") {
        return match init_layout(&layout, &settings_file).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to initialize {}: {e:#}", layout.base_dir.display());
                ExitCode::FAILURE
            }
        };
    }

    // Retrieve the settings file
    let mut settings = match load_settings(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => settings.log_level = level,
            Err(e) => eprintln!("Ignoring --log-level: {e}"),
        }
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.log_json,
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the engine
    let options = AppOptions::from_settings(&settings, layout);
    info!("Running geoflow engine with options: {:?}", options);

    match run(version.version, options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run the engine: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn init_layout(layout: &StorageLayout, settings_file: &File) -> anyhow::Result<()> {
    layout.setup().await?;

    if !settings_file.exists().await {
        settings_file.write_json(&Settings::default()).await?;
        println!("Wrote {}", settings_file.path().display());
    }

    let workflows_file = layout.workflows_file();
    if !workflows_file.exists().await {
        workflows_file.write_json(&Vec::<Workflow>::new()).await?;
        println!("Wrote {}", workflows_file.path().display());
    }
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
