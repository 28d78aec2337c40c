//! Utility functions

use anyhow::{bail, Context};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::state::load_seed_workflows;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Version information for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Load settings, falling back to defaults when the file does not exist
pub async fn load_settings(file: &File) -> anyhow::Result<Settings> {
    if !file.exists().await {
        return Ok(Settings::default());
    }
    let settings = file
        .read_json::<Settings>()
        .await
        .with_context(|| format!("reading {}", file.path().display()))?;
    Ok(settings)
}

fn report(check: &str, result: anyhow::Result<String>) -> bool {
    match result {
        Ok(detail) => {
            println!("  {} {}: {}", "✓".green().bold(), check, detail);
            true
        }
        Err(e) => {
            println!("  {} {}: {:#}", "✗".red().bold(), check, e);
            false
        }
    }
}

async fn check_base_dir(layout: &StorageLayout) -> anyhow::Result<String> {
    let dir = Dir::new(&layout.base_dir);
    if !dir.exists().await {
        bail!("{} does not exist", dir.path().display());
    }
    Ok(dir.path().display().to_string())
}

async fn check_seed_workflows(layout: &StorageLayout) -> anyhow::Result<String> {
    let file = layout.workflows_file();
    let workflows = load_seed_workflows(&file)
        .await
        .with_context(|| format!("reading {}", file.path().display()))?;

    let empty = workflows.iter().filter(|w| w.steps.is_empty()).count();
    if empty > 0 {
        bail!("{} workflows have no steps and will always fail", empty);
    }
    Ok(format!("{} workflows", workflows.len()))
}

fn check_invoker_url(settings: &Settings) -> anyhow::Result<String> {
    let url = Url::parse(&settings.function_invoker.base_url)
        .with_context(|| format!("parsing '{}'", settings.function_invoker.base_url))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme '{}'", url.scheme());
    }
    Ok(url.to_string())
}

/// Run configuration checks and print a colored report.
/// Returns `true` when every check passed.
pub async fn run_diagnostic(layout: &StorageLayout, settings_file: &File) -> bool {
    let version = version_info();
    println!(
        "{} {} ({})",
        "geoflow".bold(),
        version.version,
        version.git_hash.dimmed()
    );

    let mut healthy = report("Storage directory", check_base_dir(layout).await);

    let settings = load_settings(settings_file).await;
    let settings = match settings {
        Ok(settings) => {
            healthy &= report(
                "Settings",
                Ok(format!(
                    "{} (policy {}, {} workers)",
                    settings_file.path().display(),
                    settings.scheduler.next_run_policy,
                    settings.scheduler.workers
                )),
            );
            settings
        }
        Err(e) => {
            report("Settings", Err(e));
            return false;
        }
    };

    healthy &= report("Seed workflows", check_seed_workflows(layout).await);
    healthy &= report("Function invoker", check_invoker_url(&settings));

    if healthy {
        println!("{}", "All checks passed".green());
    } else {
        println!("{}", "Some checks failed".red());
    }
    healthy
}
