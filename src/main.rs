mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use vibecraft_updater::{SelfUpdater, TransferProgress, UpdaterConfig};

fn main() {
    // Initialize logger with custom format
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    match rt.block_on(real_main()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

async fn real_main() -> Result<i32> {
    let args = cli::Args::parse();

    let cfg_path = match args.config {
        Some(path) => path,
        None => UpdaterConfig::default_path().context("Could not determine config directory")?,
    };
    let cfg = load_or_create_config(&cfg_path)?;
    let updater = SelfUpdater::new(cfg).context("Failed to initialise updater")?;

    match args.sub {
        cli::Cmd::Check => handle_check(&updater).await,
        cli::Cmd::Info => handle_info(&updater).await,
        cli::Cmd::Download { url } => {
            let path = download_with_bar(&updater, &url).await?;
            println!("{}", path.display());
            Ok(0)
        }
        cli::Cmd::Install { artifact, relaunch } => {
            handle_install(&updater, &artifact, relaunch).await
        }
        cli::Cmd::Update { relaunch } => handle_update(&updater, relaunch).await,
        cli::Cmd::Encoder { action } => handle_encoder(&updater, action).await,
        cli::Cmd::Reconcile => {
            let report = updater.reconcile().await.context("Reconcile failed")?;
            println!("restored backup: {}", report.restored_backup);
            for path in &report.removed {
                println!("removed {}", path.display());
            }
            Ok(0)
        }
        cli::Cmd::Changelog { action } => handle_changelog(&updater, action),
    }
}

/// Read the config, writing the defaults first if the file does not exist
fn load_or_create_config(cfg_path: &Path) -> Result<UpdaterConfig> {
    if !cfg_path.exists() {
        info!(
            "Config not found at {}, creating default configuration",
            cfg_path.display()
        );

        if let Some(parent) = cfg_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_toml = toml::to_string_pretty(&UpdaterConfig::default())
            .context("Failed to serialize default config")?;
        fs::write(cfg_path, default_toml).context("Failed to write config file")?;

        info!("Created default configuration at {}", cfg_path.display());
    }

    let cfg_str = fs::read_to_string(cfg_path).context("Failed to read config file")?;
    let cfg: UpdaterConfig = toml::from_str(&cfg_str).context("Failed to parse config")?;
    cfg.validate().context("Invalid config")?;

    info!("Using config from: {}", cfg_path.display());
    Ok(cfg)
}

async fn handle_check(updater: &SelfUpdater) -> Result<i32> {
    let availability = updater
        .check_for_update()
        .await
        .context("Update check failed")?;
    if availability.available {
        println!(
            "Update available: {} -> {}",
            availability.current_version, availability.latest_version
        );
        if let Some(url) = &availability.download_url {
            println!("{url}");
        }
    } else {
        println!("Up to date ({})", availability.current_version);
    }
    Ok(0)
}

async fn handle_info(updater: &SelfUpdater) -> Result<i32> {
    let info = updater
        .latest_release_info()
        .await
        .context("Could not fetch release info")?;
    let json = serde_json::to_string_pretty(&info).context("Failed to render release info")?;
    println!("{json}");
    Ok(0)
}

async fn handle_install(updater: &SelfUpdater, artifact: &Path, relaunch: bool) -> Result<i32> {
    if !relaunch {
        let report = updater
            .install_update(artifact)
            .await
            .context("Install failed")?;
        println!("Installed {} ({})", report.exe.display(), report.strategy);
        return Ok(0);
    }

    let handle = updater
        .install_update_and_relaunch(artifact)
        .await
        .context("Install failed")?;
    // Only returns if the new instance could not be started
    let outcome = handle
        .wait()
        .await
        .context("Relaunch failed, please restart manually")?;
    info!("Relaunch finished: {outcome:?}");
    Ok(0)
}

async fn handle_update(updater: &SelfUpdater, relaunch: bool) -> Result<i32> {
    let availability = updater
        .check_for_update()
        .await
        .context("Update check failed")?;
    let url = match availability.download_url {
        Some(url) if availability.available => url,
        _ => {
            println!("Up to date ({})", availability.current_version);
            return Ok(0);
        }
    };

    println!(
        "Updating {} -> {}",
        availability.current_version, availability.latest_version
    );
    let artifact = download_with_bar(updater, &url).await?;
    handle_install(updater, &artifact, relaunch).await
}

async fn handle_encoder(updater: &SelfUpdater, action: cli::EncoderCmd) -> Result<i32> {
    match action {
        cli::EncoderCmd::Status => {
            let installed = updater.is_encoder_installed();
            println!(
                "{} ({})",
                if installed { "installed" } else { "missing" },
                updater.encoder().binary_path().display()
            );
            Ok(if installed { 0 } else { 1 })
        }
        cli::EncoderCmd::Install => {
            if updater.is_encoder_installed() {
                println!(
                    "Encoder already installed at {}",
                    updater.encoder().binary_path().display()
                );
                return Ok(0);
            }
            let bar = byte_bar()?;
            let path = updater
                .provision_encoder(&mut |p: TransferProgress| update_bar(&bar, p))
                .await
                .context("Encoder install failed")?;
            bar.finish_and_clear();
            println!("Encoder installed at {}", path.display());
            Ok(0)
        }
        cli::EncoderCmd::Convert { input, output } => {
            updater
                .encoder()
                .convert_webm_to_mp4(&input, &output)
                .await
                .context("Conversion failed")?;
            println!("{}", output.display());
            Ok(0)
        }
    }
}

fn handle_changelog(updater: &SelfUpdater, action: cli::ChangelogCmd) -> Result<i32> {
    match action {
        cli::ChangelogCmd::Status => {
            let decision = updater.changelog_decision();
            if let Some(err) = &decision.error {
                eprintln!("warning: {err}");
            }
            println!(
                "show changelog for {}: {}",
                decision.version, decision.should_show
            );
            Ok(0)
        }
        cli::ChangelogCmd::MarkSeen => {
            updater
                .mark_changelog_seen()
                .context("Failed to write version marker")?;
            Ok(0)
        }
    }
}

async fn download_with_bar(updater: &SelfUpdater, url: &str) -> Result<PathBuf> {
    let bar = byte_bar()?;
    let path = updater
        .download_update(url, &mut |p: TransferProgress| update_bar(&bar, p))
        .await
        .with_context(|| format!("Download of {url} failed"))?;
    bar.finish_and_clear();
    Ok(path)
}

fn byte_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:50.green/blue}] {bytes}/{total_bytes}  {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"),
    );
    Ok(bar)
}

fn update_bar(bar: &ProgressBar, progress: TransferProgress) {
    if let Some(total) = progress.total {
        bar.set_length(total);
    }
    bar.set_position(progress.downloaded);
    bar.set_message(format!("{}%", progress.percent()));
}
