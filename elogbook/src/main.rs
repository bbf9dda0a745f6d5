// elogbook - command line tools for electronic logbooks
// Entry point and command dispatch

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use elogbook::services::{load_for_rewrite, SettingsService};
use elogbook::{synchronize_logbooks, Logbook, LogbookConfig};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elogbook=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.settings {
        Some(directory) => SettingsService::new(directory)
            .load()
            .await
            .context("Failed to load settings")?,
        None => LogbookConfig::default(),
    };

    match cli.command {
        Command::Copy {
            source,
            destination,
        } => {
            let mut logbook = open(&source, &config, cli.force).await?;
            logbook.set_modified_recursive(true);
            logbook
                .write(Some(&destination))
                .with_context(|| format!("Failed to write {}", destination.display()))?;

            println!(
                "Copied {} entries from {} to {}",
                logbook.entries().len(),
                source.display(),
                destination.display()
            );
        }
        Command::Synchronize { local, remote } => {
            let mut local_logbook = open(&local, &config, cli.force).await?;
            let mut remote_logbook = open(&remote, &config, cli.force).await?;

            let report = synchronize_logbooks(&mut local_logbook, &mut remote_logbook);

            local_logbook
                .write(None)
                .with_context(|| format!("Failed to write {}", local.display()))?;
            remote_logbook
                .write(None)
                .with_context(|| format!("Failed to write {}", remote.display()))?;

            println!(
                "{}: {} entries received, {} replaced",
                local.display(),
                report.copied_to_local,
                report.replaced_in_local
            );
            println!(
                "{}: {} entries received, {} replaced",
                remote.display(),
                report.copied_to_remote,
                report.replaced_in_remote
            );
        }
        Command::Uncompress { file } => {
            let mut logbook = open(&file, &config, cli.force).await?;
            for node in logbook.nodes() {
                logbook.node_mut(node).set_use_compression(false);
            }
            logbook.set_modified_recursive(true);
            logbook
                .write(None)
                .with_context(|| format!("Failed to write {}", file.display()))?;

            println!("Uncompressed {} ({} files)", file.display(), logbook.nodes().len());
        }
        Command::Reorganize { file } => {
            let mut logbook = open(&file, &config, cli.force).await?;
            let before = logbook.nodes().len();
            logbook.reorganize();
            logbook
                .write(None)
                .with_context(|| format!("Failed to write {}", file.display()))?;

            println!(
                "Reorganized {}: {} files, previously {}",
                file.display(),
                logbook.nodes().len(),
                before
            );
        }
        Command::Backup { file, if_needed } => {
            let mut logbook = open(&file, &config, cli.force).await?;
            if if_needed && !logbook.needs_backup() {
                println!("{} does not need a backup yet", file.display());
                return Ok(());
            }

            let backup = logbook.save_backup().context("Failed to save backup")?;
            logbook
                .write(None)
                .with_context(|| format!("Failed to write {}", file.display()))?;

            println!("Backup written to {}", backup.display());
        }
    }

    Ok(())
}

async fn open(file: &Path, config: &LogbookConfig, force: bool) -> anyhow::Result<Logbook> {
    load_for_rewrite(file, config.clone(), force)
        .await
        .with_context(|| match force {
            true => format!("Failed to read {}", file.display()),
            false => format!(
                "Failed to read {} (use --force to rewrite what could be read)",
                file.display()
            ),
        })
}
