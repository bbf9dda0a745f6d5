use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    /// Directory holding settings.json; defaults are used when omitted
    #[arg(long, short = 's', global = true)]
    pub settings: Option<PathBuf>,

    /// Rewrite logbooks even if some of their files could not be read
    #[arg(long, short = 'f', global = true)]
    pub force: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Copy a logbook and all its child files to a new location
    Copy {
        /// Logbook to read
        source: PathBuf,
        /// Root file of the copy
        destination: PathBuf,
    },
    /// Merge two logbooks so that both hold the newest copy of every entry
    Synchronize {
        /// Local logbook
        local: PathBuf,
        /// Remote logbook
        remote: PathBuf,
    },
    /// Rewrite a logbook with uncompressed entry text
    Uncompress {
        /// Logbook to rewrite
        file: PathBuf,
    },
    /// Repack the entries of a logbook into as few files as possible
    Reorganize {
        /// Logbook to rewrite
        file: PathBuf,
    },
    /// Write a backup snapshot of a logbook
    Backup {
        /// Logbook to back up
        file: PathBuf,

        /// Only back up when the backup interval has elapsed
        #[arg(long, short = 'a')]
        if_needed: bool,
    },
}
