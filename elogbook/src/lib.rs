//! elogbook library
//!
//! Storage engine for electronic logbooks: entries sharded over a tree of
//! XML files, two-way synchronization of logbook trees, and backups.

pub mod config;
pub mod error;
pub mod logbook;
pub mod model;
pub mod services;
pub mod storage;

pub use config::LogbookConfig;
pub use error::{LogbookError, Result};
pub use logbook::{synchronize_logbooks, Logbook, LogbookNode, SyncReport};
