//! Error types for the logbook engine
//!
//! All recoverable failures (file IO, malformed settings, unwritable targets)
//! use thiserror for structured error handling. Parse problems inside logbook
//! files are not errors at this level: they are collected per node as
//! [`XmlError`](crate::storage::XmlError) records while reading continues.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogbookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Logbook has no backing file")]
    NoFile,

    #[error("Logbook file is read-only: {0}")]
    ReadOnly(PathBuf),

    #[error("Logbook file was not read completely: {0}")]
    Incomplete(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, LogbookError>;
