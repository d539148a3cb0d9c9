use std::path::PathBuf;

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use thiserror::Error;

use crate::interfaces::ftp::FtpConnError;

/// Non-success HTTP response from a vendor API.
#[derive(Error, Debug)]
#[error("error querying {url}: {status}, {body}")]
pub struct UpstreamError {
    pub url: String,
    pub status: u16,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no sensor registered for data column '{0}'")]
    UnmappedSensor(String),
    #[error("could not read auth config from {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse auth config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// Sanity-check violation in vendor data. Indicates a silently changed
/// vendor contract rather than a transient condition.
#[derive(Error, Debug)]
pub enum DataShapeError {
    #[error("unexpected unit {actual:?} (expected {expected:?})")]
    UnexpectedUnit {
        expected: &'static str,
        actual: String,
    },
    #[error("expected a single data column, found {0}")]
    MultipleColumns(usize),
    #[error("unexpected timestamp second values: {0:?}")]
    TimestampGranularity(Vec<u32>),
    #[error("local time {0} is ambiguous or nonexistent in {1}")]
    UnrepresentableLocalTime(NaiveDateTime, Tz),
    #[error("unexpected response shape: {0}")]
    UnexpectedPayload(String),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Ftp(#[from] FtpConnError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("archive file error: {0}")]
    Archive(String),
}
