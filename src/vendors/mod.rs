use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::constants::defaults;
use crate::errors::{DataShapeError, UpstreamError};

pub mod solaredge;
pub mod solcast;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Shape(#[from] DataShapeError),
    #[error("request failed: {0}")]
    Transport(#[from] Box<ureq::Error>),
    #[error("could not read response body: {0}")]
    Body(#[from] std::io::Error),
    #[error("could not parse timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error(transparent)]
    Tls(#[from] native_tls::Error),
}

/// Explicit fetch window in the site's local wall-clock time, for partial
/// or backfill runs. Adapters fall back to their own trailing defaults
/// when no window is given.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

pub fn agent() -> Result<ureq::Agent, FetchError> {
    Ok(ureq::AgentBuilder::new()
        .tls_connector(Arc::new(native_tls::TlsConnector::new()?))
        .timeout(defaults::API_REQUEST_TIMEOUT)
        .build())
}

pub(crate) fn get_json<T: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T, FetchError> {
    let mut request = agent.get(url);
    for &(key, value) in params {
        request = request.query(key, value);
    }
    match request.call() {
        Ok(response) => Ok(response.into_json()?),
        Err(ureq::Error::Status(status, response)) => {
            let url = response.get_url().to_string();
            let body = response.into_string().unwrap_or_default();
            log::error!("Error querying {url}: {status}, {body}");
            Err(UpstreamError { url, status, body }.into())
        }
        Err(e) => Err(Box::new(e).into()),
    }
}
