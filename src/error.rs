// src/error.rs

use plotters::drawing::DrawingAreaErrorKind;
use reqwest::StatusCode;
use thiserror::Error;

/// Failures while talking to the EIA API or the boundary source.
///
/// `endpoint` is always the request URL with its query string stripped, so the
/// API key never ends up in a log line or an error chain.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("malformed payload from {endpoint}: {source}")]
    Payload {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} reported an error: {message}")]
    Api { endpoint: String, message: String },

    #[error("invalid geometry for region `{region}`: {reason}")]
    Geometry { region: String, reason: String },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

/// Integrity violations found while pivoting flat records.
#[derive(Debug, Error, PartialEq)]
pub enum ReshapeError {
    #[error("{count} records match pivot cell ({row}, {column}); expected at most one")]
    DuplicateKey {
        row: String,
        column: String,
        count: usize,
    },

    #[error("record for {period}/{fuel} has no {field}")]
    MissingField {
        field: &'static str,
        period: i32,
        fuel: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("no column named `{0}`")]
    UnknownColumn(String),

    #[error("nothing to draw: {0}")]
    Empty(String),

    #[error("drawing backend failed: {0}")]
    Backend(String),
}

impl<E> From<DrawingAreaErrorKind<E>> for RenderError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("start year {start} is after end year {end}")]
    InvalidYears { start: i32, end: i32 },

    #[error("invalid url `{value}`: {source}")]
    Url {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Umbrella error for a whole pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reshape(#[from] ReshapeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
