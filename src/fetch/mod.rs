// src/fetch/mod.rs

pub mod boundaries;
pub mod query;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ApiKey;
use crate::error::FetchError;
use crate::schema::{BoundaryTable, FlatRecord};

pub use query::Query;

/// How much of an error body to keep in [`FetchError::Status`].
const BODY_SNIPPET: usize = 512;

/// Blocking client for the EIA v2 API. One call, one request: no retries.
pub struct EiaClient {
    http: Client,
    base_url: Url,
    api_key: ApiKey,
}

/// Decoded `response` object of an EIA v2 reply.
#[derive(Debug, Clone, PartialEq)]
pub struct EiaResponse {
    /// Row count reported by the API, if any.
    pub total: Option<usize>,
    pub records: Vec<FlatRecord>,
    pub warnings: Vec<String>,
}

#[derive(Deserialize)]
struct Envelope {
    response: Option<ResponseBody>,
    error: Option<serde_json::Value>,
    #[serde(default)]
    warnings: Vec<ApiWarning>,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    total: Option<serde_json::Value>,
    data: Vec<FlatRecord>,
}

#[derive(Deserialize)]
struct ApiWarning {
    #[serde(default)]
    warning: String,
    #[serde(default)]
    description: String,
}

impl EiaClient {
    pub fn new(base_url: Url, api_key: ApiKey) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(concat!("eiagen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint_of(&base_url),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Run one query and return its records.
    #[instrument(level = "info", skip(self, query))]
    pub fn fetch(&self, query: &Query) -> Result<Vec<FlatRecord>, FetchError> {
        let url = query.to_url(&self.base_url, &self.api_key)?;
        debug!(url = %query.redacted_url(&self.base_url)?, "requesting");

        let body = get_text(&self.http, &url)?;
        let response = decode_response(&body, &endpoint_of(&url))?;

        for w in &response.warnings {
            warn!(warning = %w, "EIA API warning");
        }
        if let Some(total) = response.total {
            if total > response.records.len() {
                warn!(
                    total,
                    returned = response.records.len(),
                    length = query.length(),
                    "response truncated; narrow the query"
                );
            }
        }
        info!(records = response.records.len(), "fetched");
        Ok(response.records)
    }

    /// Fetch and decode a GeoJSON boundary document.
    #[instrument(level = "info", skip(self, url), fields(url = %url))]
    pub fn fetch_boundaries(
        &self,
        url: &Url,
        name_property: &str,
    ) -> Result<BoundaryTable, FetchError> {
        let body = get_text(&self.http, url)?;
        let table = boundaries::parse_boundaries(&body, name_property, &endpoint_of(url))?;
        info!(regions = table.len(), "fetched boundaries");
        Ok(table)
    }
}

/// Scheme, host and path only; the query (and the key in it) is dropped.
pub(crate) fn endpoint_of(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.set_fragment(None);
    clean.to_string()
}

/// GET `url` and return the body of a 2xx response.
fn get_text(http: &Client, url: &Url) -> Result<String, FetchError> {
    let endpoint = endpoint_of(url);
    let resp = http
        .get(url.clone())
        .send()
        .map_err(|e| FetchError::Transport {
            endpoint: endpoint.clone(),
            source: e.without_url(),
        })?;

    let status = resp.status();
    let body = resp.text().map_err(|e| FetchError::Transport {
        endpoint: endpoint.clone(),
        source: e.without_url(),
    })?;

    if !status.is_success() {
        return Err(FetchError::Status {
            endpoint,
            status,
            body: snippet(&body),
        });
    }
    Ok(body)
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Decode an EIA v2 reply body.
///
/// An `error` field wins over everything else; a reply without
/// `response.data` is a payload error.
pub fn decode_response(body: &str, endpoint: &str) -> Result<EiaResponse, FetchError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|source| FetchError::Payload {
        endpoint: endpoint.to_string(),
        source,
    })?;

    if let Some(err) = envelope.error {
        let message = match err {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(FetchError::Api {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    let Some(response) = envelope.response else {
        return Err(FetchError::Payload {
            endpoint: endpoint.to_string(),
            source: serde::de::Error::missing_field("response"),
        });
    };

    let total = response.total.and_then(|t| match t {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as usize),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Ok(EiaResponse {
        total,
        records: response.data,
        warnings: envelope
            .warnings
            .into_iter()
            .map(|w| format!("{} {}", w.warning, w.description).trim().to_string())
            .collect(),
    })
}
