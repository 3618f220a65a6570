use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::error::AppError;

/// Response body of an answering endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// JSON view of the body; text bodies become a JSON string.
    pub fn as_json(&self) -> Value {
        match self {
            Payload::Json(v) => v.clone(),
            Payload::Text(t) => Value::String(t.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointHit {
    pub endpoint: String,
    pub payload: Payload,
}

/// Resolves `path` against `base_url` the way a browser resolves a link:
/// `/api` is root-relative even when the base URL carries a path.
pub fn resolve_url(base_url: &str, path: &str) -> Result<Url, AppError> {
    let base = Url::parse(base_url)
        .map_err(|e| AppError::Config(format!("invalid base_url {base_url:?}: {e}")))?;
    base.join(path)
        .map_err(|e| AppError::Config(format!("bad path {path:?}: {e}")))
}

/// GETs each endpoint in order; the first 2xx response wins.
///
/// Unreachable endpoints and error statuses fall through to the next
/// candidate. `None` means no endpoint answered successfully, or the winning
/// body could not be read at all.
pub async fn first_success(client: &Client, base_url: &str, endpoints: &[String]) -> Option<EndpointHit> {
    for endpoint in endpoints {
        let url = match resolve_url(base_url, endpoint) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Endpoint skipped");
                continue;
            }
        };
        let resp = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Endpoint unreachable");
                continue;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::info!(endpoint = %endpoint, status = %status, "Endpoint rejected");
            continue;
        }

        tracing::info!(endpoint = %endpoint, status = %status, "Endpoint responded");
        return match resp.text().await {
            Ok(body) => Some(EndpointHit {
                endpoint: endpoint.clone(),
                payload: decode_body(body),
            }),
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Body unreadable");
                None
            }
        };
    }

    tracing::warn!(tried = endpoints.len(), "No endpoint responded successfully");
    None
}

/// JSON when parseable, raw text otherwise.
pub fn decode_body(body: String) -> Payload {
    match serde_json::from_str(&body) {
        Ok(v) => Payload::Json(v),
        Err(_) => Payload::Text(body),
    }
}

/// Status and raw body of a single GET, following redirects as configured
/// on `client`.
pub async fn fetch_status(
    client: &Client,
    base_url: &str,
    path: &str,
) -> Result<(StatusCode, String), AppError> {
    let url = resolve_url(base_url, path)?;
    let resp = client.get(url.clone()).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    tracing::info!(url = %url, status = %status, bytes = body.len(), "Fetched");
    Ok((status, body))
}
