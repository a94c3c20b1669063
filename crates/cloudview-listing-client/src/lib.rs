//! Typed fetch wrapper over the four read-only listing endpoints.
//!
//! Each endpoint answers `200` with `{"body": "<JSON-encoded string>"}`;
//! the inner string decodes to a region-to-records mapping. Both parse
//! steps must succeed, and either failing is a decode error, kept distinct
//! from HTTP rejection so callers can tell "reachable but malformed" from
//! "unreachable/rejected".

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use cloudview_client_core::listing::{ListingError, RegionListing};
use cloudview_client_core::resources::{RegionMap, ResourceKind};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 2;
pub const ENV_LISTING_BASE_URL: &str = "CLOUDVIEW_LISTING_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingConfigError {
    #[error("listing_base_url_missing")]
    BaseUrlMissing,
    #[error("listing_base_url_invalid")]
    InvalidBaseUrl,
}

#[derive(Debug, Clone)]
pub struct ListingClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl ListingClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

/// Resolves the listing base URL from an explicit value or the
/// environment, in that order.
pub fn resolve_listing_base_url(explicit: Option<&str>) -> Result<String, ListingConfigError> {
    if let Some(base_url) = explicit {
        return normalize_base_url(base_url);
    }
    if let Some(base_url) = std::env::var(ENV_LISTING_BASE_URL)
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        return normalize_base_url(&base_url);
    }
    Err(ListingConfigError::BaseUrlMissing)
}

fn normalize_base_url(raw: &str) -> Result<String, ListingConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ListingConfigError::BaseUrlMissing);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ListingConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ListingConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ListingConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct ListingClient {
    base_url: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

impl ListingClient {
    pub fn new(config: ListingClientConfig) -> Result<Self, ListingConfigError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            request_attempts: config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        let trimmed = path.trim();
        if trimmed.starts_with('/') {
            format!("{}{}", self.base_url, trimmed)
        } else {
            format!("{}/{}", self.base_url, trimmed)
        }
    }

    /// Fetches and double-decodes one resource kind's listing.
    pub async fn list<T>(&self, kind: ResourceKind) -> Result<RegionMap<T>, ListingError>
    where
        T: DeserializeOwned,
    {
        let response = self.send_get(kind.list_path()).await?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ListingError::Read {
                message: error.to_string(),
            })?;

        if !status.is_success() {
            return Err(format_http_error(status.as_u16(), &bytes));
        }

        decode_envelope(&bytes)
    }

    async fn send_get(&self, path: &str) -> Result<reqwest::Response, ListingError> {
        let url = self.endpoint(path);
        let mut last_error: Option<String> = None;

        for attempt in 0..self.request_attempts {
            let request = self
                .http
                .get(url.as_str())
                .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
                .timeout(self.timeout);

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.request_attempts {
                        break;
                    }
                }
            }
        }

        Err(ListingError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// Unwraps the listing envelope: outer JSON object with a string `body`
/// field, whose contents parse again into the region map.
pub fn decode_envelope<T>(bytes: &[u8]) -> Result<RegionMap<T>, ListingError>
where
    T: DeserializeOwned,
{
    #[derive(Debug, Deserialize)]
    struct ListingEnvelope {
        body: String,
    }

    let envelope =
        serde_json::from_slice::<ListingEnvelope>(bytes).map_err(|error| ListingError::Decode {
            message: error.to_string(),
        })?;
    decode_region_payload(&envelope.body)
}

/// Second decode step. Region entries must be arrays of records; the
/// backend occasionally smuggles diagnostics objects (`DebugErrors`) into
/// the mapping, and those are dropped rather than failing the snapshot.
pub fn decode_region_payload<T>(raw: &str) -> Result<RegionMap<T>, ListingError>
where
    T: DeserializeOwned,
{
    let entries = serde_json::from_str::<BTreeMap<String, serde_json::Value>>(raw).map_err(
        |error| ListingError::Decode {
            message: error.to_string(),
        },
    )?;

    let mut map = RegionMap::new();
    for (region, value) in entries {
        if !value.is_array() {
            tracing::debug!(%region, "dropping non-list entry from listing payload");
            continue;
        }
        let records =
            serde_json::from_value::<Vec<T>>(value).map_err(|error| ListingError::Decode {
                message: error.to_string(),
            })?;
        map.insert(region, records);
    }
    Ok(map)
}

pub fn format_http_error(status: u16, body: &[u8]) -> ListingError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    let body = if body.is_empty() {
        "<empty>".to_string()
    } else {
        body
    };
    ListingError::Http { status, body }
}

/// Binds a client to one resource kind and record type, satisfying the
/// cache's transport seam.
#[derive(Debug, Clone)]
pub struct ListingEndpoint<T> {
    client: ListingClient,
    kind: ResourceKind,
    _record: PhantomData<fn() -> T>,
}

impl<T> ListingEndpoint<T> {
    #[must_use]
    pub fn new(client: ListingClient, kind: ResourceKind) -> Self {
        Self {
            client,
            kind,
            _record: PhantomData,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

#[async_trait(?Send)]
impl<T: DeserializeOwned> RegionListing<T> for ListingEndpoint<T> {
    async fn list_by_region(&self) -> Result<RegionMap<T>, ListingError> {
        self.client.list(self.kind).await
    }
}

/// One boxed endpoint per resource kind, ready for the dashboard shell.
#[must_use]
pub fn listing_set(client: &ListingClient) -> cloudview_client_core::shell::ListingSet {
    cloudview_client_core::shell::ListingSet {
        instances: Box::new(ListingEndpoint::new(client.clone(), ResourceKind::Instances)),
        databases: Box::new(ListingEndpoint::new(client.clone(), ResourceKind::Databases)),
        clusters: Box::new(ListingEndpoint::new(client.clone(), ResourceKind::Clusters)),
        buckets: Box::new(ListingEndpoint::new(client.clone(), ResourceKind::Buckets)),
    }
}

#[cfg(test)]
mod tests {
    use cloudview_client_core::resources::ComputeInstance;

    use super::*;

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = ListingClient::new(ListingClientConfig::new(
            "https://listings.example.com/prod/",
        ))
        .expect("listing client");

        assert_eq!(
            client.endpoint("/list-instances"),
            "https://listings.example.com/prod/list-instances"
        );
        assert_eq!(
            client.endpoint("list-instances"),
            "https://listings.example.com/prod/list-instances"
        );
    }

    #[test]
    fn base_url_validation_matches_config_errors() {
        assert_eq!(
            ListingClient::new(ListingClientConfig::new("   ")).map(|_| ()),
            Err(ListingConfigError::BaseUrlMissing)
        );
        assert_eq!(
            ListingClient::new(ListingClientConfig::new("listings.example.com")).map(|_| ()),
            Err(ListingConfigError::InvalidBaseUrl)
        );
        assert_eq!(
            resolve_listing_base_url(Some("https://listings.example.com/")),
            Ok("https://listings.example.com".to_string())
        );
    }

    #[test]
    fn envelope_double_decode_unwraps_inner_payload() {
        let outer = br#"{"body": "{\"us-east-1\": []}"}"#;
        let map = decode_envelope::<ComputeInstance>(outer).expect("decode envelope");
        assert_eq!(map.len(), 1);
        assert!(map["us-east-1"].is_empty());
    }

    #[test]
    fn envelope_with_unparseable_inner_body_is_a_decode_error() {
        let outer = br#"{"body": "not json"}"#;
        let error = decode_envelope::<ComputeInstance>(outer).expect_err("inner decode fails");
        assert!(matches!(error, ListingError::Decode { .. }));
    }

    #[test]
    fn envelope_without_string_body_is_a_decode_error() {
        let missing = br#"{"payload": "{}"}"#;
        assert!(matches!(
            decode_envelope::<ComputeInstance>(missing),
            Err(ListingError::Decode { .. })
        ));

        let non_string = br#"{"body": {"us-east-1": []}}"#;
        assert!(matches!(
            decode_envelope::<ComputeInstance>(non_string),
            Err(ListingError::Decode { .. })
        ));
    }

    #[test]
    fn diagnostics_entries_are_dropped_from_the_region_map() {
        let payload = r#"{
            "us-east-1": [{"InstanceId": "i-1", "Type": "t3.micro", "State": "running"}],
            "DebugErrors": {"ap-east-1": "ClientError: OptInRequired"}
        }"#;
        let map = decode_region_payload::<ComputeInstance>(payload).expect("decode payload");
        assert_eq!(map.len(), 1);
        assert_eq!(map["us-east-1"][0].instance_id, "i-1");
        assert!(!map.contains_key("DebugErrors"));
    }

    #[test]
    fn malformed_records_fail_the_snapshot() {
        let payload = r#"{"us-east-1": [{"Type": 42}]}"#;
        assert!(matches!(
            decode_region_payload::<ComputeInstance>(payload),
            Err(ListingError::Decode { .. })
        ));
    }

    #[test]
    fn http_error_mapping_preserves_status_and_body() {
        let error = format_http_error(502, b" gateway failed ");
        assert_eq!(error.to_string(), "listing_http_502:gateway failed");

        let empty = format_http_error(503, b"  ");
        assert_eq!(empty.to_string(), "listing_http_503:<empty>");
    }
}
