// # Gandi Registrar
//
// This crate provides the Gandi implementation of the zonesync `Registrar`
// trait, speaking XML-RPC to the Gandi domain API.
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (Registrar)
//
// **Allowed Capabilities**:
// - Perform XML-RPC calls against the configured endpoint only
// - Parse Gandi-specific responses
//
// **Forbidden Capabilities**:
// - Retry or back off (a failed call fails the transaction)
// - Roll back on its own (owned by ZoneTransaction)
// - Spawn tasks or cache zone data between calls
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Construction fails fast if the key is empty
//
// ## API Reference
//
// Every method takes the API key as its first parameter.
//
// | Operation          | XML-RPC method                 | Parameters               |
// |--------------------|--------------------------------|--------------------------|
// | zone.lookup        | `domain.info`                  | domain → `.zone_id`      |
// | record.list        | `domain.zone.record.list`      | zone, version 0 (active) |
// | version.create     | `domain.zone.version.new`      | zone                     |
// | version.setRecords | `domain.zone.record.set`       | zone, version, records   |
// | zone.info          | `domain.zone.info`             | zone → `.version`        |
// | version.activate   | `domain.zone.version.set`      | zone, version            |
// | version.delete     | `domain.zone.version.delete`   | zone, version            |

pub mod xmlrpc;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use zonesync_core::{Error, LiveRecord, Registrar, Result, SyncConfig, VersionId, ZoneId};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Version number Gandi uses for "the active version" in record.list
const ACTIVE_VERSION: u64 = 0;

/// Gandi XML-RPC registrar
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot: one HTTP request per trait call.
///
/// # Security
///
/// The Debug implementation does NOT expose the API key.
pub struct GandiRegistrar {
    /// Gandi API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// XML-RPC endpoint
    endpoint: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for GandiRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GandiRegistrar")
            .field("api_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GandiRegistrar {
    /// Create a new Gandi registrar
    ///
    /// # Parameters
    ///
    /// - `api_key`: Gandi API key
    /// - `endpoint`: XML-RPC endpoint URL
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the key is empty
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("Gandi API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Create a registrar from the loaded configuration
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(config.api_key.clone(), config.registrar_url.clone())
    }

    /// Call an XML-RPC method, prepending the API key to `params`
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(Value::String(self.api_key.clone()));
        all.extend(params);
        let body = xmlrpc::encode_call(method, &all);

        tracing::debug!("Calling {} on {}", method, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::http(format!(
                    "Authentication failed: Invalid API key or insufficient permissions. Status: {}",
                    status
                )),
                404 => Error::http(format!("XML-RPC endpoint not found: {}", self.endpoint)),
                429 => Error::http(format!(
                    "Rate limit exceeded. Please retry later. Status: {}",
                    status
                )),
                500..=599 => Error::http(format!(
                    "Gandi server error (transient): {} - {}",
                    status, error_text
                )),
                _ => Error::http(format!("{} failed: {} - {}", method, status, error_text)),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", method, e)))?;

        xmlrpc::decode_response(&text)
    }
}

fn field_u64(value: &Value, field: &str, method: &str) -> Result<u64> {
    value[field].as_u64().ok_or_else(|| {
        Error::Other(format!(
            "Invalid {} response: {} is not a positive integer",
            method, field
        ))
    })
}

fn expect_true(value: Value, method: &str) -> Result<()> {
    match value {
        Value::Bool(false) => Err(Error::Other(format!("{} returned false", method))),
        _ => Ok(()),
    }
}

#[async_trait]
impl Registrar for GandiRegistrar {
    async fn lookup_zone(&self, domain: &str) -> Result<ZoneId> {
        let info = self.call("domain.info", vec![json!(domain)]).await?;
        field_u64(&info, "zone_id", "domain.info").map(ZoneId)
    }

    async fn list_records(&self, zone: ZoneId) -> Result<Vec<LiveRecord>> {
        let records = self
            .call("domain.zone.record.list", vec![json!(zone.0), json!(ACTIVE_VERSION)])
            .await?;
        Ok(serde_json::from_value(records)?)
    }

    async fn create_version(&self, zone: ZoneId) -> Result<VersionId> {
        let version = self.call("domain.zone.version.new", vec![json!(zone.0)]).await?;
        version.as_u64().map(VersionId).ok_or_else(|| {
            Error::Other("Invalid domain.zone.version.new response: not a version number".into())
        })
    }

    async fn set_records(
        &self,
        zone: ZoneId,
        version: VersionId,
        records: &[LiveRecord],
    ) -> Result<()> {
        let records = serde_json::to_value(records)?;
        self.call(
            "domain.zone.record.set",
            vec![json!(zone.0), json!(version.0), records],
        )
        .await?;
        Ok(())
    }

    async fn active_version(&self, zone: ZoneId) -> Result<VersionId> {
        let info = self.call("domain.zone.info", vec![json!(zone.0)]).await?;
        field_u64(&info, "version", "domain.zone.info").map(VersionId)
    }

    async fn activate_version(&self, zone: ZoneId, version: VersionId) -> Result<()> {
        let done = self
            .call("domain.zone.version.set", vec![json!(zone.0), json!(version.0)])
            .await?;
        expect_true(done, "domain.zone.version.set")
    }

    async fn delete_version(&self, zone: ZoneId, version: VersionId) -> Result<()> {
        let done = self
            .call("domain.zone.version.delete", vec![json!(zone.0), json!(version.0)])
            .await?;
        expect_true(done, "domain.zone.version.delete")
    }

    fn registrar_name(&self) -> &'static str {
        "gandi"
    }
}
