// # HTTP Address Resolver
//
// This crate provides the HTTP echo-service implementation of the zonesync
// `AddressResolver` trait.
//
// ## Architecture
//
// One echo service per address family (by default api.ipify.org for IPv4
// and api6.ipify.org for IPv6). Each lookup is a single GET whose body is
// the caller's public address as plain text. Nothing is cached: the engine
// resolves each family once per run.

use zonesync_core::{AddressResolver, Error, IpSourceConfig, RecordType, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default HTTP timeout for echo-service requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Address resolver backed by plain-text echo services
#[derive(Debug)]
pub struct HttpAddressResolver {
    /// Echo service returning the IPv4 address
    ipv4_url: String,

    /// Echo service returning the IPv6 address
    ipv6_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a new HTTP address resolver
    ///
    /// # Parameters
    ///
    /// - `ipv4_url`: URL answering with the IPv4 address (for A records)
    /// - `ipv6_url`: URL answering with the IPv6 address (for AAAA records)
    pub fn new(ipv4_url: impl Into<String>, ipv6_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
            client,
        })
    }

    /// Create a resolver from the `ip_source` configuration section
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        Self::new(
            config.url_for(RecordType::A),
            config.url_for(RecordType::Aaaa),
        )
    }

    fn url_for(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::A => &self.ipv4_url,
            RecordType::Aaaa => &self.ipv6_url,
        }
    }
}

/// Parse an echo-service body and check it belongs to the record's family
fn parse_address(record_type: RecordType, body: &str) -> Result<String> {
    let text = body.trim();
    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::http(format!("Invalid IP address: {:?}", text)))?;

    match (record_type, ip) {
        (RecordType::A, IpAddr::V4(_)) | (RecordType::Aaaa, IpAddr::V6(_)) => Ok(ip.to_string()),
        (RecordType::A, _) => Err(Error::http(format!("Expected IPv4, got: {}", ip))),
        (RecordType::Aaaa, _) => Err(Error::http(format!("Expected IPv6, got: {}", ip))),
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self, record_type: RecordType) -> Result<String> {
        let url = self.url_for(record_type);
        tracing::debug!("Looking up public {} address from {}", record_type, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::http(format!(
                "{} answered with status {}",
                url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        parse_address(record_type, &body)
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
