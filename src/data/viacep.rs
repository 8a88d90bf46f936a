//! ViaCEP API client
//!
//! This module provides the `Fetcher` capability used by the resolver on a
//! cache miss, and its production implementation over the ViaCEP web service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::{normalize, AddressRecord};

/// Base URL for the ViaCEP service
pub const VIACEP_BASE_URL: &str = "http://viacep.com.br";

/// Errors that can occur when fetching an address from the remote service
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Service returned HTTP {0}")]
    Status(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Service reports that the CEP does not exist
    #[error("CEP {0} not found")]
    NotFound(String),

    /// Response describes a different CEP than the one requested
    #[error("Requested CEP {requested} but service returned '{returned}'")]
    CodeMismatch { requested: String, returned: String },
}

/// Capability to look up an address for a normalized CEP
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the address for `code`, which must already be normalized
    async fn fetch_address(&self, code: &str) -> Result<AddressRecord, FetchError>;
}

/// Client for fetching addresses from the ViaCEP API
#[derive(Debug, Clone)]
pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

impl Default for ViaCepClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ViaCepClient {
    /// Create a new ViaCepClient with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: VIACEP_BASE_URL.to_string(),
        }
    }

    /// Create a new ViaCepClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: VIACEP_BASE_URL.to_string(),
        }
    }

    /// Create a ViaCepClient whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Point the client at a different service host (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the lookup URL for a normalized CEP
    pub fn url_for(&self, code: &str) -> String {
        format!("{}/ws/{}/json/", self.base_url, code)
    }
}

#[async_trait]
impl Fetcher for ViaCepClient {
    async fn fetch_address(&self, code: &str) -> Result<AddressRecord, FetchError> {
        let url = self.url_for(code);
        tracing::debug!(%url, "fetching address");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        parse_response(code, &text)
    }
}

/// Parse a ViaCEP JSON body into an AddressRecord for `code`
///
/// The record is keyed by the requested code; the `cep` field of the body
/// (formatted like `"01001-000"`) must normalize to the same value.
pub fn parse_response(code: &str, body: &str) -> Result<AddressRecord, FetchError> {
    let response: ViaCepResponse = serde_json::from_str(body)?;

    if response.is_error() {
        return Err(FetchError::NotFound(code.to_string()));
    }

    match normalize(&response.cep) {
        Ok(returned) if returned == code => {}
        _ => {
            return Err(FetchError::CodeMismatch {
                requested: code.to_string(),
                returned: response.cep,
            })
        }
    }

    Ok(AddressRecord {
        code: code.to_string(),
        street: response.logradouro,
        complement: response.complemento,
        neighborhood: response.bairro,
        city: response.localidade,
        state: response.uf,
        ibge: response.ibge,
        gia: response.gia,
        ddd: response.ddd,
        siafi: response.siafi,
    })
}

/// ViaCEP API response structure
#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    complemento: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    #[serde(default)]
    ibge: String,
    #[serde(default)]
    gia: String,
    #[serde(default)]
    ddd: String,
    #[serde(default)]
    siafi: String,
    /// Present when the CEP is unknown; older deployments send `true`, newer `"true"`
    #[serde(default)]
    erro: Option<serde_json::Value>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }
}
