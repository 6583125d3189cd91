//! External vehicle data sources
//!
//! The aggregator sees providers only through [`VehicleDataSources`]: four
//! opaque async fetch functions that return a parsed payload, `None` when
//! the provider has nothing for the registration, or a [`SourceError`].
//!
//! [`HttpSources`] wires the trait to the real HTTP clients:
//! - DVLA Vehicle Enquiry Service (free)
//! - DVSA MOT History API (free, OAuth2 client credentials)
//! - VDG multi-package vehicle data (paid)
//! - SWS specialist technical data (paid)

pub mod dvla;
pub mod dvsa;
pub mod sws;
pub mod vdg;

pub use dvla::DvlaClient;
pub use dvsa::{DvsaClient, DvsaCredentials};
pub use sws::SwsClient;
pub use vdg::VdgClient;

use async_trait::async_trait;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use crate::models::{BasicData, ServiceData, TechnicalData};

const USER_AGENT: &str = concat!("garage-vd/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Provider client errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// The four provider fetch functions the aggregator depends on
#[async_trait]
pub trait VehicleDataSources: Send + Sync {
    /// Free government vehicle enquiry
    async fn dvla_lookup(&self, registration: &str) -> Result<Option<BasicData>, SourceError>;

    /// Free MOT history, in the provider's own JSON format
    async fn mot_history(&self, registration: &str) -> Result<Option<Value>, SourceError>;

    /// Paid multi-package lookup; `packages` are requested in one call
    async fn vdg_lookup(
        &self,
        registration: &str,
        packages: &[&str],
    ) -> Result<Option<TechnicalData>, SourceError>;

    /// Specialist technical data (engine/radio codes, service schedule)
    async fn sws_lookup(&self, registration: &str) -> Result<Option<ServiceData>, SourceError>;
}

/// Direct (un-keyed) rate limiter shared by a client's requests
pub(crate) type Limiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub(crate) fn rate_limiter(per_second: u32) -> Limiter {
    let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    governor::RateLimiter::direct(governor::Quota::per_second(per_second))
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| SourceError::Network(e.to_string()))
}

/// Map a non-success response to a [`SourceError`]
pub(crate) async fn error_for_status(response: reqwest::Response) -> SourceError {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return SourceError::Unauthorized;
    }
    let body = response.text().await.unwrap_or_default();
    SourceError::Api(status.as_u16(), body)
}

/// Read a JSON scalar as a trimmed, non-empty string
pub(crate) fn json_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a JSON number, accepting numeric strings
pub(crate) fn json_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sources backed by the real provider HTTP APIs
///
/// A provider without credentials is left out; calls to it fail with
/// [`SourceError::NotConfigured`] and the aggregator falls through to the
/// next provider in the chain.
#[derive(Default)]
pub struct HttpSources {
    pub dvla: Option<DvlaClient>,
    pub dvsa: Option<DvsaClient>,
    pub vdg: Option<VdgClient>,
    pub sws: Option<SwsClient>,
}

#[async_trait]
impl VehicleDataSources for HttpSources {
    async fn dvla_lookup(&self, registration: &str) -> Result<Option<BasicData>, SourceError> {
        let client = self.dvla.as_ref().ok_or(SourceError::NotConfigured("DVLA"))?;
        client.lookup(registration).await
    }

    async fn mot_history(&self, registration: &str) -> Result<Option<Value>, SourceError> {
        let client = self.dvsa.as_ref().ok_or(SourceError::NotConfigured("DVSA"))?;
        client.mot_history(registration).await
    }

    async fn vdg_lookup(
        &self,
        registration: &str,
        packages: &[&str],
    ) -> Result<Option<TechnicalData>, SourceError> {
        let client = self.vdg.as_ref().ok_or(SourceError::NotConfigured("VDG"))?;
        client.lookup(registration, packages).await
    }

    async fn sws_lookup(&self, registration: &str) -> Result<Option<ServiceData>, SourceError> {
        let client = self.sws.as_ref().ok_or(SourceError::NotConfigured("SWS"))?;
        client.lookup(registration).await
    }
}
