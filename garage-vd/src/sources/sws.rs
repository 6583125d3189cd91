//! SWS specialist technical data client
//!
//! The response is deeply nested and varies by vehicle, so engine and radio
//! codes are found by a keyword scan rather than fixed paths.

use serde_json::Value;
use std::time::Duration;

use super::{error_for_status, http_client, json_string, rate_limiter, Limiter, SourceError};
use crate::models::{Payload, ServiceData};

pub const SWS_BASE_URL: &str = "https://api.sws.co.uk";
const RATE_LIMIT_PER_SEC: u32 = 2;

/// SWS client
pub struct SwsClient {
    http_client: reqwest::Client,
    rate_limiter: Limiter,
    base_url: String,
    api_key: String,
}

impl SwsClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            rate_limiter: rate_limiter(RATE_LIMIT_PER_SEC),
            base_url: base_url.unwrap_or_else(|| SWS_BASE_URL.to_string()),
            api_key,
        })
    }

    pub async fn lookup(&self, registration: &str) -> Result<Option<ServiceData>, SourceError> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/api/v2/vehicle/{}",
            self.base_url.trim_end_matches('/'),
            registration
        );
        tracing::debug!(registration = %registration, "Querying SWS technical data");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let data = parse_response(body);
        Ok(if data.is_empty() { None } else { Some(data) })
    }
}

/// Build service data from a raw response
pub fn parse_response(body: Value) -> ServiceData {
    let codes = scan_codes(&body);
    let service_data = body
        .get("serviceData")
        .or_else(|| body.get("service"))
        .cloned()
        .unwrap_or(body);

    ServiceData {
        engine_code: codes.engine_code,
        radio_code: codes.radio_code,
        service_data: Some(service_data),
    }
}

/// Codes found anywhere in a nested response
#[derive(Debug, Default, PartialEq)]
pub struct ScannedCodes {
    pub engine_code: Option<String>,
    pub radio_code: Option<String>,
}

#[derive(Clone, Copy)]
enum CodeKind {
    Engine,
    Radio,
}

fn classify(label: &str) -> Option<CodeKind> {
    let label = label.to_ascii_lowercase();
    if !label.contains("code") {
        return None;
    }
    if label.contains("engine") {
        Some(CodeKind::Engine)
    } else if label.contains("radio") {
        Some(CodeKind::Radio)
    } else {
        None
    }
}

/// Walk the response depth-first; the first match of each kind wins
///
/// Matches both `"engineCode": "M0JA"` keys and `{"name": "Engine Code",
/// "value": "M0JA"}` pairs.
pub fn scan_codes(value: &Value) -> ScannedCodes {
    let mut codes = ScannedCodes::default();
    scan(value, &mut codes);
    codes
}

fn record(codes: &mut ScannedCodes, kind: CodeKind, found: Option<String>) {
    let slot = match kind {
        CodeKind::Engine => &mut codes.engine_code,
        CodeKind::Radio => &mut codes.radio_code,
    };
    if slot.is_none() {
        *slot = found;
    }
}

fn scan(value: &Value, codes: &mut ScannedCodes) {
    match value {
        Value::Object(map) => {
            let pair_name = map
                .get("name")
                .or_else(|| map.get("Name"))
                .and_then(Value::as_str);
            if let Some(kind) = pair_name.and_then(classify) {
                let found = json_string(map.get("value").or_else(|| map.get("Value")));
                record(codes, kind, found);
            }

            for (key, child) in map {
                if let Some(kind) = classify(key) {
                    record(codes, kind, json_string(Some(child)));
                }
                scan(child, codes);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| scan(item, codes)),
        _ => {}
    }
}
