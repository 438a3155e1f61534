use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::Tool;

pub const TOOL_NAME: &str = "get_conversion_rate";
pub const BASE_PARAM: &str = "base_currency";
pub const TARGET_PARAM: &str = "target_currency";

pub const DEFAULT_HOST: &str = "https://v6.exchangerate-api.com";

/// Client for the exchangerate-api.com v6 pair endpoint.
///
/// Currency codes are passed through as-is; equal, empty, or unknown codes
/// come back as the upstream's own error payload for the model to read.
pub struct RateClient {
    client: Client,
    host: String,
    api_key: String,
}

impl RateClient {
    pub fn new(api_key: String, host: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, host, api_key })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("EXCHANGE_RATE_API_KEY")
            .map_err(|_| anyhow!("Environment variable 'EXCHANGE_RATE_API_KEY' is required but not set."))?;
        let host = env::var("EXCHANGE_RATE_API_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(api_key, host)
    }

    /// One fresh lookup per call; no caching, no retry.
    ///
    /// The upstream reports failures (unsupported codes, bad keys) as JSON
    /// bodies, often with a non-2xx status. Any decodable body is returned
    /// as-is so the caller can inspect it; only transport failures and
    /// undecodable bodies are errors.
    pub fn lookup(&self, base: &str, target: &str) -> Result<Value> {
        let url = format!(
            "{}/v6/{}/pair/{}/{}",
            self.host.trim_end_matches('/'),
            self.api_key,
            base,
            target
        );

        let response = self.client.get(&url).send()?;
        let status = response.status();

        match response.json::<Value>() {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => Err(anyhow!("Rate service error: {}", status)),
            Err(e) => Err(anyhow!("Malformed rate service response: {}", e)),
        }
    }
}

/// The rate-lookup tool, owning its upstream client.
pub fn tool(client: RateClient) -> Tool {
    Tool::new(
        TOOL_NAME,
        "Fetch the currency conversion rate between a base currency and a \
         target currency.",
        json!({
            "type": "object",
            "properties": {
                (BASE_PARAM): {
                    "type": "string",
                    "description": "The base currency code, e.g. INR"
                },
                (TARGET_PARAM): {
                    "type": "string",
                    "description": "The target currency code, e.g. USD"
                }
            },
            "required": [BASE_PARAM, TARGET_PARAM]
        }),
        move |params| {
            let base = string_param(params, BASE_PARAM)?;
            let target = string_param(params, TARGET_PARAM)?;
            client.lookup(base, target)
        },
    )
}

fn string_param<'a>(params: &'a Value, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing or non-string parameter: {}", name))
}

/// Pull the conversion rate out of an unambiguous success payload. Error
/// results, missing fields, and non-positive or non-finite rates all yield
/// `None`; they must never be treated as a usable rate.
pub fn extract_rate(payload: &Value) -> Option<f64> {
    if payload.get("result").and_then(|v| v.as_str()) != Some("success") {
        return None;
    }
    payload
        .get("conversion_rate")
        .and_then(|v| v.as_f64())
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}
