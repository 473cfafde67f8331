use super::{SourceClient, SourceReport};
use crate::config::SourceConfig;
use crate::model::ReputationSource;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";

const THREAT_TYPES: [&str; 5] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
    "THREAT_TYPE_UNSPECIFIED",
];

/// Google Safe Browsing v4 threatMatches lookup. A non-empty `matches`
/// array is a confirmed-bad verdict; an empty response means not listed.
pub struct GsbClient {
    api_key: Option<String>,
    api_url: String,
    timeout: Duration,
}

impl GsbClient {
    pub fn new(config: &SourceConfig) -> Self {
        GsbClient {
            api_key: config
                .api_key
                .clone()
                .or_else(|| std::env::var("GSB_API_KEY").ok()),
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn request_body(url: &str) -> serde_json::Value {
        json!({
            "client": {
                "clientId": "clicksafe",
                "clientVersion": env!("CARGO_PKG_VERSION"),
            },
            "threatInfo": {
                "threatTypes": THREAT_TYPES,
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{"url": url}],
            },
        })
    }
}

#[async_trait]
impl SourceClient for GsbClient {
    fn source(&self) -> ReputationSource {
        ReputationSource::Gsb
    }

    async fn check(&self, url: &str) -> SourceReport {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => return SourceReport::unknown("no_key"),
        };

        let client = match reqwest::Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => return SourceReport::unknown(format!("error:client ({e})")),
        };

        let response = match client
            .post(&self.api_url)
            .query(&[("key", api_key.as_str())])
            .json(&Self::request_body(url))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return SourceReport::unknown("timeout"),
            Err(e) => return SourceReport::unknown(format!("error:transport ({e})")),
        };

        if !response.status().is_success() {
            return SourceReport::unknown(format!("error:http_{}", response.status().as_u16()));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return SourceReport::unknown(format!("error:decode ({e})")),
        };

        match body.get("matches").and_then(|m| m.as_array()) {
            Some(matches) if !matches.is_empty() => SourceReport::positive(body),
            _ => SourceReport::negative(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> SourceConfig {
        SourceConfig {
            api_key: api_key.map(str::to_string),
            api_url: Some("http://127.0.0.1:1/v4/threatMatches:find".to_string()),
            timeout_seconds: 1,
        }
    }

    #[test]
    fn request_body_shape() {
        let body = GsbClient::request_body("http://evil.example/path");
        assert_eq!(body["client"]["clientId"], "clicksafe");
        assert_eq!(
            body["threatInfo"]["threatEntries"][0]["url"],
            "http://evil.example/path"
        );
        assert_eq!(
            body["threatInfo"]["threatTypes"].as_array().unwrap().len(),
            5
        );
        assert_eq!(body["threatInfo"]["threatEntryTypes"][0], "URL");
    }

    #[tokio::test]
    async fn missing_key_reports_no_key_without_network() {
        let client = GsbClient {
            api_key: None,
            api_url: "http://127.0.0.1:1/".to_string(),
            timeout: Duration::from_secs(1),
        };
        let report = client.check("http://example.com/").await;
        assert_eq!(report.status, crate::model::ReputationStatus::Unknown);
        assert_eq!(report.reason, "no_key");
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_unknown() {
        let client = GsbClient::new(&config(Some("k")));
        let report = client.check("http://example.com/").await;
        assert_eq!(report.status, crate::model::ReputationStatus::Unknown);
        assert!(report.reason == "timeout" || report.reason.starts_with("error:"));
    }
}
