use super::{SourceClient, SourceReport};
use crate::config::SourceConfig;
use crate::model::ReputationSource;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://www.virustotal.com/api/v3/urls";

/// VirusTotal v3 URL report lookup. The URL identifier is the unpadded
/// url-safe base64 of the URL itself; any engine flagging the URL as
/// malicious or suspicious makes the verdict positive.
pub struct VirusTotalClient {
    api_key: Option<String>,
    api_url: String,
    timeout: Duration,
}

impl VirusTotalClient {
    pub fn new(config: &SourceConfig) -> Self {
        VirusTotalClient {
            api_key: config
                .api_key
                .clone()
                .or_else(|| std::env::var("VT_API_KEY").ok()),
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn url_id(url: &str) -> String {
        URL_SAFE_NO_PAD.encode(url.as_bytes())
    }

    fn flagged_count(body: &serde_json::Value) -> Option<i64> {
        let stats = body.pointer("/data/attributes/last_analysis_stats")?;
        let malicious = stats.get("malicious").and_then(|v| v.as_i64())?;
        let suspicious = stats
            .get("suspicious")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Some(malicious + suspicious)
    }
}

#[async_trait]
impl SourceClient for VirusTotalClient {
    fn source(&self) -> ReputationSource {
        ReputationSource::Virustotal
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

        let endpoint = format!("{}/{}", self.api_url.trim_end_matches('/'), Self::url_id(url));
        let response = match client
            .get(&endpoint)
            .header("x-apikey", api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return SourceReport::unknown("timeout"),
            Err(e) => return SourceReport::unknown(format!("error:transport ({e})")),
        };

        // never-submitted URLs come back 404; that is "no data", not an outage
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return SourceReport::unknown("error:not_found");
        }
        if !response.status().is_success() {
            return SourceReport::unknown(format!("error:http_{}", response.status().as_u16()));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return SourceReport::unknown(format!("error:decode ({e})")),
        };

        match Self::flagged_count(&body) {
            Some(count) if count > 0 => SourceReport::positive(body),
            Some(_) => SourceReport::negative(body),
            None => SourceReport::unknown("error:decode (missing last_analysis_stats)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_id_is_unpadded_url_safe_base64() {
        // "http://example.com/" is 19 bytes, so standard base64 would pad
        let id = VirusTotalClient::url_id("http://example.com/");
        assert!(!id.ends_with('='));
        assert!(!id.contains('+') && !id.contains('/'));
        assert_eq!(
            URL_SAFE_NO_PAD.decode(&id).unwrap(),
            b"http://example.com/"
        );
    }

    #[test]
    fn flagged_count_extraction() {
        let body = json!({
            "data": {
                "attributes": {
                    "last_analysis_stats": {
                        "malicious": 7,
                        "suspicious": 2,
                        "harmless": 60,
                        "undetected": 10
                    }
                }
            }
        });
        assert_eq!(VirusTotalClient::flagged_count(&body), Some(9));
        assert_eq!(VirusTotalClient::flagged_count(&json!({})), None);
    }

    #[test]
    fn suspicious_only_verdicts_still_count() {
        let body = json!({
            "data": {
                "attributes": {
                    "last_analysis_stats": {
                        "malicious": 0,
                        "suspicious": 3,
                        "harmless": 70
                    }
                }
            }
        });
        assert_eq!(VirusTotalClient::flagged_count(&body), Some(3));

        let clean = json!({
            "data": {
                "attributes": {
                    "last_analysis_stats": {
                        "malicious": 0,
                        "suspicious": 0,
                        "harmless": 73
                    }
                }
            }
        });
        assert_eq!(VirusTotalClient::flagged_count(&clean), Some(0));
    }

    #[tokio::test]
    async fn missing_key_reports_no_key() {
        let client = VirusTotalClient {
            api_key: None,
            api_url: "http://127.0.0.1:1/api/v3/urls".to_string(),
            timeout: Duration::from_secs(1),
        };
        let report = client.check("http://example.com/").await;
        assert_eq!(report.status, crate::model::ReputationStatus::Unknown);
        assert_eq!(report.reason, "no_key");
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_unknown() {
        let client = VirusTotalClient {
            api_key: Some("k".to_string()),
            api_url: "http://127.0.0.1:1/api/v3/urls".to_string(),
            timeout: Duration::from_secs(1),
        };
        let report = client.check("http://example.com/").await;
        assert_eq!(report.status, crate::model::ReputationStatus::Unknown);
        assert!(report.reason == "timeout" || report.reason.starts_with("error:"));
    }
}
