pub mod gsb;
pub mod virustotal;

use crate::config::ReputationConfig;
use crate::model::{ReputationCheckResult, ReputationSource, ReputationStatus};
use async_trait::async_trait;
use std::time::Instant;

pub use gsb::GsbClient;
pub use virustotal::VirusTotalClient;

/// What one provider said about a URL. `reason` uses the fixed vocabulary
/// ok | no_key | timeout | not_checked | error:<kind>.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub status: ReputationStatus,
    pub reason: String,
    pub raw: serde_json::Value,
}

impl SourceReport {
    pub fn positive(raw: serde_json::Value) -> Self {
        SourceReport {
            status: ReputationStatus::Positive,
            reason: "ok".to_string(),
            raw,
        }
    }

    pub fn negative(raw: serde_json::Value) -> Self {
        SourceReport {
            status: ReputationStatus::Negative,
            reason: "ok".to_string(),
            raw,
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        SourceReport {
            status: ReputationStatus::Unknown,
            reason: reason.into(),
            raw: serde_json::Value::Null,
        }
    }
}

/// One reputation provider. Implementations never return Err; transport
/// failures degrade to an UNKNOWN report with the failure in `reason`.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn source(&self) -> ReputationSource;
    async fn check(&self, url: &str) -> SourceReport;
}

#[derive(Debug, Clone)]
pub struct ConsolidatedReputation {
    pub checks: Vec<ReputationCheckResult>,
    /// The 1.0/0.5/0.0 verdict ladder scaled by 100, so it shares the
    /// 0-100 range of the heuristic score going into fusion.
    pub score: f64,
    pub final_status: ReputationStatus,
}

/// Queries providers in configured order and folds their verdicts into one
/// status. The first POSITIVE is authoritative and stops the sweep; later
/// sources are recorded as not_checked. With no positive, all-NEGATIVE means
/// clean and any UNKNOWN leaves the verdict undecided.
pub struct Consolidator {
    clients: Vec<Box<dyn SourceClient>>,
}

impl Consolidator {
    pub fn new(config: &ReputationConfig) -> Self {
        let clients: Vec<Box<dyn SourceClient>> = config
            .sources
            .iter()
            .map(|source| match source {
                ReputationSource::Gsb => {
                    Box::new(GsbClient::new(&config.gsb)) as Box<dyn SourceClient>
                }
                ReputationSource::Virustotal => {
                    Box::new(VirusTotalClient::new(&config.virustotal)) as Box<dyn SourceClient>
                }
            })
            .collect();
        Consolidator { clients }
    }

    pub fn with_clients(clients: Vec<Box<dyn SourceClient>>) -> Self {
        Consolidator { clients }
    }

    pub async fn consolidate(&self, url: &str) -> ConsolidatedReputation {
        let mut checks = Vec::with_capacity(self.clients.len());
        let mut positive = false;
        let mut any_unknown = false;

        for (index, client) in self.clients.iter().enumerate() {
            let source = client.source();
            let started = Instant::now();
            let report = client.check(url).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            log::debug!(
                "reputation {}: {} ({}) in {}ms",
                source.label(),
                report.status.label(),
                report.reason,
                elapsed_ms
            );

            let status = report.status;
            checks.push(ReputationCheckResult {
                source,
                status,
                reason: report.reason,
                elapsed_ms: Some(elapsed_ms),
                raw: report.raw,
            });

            match status {
                ReputationStatus::Positive => {
                    positive = true;
                    // remaining sources are skipped, but still listed
                    for skipped in &self.clients[index + 1..] {
                        checks.push(ReputationCheckResult {
                            source: skipped.source(),
                            status: ReputationStatus::Unknown,
                            reason: "not_checked".to_string(),
                            elapsed_ms: None,
                            raw: serde_json::Value::Null,
                        });
                    }
                    break;
                }
                ReputationStatus::Unknown => any_unknown = true,
                ReputationStatus::Negative => {}
            }
        }

        let (final_status, score) = if positive {
            (ReputationStatus::Positive, 100.0)
        } else if any_unknown || checks.is_empty() {
            (ReputationStatus::Unknown, 50.0)
        } else {
            (ReputationStatus::Negative, 0.0)
        };

        ConsolidatedReputation {
            checks,
            score,
            final_status,
        }
    }
}
