use crate::config::Config;
use crate::error::AssessError;
use crate::fusion;
use crate::heuristics::{HeuristicEngine, RuleContext};
use crate::model::{ReputationStatus, RiskAssessment, RiskBand};
use crate::normalize::{extract_components, normalize_url};
use crate::reputation::Consolidator;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

/// Persistence seam for finished assessments. Keyed by normalized URL, so a
/// cache hit means the same URL modulo case, default port and trailing slash.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn find_recent(
        &self,
        normalized_url: &str,
        max_age: Duration,
    ) -> Option<RiskAssessment>;
    async fn save(&self, assessment: &RiskAssessment) -> anyhow::Result<()>;
}

/// Optional richer explanation backend (an LLM, a report service). Failures
/// fall back to the built-in template.
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    async fn explain(&self, assessment: &RiskAssessment) -> anyhow::Result<String>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, RiskAssessment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn find_recent(
        &self,
        normalized_url: &str,
        max_age: Duration,
    ) -> Option<RiskAssessment> {
        let entries = self.entries.read().await;
        let assessment = entries.get(normalized_url)?;
        let age = Utc::now().signed_duration_since(assessment.created_at);
        if age.num_seconds() >= 0 && (age.num_seconds() as u64) < max_age.as_secs() {
            Some(assessment.clone())
        } else {
            None
        }
    }

    async fn save(&self, assessment: &RiskAssessment) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(assessment.normalized_url.clone(), assessment.clone());
        Ok(())
    }
}

/// Built-in explanation: verdict, the strongest findings, and a one-line
/// recommendation.
pub fn fallback_explanation(assessment: &RiskAssessment) -> String {
    let mut reasons: Vec<String> = Vec::new();

    for check in &assessment.reputation_checks {
        if check.status == ReputationStatus::Positive {
            reasons.push(format!(
                "{} lists this URL as malicious",
                check.source.label()
            ));
        }
    }

    let mut triggered: Vec<_> = assessment.hits.iter().filter(|h| h.triggered).collect();
    triggered.sort_by(|a, b| b.severity.cmp(&a.severity));
    for hit in triggered.iter().take(3) {
        reasons.push(format!("[{}] {}", hit.severity.label(), hit.details));
    }

    let recommendation = match assessment.band {
        RiskBand::Malicious => "Do not open this link.",
        RiskBand::Suspicious => "Open this link only if you trust the sender.",
        RiskBand::Safe => "No significant risk signals were found.",
    };

    if reasons.is_empty() {
        format!(
            "This URL scored {:.0}/100 ({}). {}",
            assessment.final_score,
            assessment.band.label(),
            recommendation
        )
    } else {
        format!(
            "This URL scored {:.0}/100 ({}). Key findings: {}. {}",
            assessment.final_score,
            assessment.band.label(),
            reasons.join("; "),
            recommendation
        )
    }
}

/// Ties the stages together: normalize, consult the reputation providers,
/// run the heuristic battery, fuse, explain, persist.
pub struct Analyzer {
    consolidator: Consolidator,
    engine: HeuristicEngine,
    store: Option<Box<dyn AssessmentStore>>,
    explainer: Option<Box<dyn ExplanationGenerator>>,
    config: Config,
    network_enabled: bool,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        Analyzer {
            consolidator: Consolidator::new(&config.reputation),
            engine: HeuristicEngine::new(&config.heuristics),
            store: None,
            explainer: None,
            config,
            network_enabled: true,
        }
    }

    pub fn with_store(mut self, store: Box<dyn AssessmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_explainer(mut self, explainer: Box<dyn ExplanationGenerator>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Disables every outbound lookup; network-backed heuristics report
    /// indeterminate and reputation sources are still queried by their
    /// clients, so pair this with keyless source configs when fully offline.
    pub fn with_network(mut self, enabled: bool) -> Self {
        self.network_enabled = enabled;
        self
    }

    #[cfg(test)]
    fn with_consolidator(mut self, consolidator: Consolidator) -> Self {
        self.consolidator = consolidator;
        self
    }

    pub async fn assess(&self, url: &str) -> Result<RiskAssessment, AssessError> {
        let raw = url.trim();
        if raw.is_empty() {
            return Err(AssessError::InvalidInput(
                "URL must not be empty".to_string(),
            ));
        }
        // The normalizer passes unparseable input through verbatim; rejecting
        // it is the orchestrator's job.
        if Url::parse(raw).is_err() {
            return Err(AssessError::InvalidInput(format!(
                "not a parseable URL: {raw}"
            )));
        }

        let normalized = normalize_url(raw);

        if let (Some(store), Some(max_age)) = (&self.store, self.config.cache_max_age_seconds) {
            if let Some(cached) = store
                .find_recent(&normalized, Duration::from_secs(max_age))
                .await
            {
                log::info!("cache hit for {normalized}");
                return Ok(cached);
            }
        }

        let reputation = self.consolidator.consolidate(&normalized).await;

        let mut ctx = RuleContext::new(&normalized, extract_components(&normalized));
        ctx.network_enabled = self.network_enabled;
        ctx.network_timeout =
            Duration::from_secs(self.config.heuristics.network_timeout_seconds);
        let heuristics = self.engine.evaluate(&ctx).await;

        let fused = fusion::fuse(reputation.score, Some(heuristics.score), &self.config.fusion);

        let mut assessment = RiskAssessment {
            url: raw.to_string(),
            normalized_url: normalized,
            reputation_score: reputation.score,
            heuristic_score: Some(heuristics.score),
            final_score: fused.final_score,
            band: RiskBand::from_score(fused.final_score),
            reputation_status: reputation.final_status,
            fusion_degraded: fused.degraded,
            hits: heuristics.hits,
            reputation_checks: reputation.checks,
            explanation: String::new(),
            created_at: Utc::now(),
        };

        assessment.explanation = match &self.explainer {
            Some(explainer) => match explainer.explain(&assessment).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("explanation backend failed, using template: {e}");
                    fallback_explanation(&assessment)
                }
            },
            None => fallback_explanation(&assessment),
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&assessment).await {
                log::warn!("failed to persist assessment: {e}");
            }
        }

        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReputationSource, ReputationStatus};
    use crate::reputation::{SourceClient, SourceReport};
    use serde_json::json;

    struct FixedSource {
        source: ReputationSource,
        status: ReputationStatus,
    }

    #[async_trait]
    impl SourceClient for FixedSource {
        fn source(&self) -> ReputationSource {
            self.source
        }

        async fn check(&self, _url: &str) -> SourceReport {
            match self.status {
                ReputationStatus::Positive => SourceReport::positive(json!({"matches": 1})),
                ReputationStatus::Negative => SourceReport::negative(json!({})),
                ReputationStatus::Unknown => SourceReport::unknown("no_key"),
            }
        }
    }

    fn offline_analyzer(status: ReputationStatus) -> Analyzer {
        let consolidator = Consolidator::with_clients(vec![Box::new(FixedSource {
            source: ReputationSource::Gsb,
            status,
        })]);
        Analyzer::new(Config::default())
            .with_network(false)
            .with_consolidator(consolidator)
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let analyzer = offline_analyzer(ReputationStatus::Negative);
        assert!(analyzer.assess("   ").await.is_err());
        assert!(analyzer.assess("").await.is_err());
    }

    #[tokio::test]
    async fn unparseable_input_is_rejected() {
        let analyzer = offline_analyzer(ReputationStatus::Negative);
        for bad in ["not a url", "http//missing-scheme.com", "://nowhere"] {
            let result = analyzer.assess(bad).await;
            assert!(
                matches!(result, Err(crate::error::AssessError::InvalidInput(_))),
                "{bad:?} should be rejected, got {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn listed_url_with_clean_heuristics_scores_70() {
        let analyzer = offline_analyzer(ReputationStatus::Positive);
        let assessment = analyzer.assess("https://example.com/docs").await.unwrap();

        assert_eq!(assessment.reputation_score, 100.0);
        assert_eq!(assessment.heuristic_score, Some(0.0));
        assert_eq!(assessment.final_score, 70.0);
        assert_eq!(assessment.band, RiskBand::Suspicious);
        assert_eq!(assessment.reputation_status, ReputationStatus::Positive);
        assert!(!assessment.fusion_degraded);
        assert!(assessment.explanation.contains("GSB"));
    }

    #[tokio::test]
    async fn clean_url_everywhere_is_safe() {
        let analyzer = offline_analyzer(ReputationStatus::Negative);
        let assessment = analyzer.assess("https://example.com/docs").await.unwrap();

        assert_eq!(assessment.reputation_score, 0.0);
        assert_eq!(assessment.final_score, 0.0);
        assert_eq!(assessment.band, RiskBand::Safe);
        assert!(assessment
            .explanation
            .contains("No significant risk signals"));
    }

    #[tokio::test]
    async fn normalization_feeds_the_record() {
        let analyzer = offline_analyzer(ReputationStatus::Unknown);
        let assessment = analyzer
            .assess("HTTP://Example.COM:80/Path/")
            .await
            .unwrap();
        assert_eq!(assessment.url, "HTTP://Example.COM:80/Path/");
        assert_eq!(assessment.normalized_url, "http://example.com/Path");
    }

    #[tokio::test]
    async fn cache_returns_the_stored_assessment() {
        let mut config = Config::default();
        config.cache_max_age_seconds = Some(3600);
        let consolidator = Consolidator::with_clients(vec![Box::new(FixedSource {
            source: ReputationSource::Gsb,
            status: ReputationStatus::Negative,
        })]);
        let analyzer = Analyzer::new(config)
            .with_network(false)
            .with_consolidator(consolidator)
            .with_store(Box::new(InMemoryStore::new()));

        let first = analyzer.assess("https://example.com/a").await.unwrap();
        let second = analyzer.assess("https://example.com/a").await.unwrap();
        assert_eq!(first.created_at, second.created_at);

        // different normalized URL misses the cache
        let third = analyzer.assess("https://example.com/b").await.unwrap();
        assert_ne!(first.created_at, third.created_at);
    }

    #[tokio::test]
    async fn in_memory_store_respects_max_age() {
        let store = InMemoryStore::new();
        let analyzer = offline_analyzer(ReputationStatus::Negative);
        let assessment = analyzer.assess("https://example.com/x").await.unwrap();

        store.save(&assessment).await.unwrap();
        assert!(store
            .find_recent(&assessment.normalized_url, Duration::from_secs(60))
            .await
            .is_some());
        assert!(store
            .find_recent(&assessment.normalized_url, Duration::from_secs(0))
            .await
            .is_none());
        assert!(store
            .find_recent("https://other.example/", Duration::from_secs(60))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn explanation_names_the_band_and_findings() {
        let analyzer = offline_analyzer(ReputationStatus::Unknown);
        let assessment = analyzer
            .assess("http://paypa1-login.example-verify.tk/account/verify?token=abc")
            .await
            .unwrap();

        assert!(assessment.explanation.contains("/100"));
        assert!(assessment.explanation.contains("Key findings"));
    }
}
