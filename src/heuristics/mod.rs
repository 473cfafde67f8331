pub mod catalog;
pub mod domain;
pub mod general;
pub mod params;
pub mod path;

use crate::config::HeuristicsConfig;
use crate::model::{HeuristicHit, TriState, UrlComponents};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use catalog::HeuristicCatalog;

/// Everything a rule may look at. Rules are pure over these inputs except
/// for the network-backed ones, which honor `network_enabled` and
/// `network_timeout`.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub raw_url: String,
    pub components: UrlComponents,
    pub network_enabled: bool,
    pub network_timeout: Duration,
}

impl RuleContext {
    pub fn new(raw_url: &str, components: UrlComponents) -> Self {
        RuleContext {
            raw_url: raw_url.to_string(),
            components,
            network_enabled: true,
            network_timeout: Duration::from_secs(5),
        }
    }
}

/// What one rule concluded, with a human-readable detail string that ends
/// up in the hit list.
#[derive(Debug, Clone)]
pub struct Finding {
    pub state: TriState,
    pub details: String,
}

impl Finding {
    pub fn triggered(details: impl Into<String>) -> Self {
        Finding {
            state: TriState::Triggered,
            details: details.into(),
        }
    }

    pub fn clear(details: impl Into<String>) -> Self {
        Finding {
            state: TriState::Clear,
            details: details.into(),
        }
    }

    pub fn indeterminate(details: impl Into<String>) -> Self {
        Finding {
            state: TriState::Indeterminate,
            details: format!("indeterminate: {}", details.into()),
        }
    }
}

#[async_trait]
pub trait Rule: Send + Sync {
    fn code(&self) -> &'static str;
    async fn evaluate(&self, ctx: &RuleContext) -> anyhow::Result<Finding>;
}

#[derive(Debug, Clone)]
pub struct HeuristicResult {
    pub score: f64,
    pub hits: Vec<HeuristicHit>,
}

/// Runs the registered rules in catalog order and converts triggered hits
/// into a severity-weighted score. Stateless across calls; the catalog is
/// read-only and shared.
pub struct HeuristicEngine {
    catalog: Arc<HeuristicCatalog>,
    rules: Vec<Box<dyn Rule>>,
}

impl HeuristicEngine {
    pub fn new(config: &HeuristicsConfig) -> Self {
        let catalog = Arc::new(HeuristicCatalog::new(config.severity_overrides.clone()));
        let rules = default_rules();
        HeuristicEngine { catalog, rules }
    }

    /// Engine over a custom rule set; used by tests and callers that plug
    /// in their own checks.
    pub fn with_rules(catalog: Arc<HeuristicCatalog>, rules: Vec<Box<dyn Rule>>) -> Self {
        HeuristicEngine { catalog, rules }
    }

    pub async fn evaluate(&self, ctx: &RuleContext) -> HeuristicResult {
        let mut hits = Vec::with_capacity(self.rules.len());
        let mut total: u32 = 0;

        for rule in &self.rules {
            let code = rule.code();
            let severity = self.catalog.severity(code);
            let category = self.catalog.category(code);

            // One faulty rule never aborts the batch.
            let (triggered, details) = match rule.evaluate(ctx).await {
                Ok(finding) => match finding.state {
                    TriState::Triggered => (true, finding.details),
                    TriState::Clear | TriState::Indeterminate => (false, finding.details),
                },
                Err(e) => {
                    log::warn!("heuristic {code} failed: {e}");
                    (false, format!("evaluation error: {e}"))
                }
            };

            if triggered {
                total = total.saturating_add(severity.points());
            }

            hits.push(HeuristicHit {
                code: code.to_string(),
                category,
                severity,
                triggered,
                details,
            });
        }

        HeuristicResult {
            score: total.min(100) as f64,
            hits,
        }
    }
}

/// The built-in 29-check battery, registered in catalog order.
fn default_rules() -> Vec<Box<dyn Rule>> {
    let whois = Arc::new(domain::WhoisClient::default());
    vec![
        Box::new(domain::DomainAgeRecent::new(whois.clone())),
        Box::new(domain::DomainExpiryClose::new(whois)),
        Box::new(domain::SuspiciousTld::new()),
        Box::new(domain::IpAsHost),
        Box::new(domain::BrandLookalike::new()),
        Box::new(domain::DeepSubdomains),
        Box::new(domain::HyphenatedDomain),
        Box::new(domain::NoHttps),
        Box::new(domain::InvalidTls),
        Box::new(domain::NoDnsRecords),
        Box::new(domain::GeoMismatch::new()),
        Box::new(path::DeepNesting),
        Box::new(path::AdminDirectories::new()),
        Box::new(path::SuspiciousFilename::new()),
        Box::new(path::ExecutableExtension::new()),
        Box::new(path::SocialEngineeringPath::new()),
        Box::new(params::ExcessiveCount),
        Box::new(params::SensitiveNames::new()),
        Box::new(params::EncodedValues),
        Box::new(params::RedirectParams::new()),
        Box::new(params::PersonalDataParams::new()),
        Box::new(general::UrlShortener::new()),
        Box::new(general::RedirectChain::new()),
        Box::new(general::EmbeddedProtocols),
        Box::new(general::MixedScripts),
        Box::new(general::SymbolDensity),
        Box::new(general::UrgencyPhrases::new()),
        Box::new(general::KeywordRepetition),
        Box::new(general::AtSymbol),
    ]
}
