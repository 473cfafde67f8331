use crate::model::{ReputationSource, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fusion: FusionConfig,
    pub reputation: ReputationConfig,
    pub heuristics: HeuristicsConfig,
    /// Reuse a stored assessment for the same normalized URL if it is
    /// younger than this many seconds. Absent means caching is disabled.
    pub cache_max_age_seconds: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fusion: FusionConfig::default(),
            reputation: ReputationConfig::default(),
            heuristics: HeuristicsConfig::default(),
            cache_max_age_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub reputation_weight: f64,
    pub heuristic_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            reputation_weight: 0.7,
            heuristic_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Query order. Earlier sources short-circuit later ones on a
    /// confirmed positive.
    pub sources: Vec<ReputationSource>,
    pub gsb: SourceConfig,
    pub virustotal: SourceConfig,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        ReputationConfig {
            sources: vec![ReputationSource::Gsb, ReputationSource::Virustotal],
            gsb: SourceConfig {
                api_key: None,
                api_url: None,
                timeout_seconds: 3,
            },
            virustotal: SourceConfig {
                api_key: None,
                api_url: None,
                timeout_seconds: 10,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Falls back to the source's environment variable when absent
    /// (GSB_API_KEY, VT_API_KEY).
    pub api_key: Option<String>,
    /// Override of the provider endpoint, mainly for tests.
    pub api_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    /// Generic fallback for partially specified source sections; the named
    /// sections in `ReputationConfig::default` carry per-provider timeouts.
    fn default() -> Self {
        SourceConfig {
            api_key: None,
            api_url: None,
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Individual timeout for each network-backed rule (WHOIS, DNS, TLS,
    /// redirect following).
    pub network_timeout_seconds: u64,
    /// Per-code severity overrides applied on top of the built-in catalog.
    pub severity_overrides: HashMap<String, Severity>,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        HeuristicsConfig {
            network_timeout_seconds: 5,
            severity_overrides: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_weights() {
        let config = Config::default();
        assert_eq!(config.fusion.reputation_weight, 0.7);
        assert_eq!(config.fusion.heuristic_weight, 0.3);
        assert_eq!(
            config.reputation.sources,
            vec![ReputationSource::Gsb, ReputationSource::Virustotal]
        );
        assert!(config.cache_max_age_seconds.is_none());
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = Config::default();
        config
            .heuristics
            .severity_overrides
            .insert("DOMAIN_HYPHENATED".to_string(), Severity::High);
        config.reputation.gsb.api_key = Some("test-key".to_string());

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.reputation.gsb.api_key.as_deref(), Some("test-key"));
        assert_eq!(
            parsed.heuristics.severity_overrides.get("DOMAIN_HYPHENATED"),
            Some(&Severity::High)
        );
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let parsed: Config = serde_yaml::from_str("fusion:\n  reputation_weight: 0.5\n").unwrap();
        assert_eq!(parsed.fusion.reputation_weight, 0.5);
        // untouched sections keep their defaults
        assert_eq!(parsed.heuristics.network_timeout_seconds, 5);
    }

    #[test]
    fn partial_source_section_fills_defaults() {
        let parsed: Config =
            serde_yaml::from_str("reputation:\n  gsb:\n    api_key: test-key\n").unwrap();
        assert_eq!(parsed.reputation.gsb.api_key.as_deref(), Some("test-key"));
        assert_eq!(
            parsed.reputation.gsb.timeout_seconds,
            SourceConfig::default().timeout_seconds
        );
        // the sibling source keeps its named default
        assert_eq!(parsed.reputation.virustotal.timeout_seconds, 10);
    }
}
