use crate::model::{Category, Severity};
use std::collections::HashMap;

/// Static catalog entry for one heuristic check.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicDefinition {
    pub code: &'static str,
    pub category: Category,
    pub severity: Severity,
}

/// The full check catalog in registration order. The hit list of an
/// assessment preserves this order for reproducible output.
pub const DEFINITIONS: &[HeuristicDefinition] = &[
    // domain
    def("DOMAIN_AGE_RECENT", Category::Domain, Severity::High),
    def("DOMAIN_EXPIRY_CLOSE", Category::Domain, Severity::Medium),
    def("DOMAIN_SUSPICIOUS_TLD", Category::Domain, Severity::High),
    def("DOMAIN_IS_IP_ADDRESS", Category::Domain, Severity::High),
    def("DOMAIN_BRAND_LOOKALIKE", Category::Domain, Severity::Critical),
    def("DOMAIN_DEEP_SUBDOMAINS", Category::Domain, Severity::Medium),
    def("DOMAIN_HYPHENATED", Category::Domain, Severity::Low),
    def("DOMAIN_NO_HTTPS", Category::Domain, Severity::Medium),
    def("DOMAIN_INVALID_TLS", Category::Domain, Severity::High),
    def("DOMAIN_NO_DNS", Category::Domain, Severity::High),
    def("DOMAIN_GEO_MISMATCH", Category::Domain, Severity::Medium),
    // path
    def("PATH_DEEP_NESTING", Category::Path, Severity::Low),
    def("PATH_ADMIN_DIRECTORIES", Category::Path, Severity::Medium),
    def("PATH_SUSPICIOUS_FILENAME", Category::Path, Severity::High),
    def("PATH_EXECUTABLE_EXTENSION", Category::Path, Severity::High),
    def("PATH_SOCIAL_ENGINEERING", Category::Path, Severity::Medium),
    // parameters
    def("PARAMS_EXCESSIVE_COUNT", Category::Parameters, Severity::Low),
    def("PARAMS_SENSITIVE_NAMES", Category::Parameters, Severity::Medium),
    def("PARAMS_ENCODED_VALUES", Category::Parameters, Severity::Medium),
    def("PARAMS_REDIRECT_URL", Category::Parameters, Severity::Medium),
    def("PARAMS_PERSONAL_DATA", Category::Parameters, Severity::Medium),
    // general
    def("GENERAL_URL_SHORTENER", Category::General, Severity::Medium),
    def("GENERAL_REDIRECT_CHAIN", Category::General, Severity::High),
    def("GENERAL_EMBEDDED_PROTOCOLS", Category::General, Severity::High),
    def("GENERAL_MIXED_SCRIPTS", Category::General, Severity::High),
    def("GENERAL_SYMBOL_DENSITY", Category::General, Severity::Low),
    def("GENERAL_URGENCY_PHRASES", Category::General, Severity::Medium),
    def("GENERAL_KEYWORD_REPETITION", Category::General, Severity::Low),
    def("GENERAL_AT_SYMBOL", Category::General, Severity::High),
];

const fn def(code: &'static str, category: Category, severity: Severity) -> HeuristicDefinition {
    HeuristicDefinition {
        code,
        category,
        severity,
    }
}

/// Severity/category lookup built once at startup and shared read-only with
/// the engine. Codes not present in the catalog fall back to Medium.
#[derive(Debug, Clone)]
pub struct HeuristicCatalog {
    by_code: HashMap<&'static str, HeuristicDefinition>,
    overrides: HashMap<String, Severity>,
}

impl Default for HeuristicCatalog {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl HeuristicCatalog {
    pub fn new(overrides: HashMap<String, Severity>) -> Self {
        let mut by_code = HashMap::new();
        for definition in DEFINITIONS {
            by_code.insert(definition.code, *definition);
        }
        HeuristicCatalog { by_code, overrides }
    }

    pub fn severity(&self, code: &str) -> Severity {
        if let Some(&severity) = self.overrides.get(code) {
            return severity;
        }
        self.by_code
            .get(code)
            .map(|definition| definition.severity)
            .unwrap_or(Severity::Medium)
    }

    pub fn category(&self, code: &str) -> Category {
        self.by_code
            .get(code)
            .map(|definition| definition.category)
            .unwrap_or(Category::General)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_checks_with_unique_codes() {
        let mut codes: Vec<&str> = DEFINITIONS.iter().map(|d| d.code).collect();
        assert_eq!(codes.len(), 29);
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 29, "duplicate heuristic code in catalog");
    }

    #[test]
    fn unknown_code_falls_back_to_medium() {
        let catalog = HeuristicCatalog::default();
        assert_eq!(catalog.severity("NOT_A_REAL_CHECK"), Severity::Medium);
    }

    #[test]
    fn override_takes_precedence() {
        let mut overrides = HashMap::new();
        overrides.insert("DOMAIN_HYPHENATED".to_string(), Severity::Critical);
        let catalog = HeuristicCatalog::new(overrides);
        assert_eq!(catalog.severity("DOMAIN_HYPHENATED"), Severity::Critical);
        // non-overridden codes keep their default
        assert_eq!(catalog.severity("DOMAIN_NO_HTTPS"), Severity::Medium);
    }

    #[test]
    fn categories_match_code_prefixes() {
        for definition in DEFINITIONS {
            let expected = if definition.code.starts_with("DOMAIN_") {
                Category::Domain
            } else if definition.code.starts_with("PATH_") {
                Category::Path
            } else if definition.code.starts_with("PARAMS_") {
                Category::Parameters
            } else {
                Category::General
            };
            assert_eq!(definition.category, expected, "{}", definition.code);
        }
    }
}
