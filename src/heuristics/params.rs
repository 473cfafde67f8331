use super::{Finding, Rule, RuleContext};
use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

const MAX_PARAM_COUNT: usize = 5;
const MAX_VALUE_LENGTH: usize = 100;

fn query_pairs(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.to_lowercase(), v.to_string()))
        .collect()
}

/// A value that is plausibly base64: long enough to be payload, padded to a
/// multiple of four, alphabet-clean and actually decodable.
fn looks_like_base64(value: &str) -> bool {
    value.len() >= 20
        && value.len() % 4 == 0
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
        && value.chars().any(|c| c.is_ascii_alphabetic())
        && BASE64_STANDARD.decode(value).is_ok()
}

pub struct ExcessiveCount;

#[async_trait]
impl Rule for ExcessiveCount {
    fn code(&self) -> &'static str {
        "PARAMS_EXCESSIVE_COUNT"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let count = query_pairs(&ctx.components.query).len();
        if count > MAX_PARAM_COUNT {
            Ok(Finding::triggered(format!(
                "{count} query parameters (threshold {MAX_PARAM_COUNT})"
            )))
        } else {
            Ok(Finding::clear(format!("{count} query parameters")))
        }
    }
}

pub struct SensitiveNames {
    names: Vec<&'static str>,
}

impl SensitiveNames {
    pub fn new() -> Self {
        SensitiveNames {
            names: vec![
                "token",
                "password",
                "passwd",
                "pwd",
                "secret",
                "session",
                "sessionid",
                "session_id",
                "auth",
                "apikey",
                "api_key",
                "credential",
                "otp",
            ],
        }
    }
}

impl Default for SensitiveNames {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SensitiveNames {
    fn code(&self) -> &'static str {
        "PARAMS_SENSITIVE_NAMES"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        for (name, _) in query_pairs(&ctx.components.query) {
            if self.names.contains(&name.as_str()) {
                return Ok(Finding::triggered(format!(
                    "sensitive parameter name \"{name}\" in URL"
                )));
            }
        }
        Ok(Finding::clear("no sensitive parameter names"))
    }
}

pub struct EncodedValues;

#[async_trait]
impl Rule for EncodedValues {
    fn code(&self) -> &'static str {
        "PARAMS_ENCODED_VALUES"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        for (name, value) in query_pairs(&ctx.components.query) {
            if value.len() > MAX_VALUE_LENGTH {
                return Ok(Finding::triggered(format!(
                    "parameter \"{name}\" carries a {}-character value",
                    value.len()
                )));
            }
            if looks_like_base64(&value) {
                return Ok(Finding::triggered(format!(
                    "parameter \"{name}\" carries a base64-shaped value"
                )));
            }
        }
        Ok(Finding::clear("no oversized or encoded parameter values"))
    }
}

pub struct RedirectParams {
    names: Vec<&'static str>,
}

impl RedirectParams {
    pub fn new() -> Self {
        RedirectParams {
            names: vec![
                "redirect",
                "redirect_url",
                "redirect_uri",
                "url",
                "next",
                "return",
                "returnurl",
                "return_url",
                "goto",
                "dest",
                "destination",
                "continue",
                "forward",
            ],
        }
    }
}

impl Default for RedirectParams {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for RedirectParams {
    fn code(&self) -> &'static str {
        "PARAMS_REDIRECT_URL"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        for (name, _) in query_pairs(&ctx.components.query) {
            if self.names.contains(&name.as_str()) {
                return Ok(Finding::triggered(format!(
                    "redirect-style parameter \"{name}\" in URL"
                )));
            }
        }
        Ok(Finding::clear("no redirect-style parameters"))
    }
}

pub struct PersonalDataParams {
    names: Vec<&'static str>,
}

impl PersonalDataParams {
    pub fn new() -> Self {
        PersonalDataParams {
            names: vec![
                "email", "e-mail", "mail", "name", "firstname", "lastname", "fullname", "phone",
                "mobile", "ssn", "dob", "birthdate", "address", "cpf", "nif",
            ],
        }
    }
}

impl Default for PersonalDataParams {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for PersonalDataParams {
    fn code(&self) -> &'static str {
        "PARAMS_PERSONAL_DATA"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        for (name, _) in query_pairs(&ctx.components.query) {
            if self.names.contains(&name.as_str()) {
                return Ok(Finding::triggered(format!(
                    "personal-data parameter \"{name}\" in URL"
                )));
            }
        }
        Ok(Finding::clear("no personal-data parameters"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TriState;
    use crate::normalize::extract_components;

    fn ctx(url: &str) -> RuleContext {
        let mut ctx = RuleContext::new(url, extract_components(url));
        ctx.network_enabled = false;
        ctx
    }

    async fn state(rule: &dyn Rule, url: &str) -> TriState {
        rule.evaluate(&ctx(url)).await.unwrap().state
    }

    #[tokio::test]
    async fn excessive_parameter_count() {
        let rule = ExcessiveCount;
        assert_eq!(
            state(&rule, "http://x.com/?a=1&b=2&c=3&d=4&e=5&f=6").await,
            TriState::Triggered
        );
        assert_eq!(
            state(&rule, "http://x.com/?a=1&b=2&c=3&d=4&e=5").await,
            TriState::Clear
        );
        assert_eq!(state(&rule, "http://x.com/").await, TriState::Clear);
    }

    #[tokio::test]
    async fn sensitive_names_are_case_insensitive() {
        let rule = SensitiveNames::new();
        assert_eq!(
            state(&rule, "http://x.com/?Token=abc").await,
            TriState::Triggered
        );
        assert_eq!(
            state(&rule, "http://x.com/?password=hunter2").await,
            TriState::Triggered
        );
        assert_eq!(state(&rule, "http://x.com/?page=2").await, TriState::Clear);
    }

    #[tokio::test]
    async fn oversized_and_base64_values() {
        let rule = EncodedValues;
        let long_value = "x".repeat(120);
        assert_eq!(
            state(&rule, &format!("http://x.com/?blob={long_value}")).await,
            TriState::Triggered
        );
        // "user@example.com:hunter2" base64-encoded
        assert_eq!(
            state(&rule, "http://x.com/?d=dXNlckBleGFtcGxlLmNvbTpodW50ZXIy").await,
            TriState::Triggered
        );
        assert_eq!(state(&rule, "http://x.com/?q=rust").await, TriState::Clear);
    }

    #[tokio::test]
    async fn redirect_style_names() {
        let rule = RedirectParams::new();
        assert_eq!(
            state(&rule, "http://x.com/?next=http://evil.com").await,
            TriState::Triggered
        );
        assert_eq!(state(&rule, "http://x.com/?q=1").await, TriState::Clear);
    }

    #[tokio::test]
    async fn personal_data_names() {
        let rule = PersonalDataParams::new();
        assert_eq!(
            state(&rule, "http://x.com/?email=a@b.com").await,
            TriState::Triggered
        );
        assert_eq!(state(&rule, "http://x.com/?q=1").await, TriState::Clear);
    }
}
