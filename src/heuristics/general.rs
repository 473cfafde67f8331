use super::{Finding, Rule, RuleContext};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

pub struct UrlShortener {
    hosts: Vec<&'static str>,
}

impl UrlShortener {
    pub fn new() -> Self {
        UrlShortener {
            hosts: vec![
                "bit.ly",
                "tinyurl.com",
                "t.co",
                "goo.gl",
                "ow.ly",
                "is.gd",
                "v.gd",
                "tiny.cc",
                "rb.gy",
                "cutt.ly",
                "shorturl.at",
                "buff.ly",
                "rebrand.ly",
                "lnkd.in",
                "s.id",
                "t.ly",
                "u.to",
            ],
        }
    }
}

impl Default for UrlShortener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for UrlShortener {
    fn code(&self) -> &'static str {
        "GENERAL_URL_SHORTENER"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = ctx.components.host.as_str();
        if self.hosts.contains(&host) {
            Ok(Finding::triggered(format!(
                "{host} is a known URL-shortening service"
            )))
        } else {
            Ok(Finding::clear("host is not a known shortener"))
        }
    }
}

const MAX_REDIRECT_HOPS: u32 = 3;

/// Follows the URL live and counts HTTP redirect hops. Independent of the
/// static embedded-protocol count below.
pub struct RedirectChain {
    hop_limit: u32,
}

impl RedirectChain {
    pub fn new() -> Self {
        RedirectChain { hop_limit: 8 }
    }
}

impl Default for RedirectChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for RedirectChain {
    fn code(&self) -> &'static str {
        "GENERAL_REDIRECT_CHAIN"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let parsed = match Url::parse(&ctx.raw_url) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(Finding::clear("unparseable URL")),
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Ok(Finding::clear("not an HTTP(S) URL"));
        }
        if !ctx.network_enabled {
            return Ok(Finding::indeterminate("network checks disabled"));
        }

        let client = reqwest::Client::builder()
            .timeout(ctx.network_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let mut current = parsed.to_string();
        let mut hops = 0u32;
        while hops < self.hop_limit {
            let response = match client.head(&current).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    return Ok(Finding::indeterminate("redirect probe timed out"))
                }
                Err(e) => {
                    return Ok(Finding::indeterminate(format!("redirect probe failed: {e}")))
                }
            };
            if !response.status().is_redirection() {
                break;
            }
            let location = match response
                .headers()
                .get("location")
                .and_then(|value| value.to_str().ok())
            {
                Some(location) => location.to_string(),
                None => break,
            };
            current = if location.starts_with("http") {
                location
            } else {
                match Url::parse(&current).and_then(|base| base.join(&location)) {
                    Ok(joined) => joined.to_string(),
                    Err(_) => break,
                }
            };
            hops += 1;
            if hops > MAX_REDIRECT_HOPS {
                return Ok(Finding::triggered(format!(
                    "redirect chain exceeds {MAX_REDIRECT_HOPS} hops"
                )));
            }
        }
        Ok(Finding::clear(format!("{hops} redirect hop(s)")))
    }
}

/// Static substring count of protocol prefixes in the given text, the other
/// half of the redirect-obfuscation pair.
pub struct EmbeddedProtocols;

#[async_trait]
impl Rule for EmbeddedProtocols {
    fn code(&self) -> &'static str {
        "GENERAL_EMBEDDED_PROTOCOLS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let lower = ctx.raw_url.to_lowercase();
        let count = lower.matches("http://").count() + lower.matches("https://").count();
        if count >= 2 {
            Ok(Finding::triggered(format!(
                "{count} protocol prefixes embedded in the URL"
            )))
        } else {
            Ok(Finding::clear("single protocol prefix"))
        }
    }
}

/// Host text as the user sees it, before the URL parser IDNA-encodes it
/// to punycode.
fn raw_host(raw: &str) -> Option<&str> {
    let rest = raw.split_once("://")?.1;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    Some(authority.rsplit_once('@').map_or(authority, |(_, host)| host))
}

pub struct MixedScripts;

#[async_trait]
impl Rule for MixedScripts {
    fn code(&self) -> &'static str {
        "GENERAL_MIXED_SCRIPTS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        // Work on the pre-encoding text: the parsed host is already
        // punycode for any internationalized input.
        if let Some(host) = raw_host(&ctx.raw_url) {
            let has_ascii_letters = host.chars().any(|c| c.is_ascii_alphabetic());
            let foreign: Vec<char> = host
                .chars()
                .filter(|c| c.is_alphabetic() && !c.is_ascii())
                .collect();
            if has_ascii_letters && !foreign.is_empty() {
                return Ok(Finding::triggered(format!(
                    "host mixes Latin with non-Latin characters ({})",
                    foreign.iter().collect::<String>()
                )));
            }
        }

        // input that arrives already encoded
        if ctx
            .components
            .host
            .split('.')
            .any(|label| label.starts_with("xn--"))
        {
            return Ok(Finding::triggered(
                "internationalized (punycode) host label",
            ));
        }
        Ok(Finding::clear("single-script host"))
    }
}

pub struct SymbolDensity;

#[async_trait]
impl Rule for SymbolDensity {
    fn code(&self) -> &'static str {
        "GENERAL_SYMBOL_DENSITY"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let mut emoji = 0usize;
        let mut oddballs = 0usize;
        for c in ctx.raw_url.chars() {
            let code = c as u32;
            if (0x1F000..=0x1FAFF).contains(&code) || (0x2600..=0x27BF).contains(&code) {
                emoji += 1;
            } else if c.is_ascii()
                && !c.is_ascii_alphanumeric()
                && !"-._~:/?#[]@!$&'()*+,;=%".contains(c)
            {
                oddballs += 1;
            }
        }
        if emoji > 0 {
            Ok(Finding::triggered(format!("{emoji} emoji character(s) in URL")))
        } else if oddballs >= 3 {
            Ok(Finding::triggered(format!(
                "{oddballs} characters outside the normal URL alphabet"
            )))
        } else {
            Ok(Finding::clear("no unusual symbols"))
        }
    }
}

pub struct UrgencyPhrases {
    pattern: Regex,
}

impl UrgencyPhrases {
    pub fn new() -> Self {
        UrgencyPhrases {
            pattern: Regex::new(
                r"(?i)\b(free|winner|prize|bonus|urgent|urgente|claim|reward|gift|lucky|congratulations|act[-_]?now|limited[-_]?time|expires?[-_]?(today|soon))\b",
            )
            .expect("static regex"),
        }
    }
}

impl Default for UrgencyPhrases {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for UrgencyPhrases {
    fn code(&self) -> &'static str {
        "GENERAL_URGENCY_PHRASES"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        if let Some(matched) = self.pattern.find(&ctx.raw_url) {
            Ok(Finding::triggered(format!(
                "appealing/urgency phrase \"{}\" in URL",
                matched.as_str()
            )))
        } else {
            Ok(Finding::clear("no urgency phrases"))
        }
    }
}

const REPETITION_THRESHOLD: usize = 3;

pub struct KeywordRepetition;

#[async_trait]
impl Rule for KeywordRepetition {
    fn code(&self) -> &'static str {
        "GENERAL_KEYWORD_REPETITION"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        // structural tokens repeat legitimately
        let stopwords = ["http", "https", "www", "html", "index", "php"];
        let lower = ctx.raw_url.to_lowercase();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
            if token.len() >= 4 && !stopwords.contains(&token) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        if let Some((token, count)) = counts
            .iter()
            .filter(|(_, &count)| count >= REPETITION_THRESHOLD)
            .max_by_key(|(_, &count)| count)
        {
            Ok(Finding::triggered(format!(
                "keyword \"{token}\" repeated {count} times"
            )))
        } else {
            Ok(Finding::clear("no repeated keywords"))
        }
    }
}

pub struct AtSymbol;

#[async_trait]
impl Rule for AtSymbol {
    fn code(&self) -> &'static str {
        "GENERAL_AT_SYMBOL"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        match Url::parse(&ctx.raw_url) {
            Ok(parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
                Ok(Finding::triggered(
                    "userinfo section hides the real host behind an @",
                ))
            }
            Ok(_) => Ok(Finding::clear("no userinfo section")),
            Err(_) => Ok(Finding::clear("unparseable URL")),
        }
    }
}
