use super::{Finding, Rule, RuleContext};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use regex::Regex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::timeout;
use url::Url;

/// TLDs with registries that hand out two-part names (domain.co.uk etc.).
const TWO_PART_TLDS: &[&str] = &[
    "co.uk", "com.au", "co.jp", "co.kr", "com.br", "co.za", "com.mx", "co.in", "com.sg", "co.nz",
    "com.ar", "co.il", "org.uk", "net.au", "gov.uk", "ac.uk", "edu.au",
];

/// Registrable domain for WHOIS queries and label checks
/// ("mail.accounts.example.co.uk" -> "example.co.uk").
pub fn extract_root_domain(host: &str) -> String {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return host.to_string();
    }

    let last_two = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
    if parts.len() >= 3 && TWO_PART_TLDS.contains(&last_two.as_str()) {
        return format!("{}.{}", parts[parts.len() - 3], last_two);
    }
    last_two
}

fn is_ip_host(host: &str) -> bool {
    let trimmed = host.trim_start_matches('[').trim_end_matches(']');
    trimmed.parse::<IpAddr>().is_ok()
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Fold the digit/symbol substitutions typosquatters lean on before
/// measuring edit distance ("g00gle" -> "google").
fn fold_homoglyphs(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'l',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            '@' => 'a',
            '$' => 's',
            other => other,
        })
        .collect()
}

fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

// ---------------------------------------------------------------------------
// WHOIS

#[derive(Debug, Clone)]
pub struct WhoisInfo {
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
}

/// Raw WHOIS over TCP port 43 with an in-process cache so the age and
/// expiry rules share one lookup per assessment.
pub struct WhoisClient {
    cache: Arc<RwLock<HashMap<String, WhoisInfo>>>,
}

impl Default for WhoisClient {
    fn default() -> Self {
        WhoisClient {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl WhoisClient {
    pub async fn lookup(&self, domain: &str, limit: Duration) -> Result<WhoisInfo> {
        let domain = domain.to_lowercase();
        {
            let cache = self.cache.read().await;
            if let Some(info) = cache.get(&domain) {
                log::debug!("using cached WHOIS record for {domain}");
                return Ok(info.clone());
            }
        }

        let server = whois_server_for(&domain);
        let text = self.query_server(server, &domain, limit).await?;
        let info = parse_whois_record(&text);
        {
            let mut cache = self.cache.write().await;
            cache.insert(domain, info.clone());
        }
        Ok(info)
    }

    async fn query_server(&self, server: &str, domain: &str, limit: Duration) -> Result<String> {
        log::debug!("querying WHOIS server {server}:43 for {domain}");
        let mut stream = timeout(limit, TcpStream::connect(format!("{server}:43"))).await??;
        stream.write_all(format!("{domain}\r\n").as_bytes()).await?;

        let mut response = String::new();
        timeout(limit, stream.read_to_string(&mut response)).await??;
        if response.is_empty() {
            return Err(anyhow!("empty WHOIS response from {server}"));
        }
        Ok(response)
    }
}

fn whois_server_for(domain: &str) -> &'static str {
    let tld = domain.split('.').next_back().unwrap_or(domain);
    match tld {
        "com" | "net" => "whois.verisign-grs.com",
        "org" => "whois.pir.org",
        "info" => "whois.afilias.net",
        "us" => "whois.nic.us",
        "uk" => "whois.nic.uk",
        "de" => "whois.denic.de",
        "fr" => "whois.afnic.fr",
        "it" => "whois.nic.it",
        "nl" => "whois.domain-registry.nl",
        "au" => "whois.auda.org.au",
        "ca" => "whois.cira.ca",
        "jp" => "whois.jprs.jp",
        "cn" => "whois.cnnic.cn",
        "ru" => "whois.tcinet.ru",
        "br" => "whois.registro.br",
        _ => "whois.iana.org",
    }
}

fn parse_whois_record(text: &str) -> WhoisInfo {
    let creation_patterns = [
        r"(?i)creation\s*date[:\s]+([^\r\n]+)",
        r"(?i)created(?:\s*on)?[:\s]+([^\r\n]+)",
        r"(?i)registered(?:\s*on)?[:\s]+([^\r\n]+)",
        r"(?i)registration\s*date[:\s]+([^\r\n]+)",
    ];
    let expiry_patterns = [
        r"(?i)expir\w*\s*date[:\s]+([^\r\n]+)",
        r"(?i)expires(?:\s*on)?[:\s]+([^\r\n]+)",
        r"(?i)paid-till[:\s]+([^\r\n]+)",
        r"(?i)renewal\s*date[:\s]+([^\r\n]+)",
    ];

    WhoisInfo {
        created: first_date(text, &creation_patterns),
        expires: first_date(text, &expiry_patterns),
    }
}

fn first_date(text: &str, patterns: &[&str]) -> Option<DateTime<Utc>> {
    for pattern in patterns {
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(_) => continue,
        };
        if let Some(captures) = regex.captures(text) {
            if let Some(matched) = captures.get(1) {
                if let Some(date) = parse_whois_date(matched.as_str().trim()) {
                    return Some(date);
                }
            }
        }
    }
    None
}

fn parse_whois_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Registries love their own formats; try the date-bearing first token.
    let token = raw.split_whitespace().next()?;
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(token, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    for format in ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(token, format) {
            return Some(Utc.from_utc_datetime(&parsed.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Rules

const YOUNG_DOMAIN_DAYS: i64 = 30;
const EXPIRY_WINDOW_DAYS: i64 = 30;

pub struct DomainAgeRecent {
    whois: Arc<WhoisClient>,
}

impl DomainAgeRecent {
    pub fn new(whois: Arc<WhoisClient>) -> Self {
        DomainAgeRecent { whois }
    }
}

#[async_trait]
impl Rule for DomainAgeRecent {
    fn code(&self) -> &'static str {
        "DOMAIN_AGE_RECENT"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() {
            return Ok(Finding::clear("no host to check"));
        }
        if is_ip_host(host) {
            return Ok(Finding::clear("IP-address host has no registration record"));
        }
        if !ctx.network_enabled {
            return Ok(Finding::indeterminate("network checks disabled"));
        }

        let root = extract_root_domain(host);
        let info = match self.whois.lookup(&root, ctx.network_timeout).await {
            Ok(info) => info,
            Err(e) => return Ok(Finding::indeterminate(format!("WHOIS lookup failed: {e}"))),
        };
        match info.created {
            Some(created) => {
                let age_days = (Utc::now() - created).num_days();
                if age_days < YOUNG_DOMAIN_DAYS {
                    Ok(Finding::triggered(format!(
                        "domain {root} registered {age_days} days ago"
                    )))
                } else {
                    Ok(Finding::clear(format!(
                        "domain {root} is {age_days} days old"
                    )))
                }
            }
            None => Ok(Finding::indeterminate(
                "creation date not present in WHOIS record",
            )),
        }
    }
}

pub struct DomainExpiryClose {
    whois: Arc<WhoisClient>,
}

impl DomainExpiryClose {
    pub fn new(whois: Arc<WhoisClient>) -> Self {
        DomainExpiryClose { whois }
    }
}

#[async_trait]
impl Rule for DomainExpiryClose {
    fn code(&self) -> &'static str {
        "DOMAIN_EXPIRY_CLOSE"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() {
            return Ok(Finding::clear("no host to check"));
        }
        if is_ip_host(host) {
            return Ok(Finding::clear("IP-address host has no registration record"));
        }
        if !ctx.network_enabled {
            return Ok(Finding::indeterminate("network checks disabled"));
        }

        let root = extract_root_domain(host);
        let info = match self.whois.lookup(&root, ctx.network_timeout).await {
            Ok(info) => info,
            Err(e) => return Ok(Finding::indeterminate(format!("WHOIS lookup failed: {e}"))),
        };
        match info.expires {
            Some(expires) => {
                let days_left = (expires - Utc::now()).num_days();
                if days_left < EXPIRY_WINDOW_DAYS {
                    Ok(Finding::triggered(format!(
                        "domain {root} expires in {days_left} days"
                    )))
                } else {
                    Ok(Finding::clear(format!(
                        "domain {root} expires in {days_left} days"
                    )))
                }
            }
            None => Ok(Finding::indeterminate(
                "expiry date not present in WHOIS record",
            )),
        }
    }
}

pub struct SuspiciousTld {
    tlds: Vec<&'static str>,
}

impl SuspiciousTld {
    pub fn new() -> Self {
        SuspiciousTld {
            tlds: vec![
                "tk", "ml", "ga", "cf", "gq", "xyz", "top", "work", "click", "loan", "date",
                "racing", "win", "stream", "download", "science", "party", "faith", "cricket",
                "bid", "trade", "men", "link", "buzz", "monster", "icu", "cyou", "sbs", "bond",
                "zip", "mov", "rest", "uno",
            ],
        }
    }
}

impl Default for SuspiciousTld {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SuspiciousTld {
    fn code(&self) -> &'static str {
        "DOMAIN_SUSPICIOUS_TLD"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() || is_ip_host(host) {
            return Ok(Finding::clear("no TLD to check"));
        }
        let tld = host.rsplit('.').next().unwrap_or("");
        if self.tlds.contains(&tld) {
            Ok(Finding::triggered(format!(
                ".{tld} is a high-abuse top-level domain"
            )))
        } else {
            Ok(Finding::clear(format!(".{tld} not on the high-abuse list")))
        }
    }
}

pub struct IpAsHost;

#[async_trait]
impl Rule for IpAsHost {
    fn code(&self) -> &'static str {
        "DOMAIN_IS_IP_ADDRESS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        if is_ip_host(&ctx.components.host) {
            Ok(Finding::triggered(format!(
                "host is a literal IP address ({})",
                ctx.components.host
            )))
        } else {
            Ok(Finding::clear("host is a domain name"))
        }
    }
}

pub struct BrandLookalike {
    brands: Vec<(&'static str, &'static [&'static str])>,
    similarity_threshold: f64,
}

impl BrandLookalike {
    pub fn new() -> Self {
        BrandLookalike {
            brands: vec![
                ("google", &["google.com", "google.co.uk"]),
                ("microsoft", &["microsoft.com", "office.com", "live.com"]),
                ("apple", &["apple.com", "icloud.com"]),
                ("amazon", &["amazon.com", "amazon.co.uk", "amazon.com.br"]),
                ("paypal", &["paypal.com", "paypal.me"]),
                ("netflix", &["netflix.com"]),
                ("facebook", &["facebook.com", "fb.com"]),
                ("instagram", &["instagram.com"]),
                ("whatsapp", &["whatsapp.com"]),
                ("dropbox", &["dropbox.com"]),
                ("github", &["github.com", "github.io"]),
                ("linkedin", &["linkedin.com"]),
                ("coinbase", &["coinbase.com"]),
                ("binance", &["binance.com"]),
                ("docusign", &["docusign.com", "docusign.net"]),
                ("adobe", &["adobe.com"]),
                ("dhl", &["dhl.com", "dhl.de"]),
                ("fedex", &["fedex.com"]),
                ("santander", &["santander.com", "santander.pt"]),
            ],
            similarity_threshold: 0.7,
        }
    }

    fn is_official(&self, host: &str, officials: &[&str]) -> bool {
        officials
            .iter()
            .any(|official| host == *official || host.ends_with(&format!(".{official}")))
    }
}

impl Default for BrandLookalike {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for BrandLookalike {
    fn code(&self) -> &'static str {
        "DOMAIN_BRAND_LOOKALIKE"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() || is_ip_host(host) {
            return Ok(Finding::clear("no domain label to compare"));
        }

        let root = extract_root_domain(host);
        let label = root.split('.').next().unwrap_or(&root);
        let folded = fold_homoglyphs(label);

        for (brand, officials) in &self.brands {
            if self.is_official(host, officials) {
                continue;
            }

            let score = similarity(&folded, brand);
            if score >= self.similarity_threshold {
                return Ok(Finding::triggered(format!(
                    "domain label \"{label}\" imitates brand \"{brand}\" (similarity {score:.2})"
                )));
            }

            // Brand name used as a subdomain label of an unrelated domain.
            if host
                .split('.')
                .any(|part| fold_homoglyphs(part) == *brand)
                && fold_homoglyphs(label) != *brand
            {
                return Ok(Finding::triggered(format!(
                    "brand \"{brand}\" appears as a subdomain of unrelated domain {root}"
                )));
            }
        }
        Ok(Finding::clear("no curated brand within similarity threshold"))
    }
}

pub struct DeepSubdomains;

#[async_trait]
impl Rule for DeepSubdomains {
    fn code(&self) -> &'static str {
        "DOMAIN_DEEP_SUBDOMAINS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() || is_ip_host(host) {
            return Ok(Finding::clear("no subdomains to count"));
        }
        let root = extract_root_domain(host);
        let depth = host.split('.').count().saturating_sub(root.split('.').count());
        if depth >= 3 {
            Ok(Finding::triggered(format!(
                "{depth} subdomain levels below {root}"
            )))
        } else {
            Ok(Finding::clear(format!("{depth} subdomain levels")))
        }
    }
}

pub struct HyphenatedDomain;

#[async_trait]
impl Rule for HyphenatedDomain {
    fn code(&self) -> &'static str {
        "DOMAIN_HYPHENATED"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() || is_ip_host(host) {
            return Ok(Finding::clear("no domain label to check"));
        }
        let root = extract_root_domain(host);
        let label = root.split('.').next().unwrap_or(&root);
        if label.contains('-') {
            Ok(Finding::triggered(format!(
                "registrable label \"{label}\" uses hyphens"
            )))
        } else {
            Ok(Finding::clear("no hyphens in registrable label"))
        }
    }
}

pub struct NoHttps;

#[async_trait]
impl Rule for NoHttps {
    fn code(&self) -> &'static str {
        "DOMAIN_NO_HTTPS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        match Url::parse(&ctx.raw_url) {
            Ok(parsed) if parsed.scheme() == "https" => {
                Ok(Finding::clear("URL uses HTTPS"))
            }
            Ok(parsed) => Ok(Finding::triggered(format!(
                "URL uses {} instead of https",
                parsed.scheme()
            ))),
            Err(_) => Ok(Finding::clear("unparseable URL, scheme unknown")),
        }
    }
}

pub struct InvalidTls;

#[async_trait]
impl Rule for InvalidTls {
    fn code(&self) -> &'static str {
        "DOMAIN_INVALID_TLS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let parsed = match Url::parse(&ctx.raw_url) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(Finding::clear("unparseable URL")),
        };
        if parsed.scheme() != "https" {
            return Ok(Finding::clear("not an HTTPS URL, certificate not applicable"));
        }
        if !ctx.network_enabled {
            return Ok(Finding::indeterminate("network checks disabled"));
        }

        let client = reqwest::Client::builder()
            .timeout(ctx.network_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        match client.head(parsed.as_str()).send().await {
            Ok(_) => Ok(Finding::clear("TLS handshake and certificate accepted")),
            Err(e) if e.is_timeout() => Ok(Finding::indeterminate("TLS probe timed out")),
            Err(e) => {
                let description = format!("{e:?}").to_lowercase();
                if description.contains("certificate") || description.contains("ssl") {
                    Ok(Finding::triggered(format!(
                        "TLS certificate rejected: {e}"
                    )))
                } else {
                    Ok(Finding::indeterminate(format!("TLS probe failed: {e}")))
                }
            }
        }
    }
}

pub struct NoDnsRecords;

#[async_trait]
impl Rule for NoDnsRecords {
    fn code(&self) -> &'static str {
        "DOMAIN_NO_DNS"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() {
            return Ok(Finding::clear("no host to resolve"));
        }
        if is_ip_host(host) {
            return Ok(Finding::clear("IP-address host needs no resolution"));
        }
        if !ctx.network_enabled {
            return Ok(Finding::indeterminate("network checks disabled"));
        }

        let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
        match timeout(ctx.network_timeout, resolver.lookup_ip(host.as_str())).await {
            Ok(Ok(lookup)) => {
                let count = lookup.iter().count();
                Ok(Finding::clear(format!("host resolves to {count} address(es)")))
            }
            Ok(Err(e)) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(Finding::triggered(format!(
                    "no DNS records for {host}"
                ))),
                _ => Ok(Finding::indeterminate(format!("DNS resolution failed: {e}"))),
            },
            Err(_) => Ok(Finding::indeterminate("DNS resolution timed out")),
        }
    }
}

pub struct GeoMismatch {
    tld_countries: HashMap<&'static str, &'static str>,
}

impl GeoMismatch {
    pub fn new() -> Self {
        let tld_countries = HashMap::from([
            ("pt", "Portugal"),
            ("es", "Spain"),
            ("fr", "France"),
            ("de", "Germany"),
            ("it", "Italy"),
            ("uk", "United Kingdom"),
            ("nl", "Netherlands"),
            ("br", "Brazil"),
            ("cn", "China"),
            ("jp", "Japan"),
            ("kr", "South Korea"),
            ("ru", "Russia"),
            ("in", "India"),
            ("au", "Australia"),
            ("ca", "Canada"),
            ("mx", "Mexico"),
        ]);
        GeoMismatch { tld_countries }
    }
}

impl Default for GeoMismatch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for GeoMismatch {
    fn code(&self) -> &'static str {
        "DOMAIN_GEO_MISMATCH"
    }

    /// Compares the URL's country-code TLD against the ccTLD of the server's
    /// reverse-DNS hostname. Only a disagreement between two mapped ccTLDs
    /// counts; generic TLDs carry no expectation.
    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let host = &ctx.components.host;
        if host.is_empty() || is_ip_host(host) {
            return Ok(Finding::clear("no country expectation for this host"));
        }
        let url_tld = host.rsplit('.').next().unwrap_or("");
        let expected = match self.tld_countries.get(url_tld) {
            Some(country) => *country,
            None => {
                return Ok(Finding::clear(format!(
                    ".{url_tld} carries no country expectation"
                )))
            }
        };
        if !ctx.network_enabled {
            return Ok(Finding::indeterminate("network checks disabled"));
        }

        let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
        let address = match timeout(ctx.network_timeout, resolver.lookup_ip(host.as_str())).await {
            Ok(Ok(lookup)) => match lookup.iter().next() {
                Some(address) => address,
                None => return Ok(Finding::indeterminate("host has no addresses")),
            },
            Ok(Err(e)) => {
                return Ok(Finding::indeterminate(format!("DNS resolution failed: {e}")))
            }
            Err(_) => return Ok(Finding::indeterminate("DNS resolution timed out")),
        };

        let ptr_name = match timeout(ctx.network_timeout, resolver.reverse_lookup(address)).await {
            Ok(Ok(reverse)) => match reverse.iter().next() {
                Some(name) => name.to_utf8().trim_end_matches('.').to_lowercase(),
                None => return Ok(Finding::indeterminate("no reverse DNS record")),
            },
            Ok(Err(e)) => {
                return Ok(Finding::indeterminate(format!("reverse DNS failed: {e}")))
            }
            Err(_) => return Ok(Finding::indeterminate("reverse DNS timed out")),
        };

        let ptr_tld = ptr_name.rsplit('.').next().unwrap_or("");
        match self.tld_countries.get(ptr_tld) {
            Some(actual) if *actual != expected => Ok(Finding::triggered(format!(
                ".{url_tld} domain (expects {expected}) served from {actual} infrastructure ({ptr_name})"
            ))),
            Some(_) => Ok(Finding::clear("server location matches TLD expectation")),
            None => Ok(Finding::clear(format!(
                "reverse DNS name {ptr_name} carries no country signal"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::extract_components;

    fn offline_ctx(url: &str) -> RuleContext {
        let mut ctx = RuleContext::new(url, extract_components(url));
        ctx.network_enabled = false;
        ctx
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("paypal", "paypal"), 0);
        assert_eq!(levenshtein("paypal", "paypa1"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn homoglyph_folding() {
        assert_eq!(fold_homoglyphs("g00gle"), "google");
        assert_eq!(fold_homoglyphs("paypa1"), "paypal");
        assert_eq!(fold_homoglyphs("plain"), "plain");
    }

    #[test]
    fn root_domain_handles_two_part_tlds() {
        assert_eq!(extract_root_domain("mail.example.com"), "example.com");
        assert_eq!(extract_root_domain("a.b.example.co.uk"), "example.co.uk");
        assert_eq!(extract_root_domain("localhost"), "localhost");
    }

    #[tokio::test]
    async fn ip_as_host_triggers_on_literal_addresses() {
        let rule = IpAsHost;
        let finding = rule
            .evaluate(&offline_ctx("http://192.168.1.10/login"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);

        let finding = rule
            .evaluate(&offline_ctx("http://example.com/login"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Clear);
    }

    #[tokio::test]
    async fn suspicious_tld_membership() {
        let rule = SuspiciousTld::new();
        let finding = rule
            .evaluate(&offline_ctx("http://freestuff.tk/win"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);

        let finding = rule
            .evaluate(&offline_ctx("http://example.org/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Clear);
    }

    #[tokio::test]
    async fn brand_lookalike_catches_typosquats_but_not_the_brand() {
        let rule = BrandLookalike::new();
        let finding = rule
            .evaluate(&offline_ctx("https://paypa1.com/signin"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);

        let finding = rule
            .evaluate(&offline_ctx("https://www.paypal.com/signin"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Clear);

        // homoglyph substitution folds back onto the brand
        let finding = rule
            .evaluate(&offline_ctx("https://g00gle.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);
    }

    #[tokio::test]
    async fn brand_in_subdomain_of_unrelated_domain_triggers() {
        let rule = BrandLookalike::new();
        let finding = rule
            .evaluate(&offline_ctx("https://paypal.evil-host.net/login"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);
    }

    #[tokio::test]
    async fn subdomain_depth_threshold() {
        let rule = DeepSubdomains;
        let finding = rule
            .evaluate(&offline_ctx("http://a.b.c.example.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);

        let finding = rule
            .evaluate(&offline_ctx("http://www.example.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Clear);
    }

    #[tokio::test]
    async fn hyphen_rule_checks_registrable_label_only() {
        let rule = HyphenatedDomain;
        let finding = rule
            .evaluate(&offline_ctx("http://secure-login-portal.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);

        // hyphen in a subdomain label is not the registrable label
        let finding = rule
            .evaluate(&offline_ctx("http://eu-west.example.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Clear);
    }

    #[tokio::test]
    async fn no_https_triggers_for_plain_http() {
        let rule = NoHttps;
        let finding = rule
            .evaluate(&offline_ctx("http://example.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Triggered);

        let finding = rule
            .evaluate(&offline_ctx("https://example.com/"))
            .await
            .unwrap();
        assert_eq!(finding.state, crate::model::TriState::Clear);
    }

    #[tokio::test]
    async fn network_rules_go_indeterminate_offline() {
        let ctx = offline_ctx("https://example.pt/");
        let whois = Arc::new(WhoisClient::default());

        for (rule, _) in [
            (
                Box::new(DomainAgeRecent::new(whois.clone())) as Box<dyn Rule>,
                "age",
            ),
            (Box::new(DomainExpiryClose::new(whois)) as Box<dyn Rule>, "expiry"),
            (Box::new(InvalidTls) as Box<dyn Rule>, "tls"),
            (Box::new(NoDnsRecords) as Box<dyn Rule>, "dns"),
            (Box::new(GeoMismatch::new()) as Box<dyn Rule>, "geo"),
        ] {
            let finding = rule.evaluate(&ctx).await.unwrap();
            assert_eq!(
                finding.state,
                crate::model::TriState::Indeterminate,
                "{} should be indeterminate offline",
                rule.code()
            );
        }
    }

    #[test]
    fn whois_record_parsing() {
        let text = "Domain Name: EXAMPLE.COM\n\
                    Creation Date: 1995-08-14T04:00:00Z\n\
                    Registry Expiry Date: 2026-08-13T04:00:00Z\n";
        let info = parse_whois_record(text);
        assert_eq!(info.created.unwrap().format("%Y-%m-%d").to_string(), "1995-08-14");
        assert_eq!(info.expires.unwrap().format("%Y-%m-%d").to_string(), "2026-08-13");
    }

    #[test]
    fn whois_date_formats() {
        assert!(parse_whois_date("2023-05-01T12:00:00Z").is_some());
        assert!(parse_whois_date("2023-05-01").is_some());
        assert!(parse_whois_date("01-May-2023").is_some());
        assert!(parse_whois_date("2023.05.01").is_some());
        assert!(parse_whois_date("before 1996").is_none());
    }
}
