use super::{Finding, Rule, RuleContext};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

const MAX_PATH_SEGMENTS: usize = 5;

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub struct DeepNesting;

#[async_trait]
impl Rule for DeepNesting {
    fn code(&self) -> &'static str {
        "PATH_DEEP_NESTING"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let count = segments(&ctx.components.path).len();
        if count > MAX_PATH_SEGMENTS {
            Ok(Finding::triggered(format!(
                "path has {count} segments (threshold {MAX_PATH_SEGMENTS})"
            )))
        } else {
            Ok(Finding::clear(format!("path has {count} segments")))
        }
    }
}

pub struct AdminDirectories {
    keywords: Vec<&'static str>,
}

impl AdminDirectories {
    pub fn new() -> Self {
        AdminDirectories {
            keywords: vec![
                "admin",
                "administrator",
                "login",
                "signin",
                "secure",
                "account",
                "wp-admin",
                "cpanel",
                "webmail",
                "backup",
                "phpmyadmin",
            ],
        }
    }
}

impl Default for AdminDirectories {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for AdminDirectories {
    fn code(&self) -> &'static str {
        "PATH_ADMIN_DIRECTORIES"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let path = ctx.components.path.to_lowercase();
        for segment in segments(&path) {
            if self.keywords.contains(&segment) {
                return Ok(Finding::triggered(format!(
                    "administrative path segment \"/{segment}/\""
                )));
            }
        }
        Ok(Finding::clear("no administrative path segments"))
    }
}

pub struct SuspiciousFilename {
    double_extension: Regex,
}

impl SuspiciousFilename {
    pub fn new() -> Self {
        SuspiciousFilename {
            // benign document/image extension immediately followed by an
            // executable one, e.g. invoice.pdf.exe
            double_extension: Regex::new(
                r"(?i)\.(pdf|doc|docx|xls|xlsx|jpg|jpeg|png|gif|txt|zip)\.(exe|scr|bat|cmd|com|js|vbs|jar|msi|ps1)$",
            )
            .expect("static regex"),
        }
    }
}

impl Default for SuspiciousFilename {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SuspiciousFilename {
    fn code(&self) -> &'static str {
        "PATH_SUSPICIOUS_FILENAME"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let filename = segments(&ctx.components.path).last().copied().unwrap_or("");
        if self.double_extension.is_match(filename) {
            Ok(Finding::triggered(format!(
                "executable disguised behind a benign extension: {filename}"
            )))
        } else {
            Ok(Finding::clear("no disguised-executable filename"))
        }
    }
}

pub struct ExecutableExtension {
    extensions: Vec<&'static str>,
}

impl ExecutableExtension {
    pub fn new() -> Self {
        ExecutableExtension {
            extensions: vec![
                ".exe", ".scr", ".bat", ".cmd", ".com", ".msi", ".jar", ".vbs", ".ps1", ".apk",
                ".dll",
            ],
        }
    }
}

impl Default for ExecutableExtension {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for ExecutableExtension {
    fn code(&self) -> &'static str {
        "PATH_EXECUTABLE_EXTENSION"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        let path = ctx.components.path.to_lowercase();
        for extension in &self.extensions {
            if path.ends_with(extension) {
                return Ok(Finding::triggered(format!(
                    "path ends in executable extension {extension}"
                )));
            }
        }
        Ok(Finding::clear("no executable extension"))
    }
}

pub struct SocialEngineeringPath {
    pattern: Regex,
}

impl SocialEngineeringPath {
    pub fn new() -> Self {
        SocialEngineeringPath {
            pattern: Regex::new(
                r"(?i)\b(verify|verification|confirm|update|suspend|suspended|unlock|validate|recover|restore|billing|invoice|refund)\b",
            )
            .expect("static regex"),
        }
    }
}

impl Default for SocialEngineeringPath {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SocialEngineeringPath {
    fn code(&self) -> &'static str {
        "PATH_SOCIAL_ENGINEERING"
    }

    async fn evaluate(&self, ctx: &RuleContext) -> Result<Finding> {
        if let Some(matched) = self.pattern.find(&ctx.components.path) {
            Ok(Finding::triggered(format!(
                "social-engineering keyword \"{}\" in path",
                matched.as_str()
            )))
        } else {
            Ok(Finding::clear("no social-engineering keywords in path"))
        }
    }
}
