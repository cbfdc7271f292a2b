// src/config/env_check.rs

//! Conferência das variáveis de ambiente: presença, formato e, em produção,
//! valores inseguros. Usado por `manage validate-env` e na partida quando
//! `APP_ENV=production`.

use crate::config::{csv, parse_bool};

pub const SECRET_KEY_MIN_LEN: usize = 50;
pub const DB_PASSWORD_MIN_LEN: usize = 8;

pub const RECOMMENDED_VARS: &[&str] = &["ALLOWED_HOSTS", "CSRF_TRUSTED_ORIGINS", "SENTRY_DSN"];

const SECRET_VARS: &[&str] = &["SECRET_KEY", "DATABASE_URL", "POSTGRES_PASSWORD", "REDIS_URL", "SENTRY_DSN"];

const INSECURE_SECRET_MARKERS: &[&str] = &[
    "django-insecure-",
    "changeme",
    "pleasechangeme",
    "secret",
    "your-secret-key-here",
];

const WEAK_DB_PASSWORDS: &[&str] = &["postgres", "password", "123456", "admin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub var: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Variável conferida: nome e valor para exibição (segredos mascarados).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checked {
    pub var: &'static str,
    pub shown: String,
}

#[derive(Debug, Default)]
pub struct EnvReport {
    pub production: bool,
    pub checked: Vec<Checked>,
    pub findings: Vec<Finding>,
}

impl EnvReport {
    fn error(&mut self, var: &'static str, message: impl Into<String>) {
        self.findings.push(Finding {
            var,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, var: &'static str, message: impl Into<String>) {
        self.findings.push(Finding {
            var,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    fn ok(&mut self, var: &'static str, value: &str) {
        self.checked.push(Checked {
            var,
            shown: display_value(var, value),
        });
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// No modo estrito, avisos também reprovam.
    pub fn passed(&self, strict: bool) -> bool {
        if strict {
            self.findings.is_empty()
        } else {
            !self.has_errors()
        }
    }

    fn messages(&self, severity: Severity) -> Vec<String> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .map(|f| format!("{}: {}", f.var, f.message))
            .collect()
    }
}

pub fn validate<F>(lookup: F) -> EnvReport
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let production = get("APP_ENV").is_some_and(|env| matches!(env.to_ascii_lowercase().as_str(), "production" | "prod"));
    let mut report = EnvReport {
        production,
        ..Default::default()
    };

    // SECRET_KEY
    match get("SECRET_KEY") {
        None => report.error("SECRET_KEY", "obrigatória e não definida"),
        Some(key) if key.chars().count() < SECRET_KEY_MIN_LEN => report.error(
            "SECRET_KEY",
            format!("precisa ter ao menos {SECRET_KEY_MIN_LEN} caracteres (tem {})", key.chars().count()),
        ),
        Some(key) => {
            if production && INSECURE_SECRET_MARKERS.iter().any(|m| key.to_lowercase().contains(m)) {
                report.error("SECRET_KEY", "parece ser uma chave padrão ou insegura");
            } else {
                report.ok("SECRET_KEY", &key);
            }
        }
    }

    // DEBUG
    match get("DEBUG") {
        None => report.error("DEBUG", "obrigatória e não definida"),
        Some(raw) => match parse_bool(&raw) {
            None => report.error("DEBUG", format!("'{raw}' não é True/False/1/0")),
            Some(true) if production => report.error("DEBUG", "DEBUG ligado em produção"),
            Some(_) => report.ok("DEBUG", &raw),
        },
    }

    // Banco: DATABASE_URL ou o conjunto POSTGRES_*
    let mut db_password = None;
    match get("DATABASE_URL") {
        Some(url) => {
            if url.starts_with("postgres://") || url.starts_with("postgresql://") {
                db_password = password_from_url(&url);
                report.ok("DATABASE_URL", &url);
            } else {
                report.error("DATABASE_URL", "precisa começar com postgres:// ou postgresql://");
            }
        }
        None => {
            for var in ["POSTGRES_DB", "POSTGRES_USER"] {
                match get(var) {
                    Some(value) => report.ok(var, &value),
                    None => report.error(var, "obrigatória sem DATABASE_URL"),
                }
            }
            match get("POSTGRES_PASSWORD") {
                None => report.error("POSTGRES_PASSWORD", "obrigatória sem DATABASE_URL"),
                Some(pw) if pw.chars().count() < DB_PASSWORD_MIN_LEN => report.error(
                    "POSTGRES_PASSWORD",
                    format!("precisa ter ao menos {DB_PASSWORD_MIN_LEN} caracteres"),
                ),
                Some(pw) => {
                    report.ok("POSTGRES_PASSWORD", &pw);
                    db_password = Some(pw);
                }
            }
        }
    }

    if production && db_password.as_deref().is_some_and(|pw| WEAK_DB_PASSWORDS.contains(&pw.to_lowercase().as_str())) {
        report.error("POSTGRES_PASSWORD", "senha do banco fraca em produção");
    }

    // REDIS_URL
    match get("REDIS_URL") {
        None => report.error("REDIS_URL", "obrigatória e não definida"),
        Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => report.ok("REDIS_URL", &url),
        Some(_) => report.error("REDIS_URL", "precisa começar com redis://"),
    }

    for &var in RECOMMENDED_VARS {
        match get(var) {
            Some(value) => report.ok(var, &value),
            None => report.warning(var, "recomendada e não definida"),
        }
    }

    if production {
        let hosts = get("ALLOWED_HOSTS").map(|raw| csv(&raw)).unwrap_or_default();
        if hosts.is_empty() {
            report.error("ALLOWED_HOSTS", "vazia em produção");
        } else if hosts.iter().any(|h| h == "*") {
            report.error("ALLOWED_HOSTS", "contém '*' em produção");
        } else if hosts.iter().any(|h| h == "localhost" || h == "127.0.0.1") {
            report.warning("ALLOWED_HOSTS", "contém localhost em produção");
        }
    }

    report
}

/// Segredos aparecem como os 8 primeiros e os 8 últimos caracteres.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 16 {
        return "*".repeat(chars.len().min(8));
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}...{tail}")
}

fn display_value(var: &str, value: &str) -> String {
    if SECRET_VARS.contains(&var) {
        mask(value)
    } else {
        value.to_string()
    }
}

fn password_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    let (credentials, _) = rest.rsplit_once('@')?;
    let (_, password) = credentials.split_once(':')?;
    Some(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const STRONG_KEY: &str = "k8s7d6f5g4h3j2k1l0qwertyuiopasdfghjklzxcvbnm12345678";

    fn check(pairs: &[(&str, &str)]) -> EnvReport {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        validate(|key| vars.get(key).cloned())
    }

    fn complete() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SECRET_KEY", STRONG_KEY),
            ("DEBUG", "False"),
            ("DATABASE_URL", "postgres://app:Str0ngPassw0rd@db:5432/catalog"),
            ("REDIS_URL", "redis://redis:6379/0"),
            ("ALLOWED_HOSTS", "catalog.example.com"),
            ("CSRF_TRUSTED_ORIGINS", "https://catalog.example.com"),
            ("SENTRY_DSN", "https://abc@sentry.example.com/1"),
        ]
    }

    fn vars_with_errors(report: &EnvReport) -> Vec<&'static str> {
        report
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .map(|f| f.var)
            .collect()
    }

    #[test]
    fn complete_environment_passes_strict() {
        let report = check(&complete());
        assert!(report.passed(true), "{:?}", report.findings);
    }

    #[test]
    fn shape_rules_are_enforced() {
        let report = check(&[
            ("SECRET_KEY", "short"),
            ("DEBUG", "yes"),
            ("DATABASE_URL", "mysql://x"),
            ("REDIS_URL", "http://redis"),
        ]);
        assert_eq!(vars_with_errors(&report), vec!["SECRET_KEY", "DEBUG", "DATABASE_URL", "REDIS_URL"]);
    }

    #[test]
    fn postgres_parts_replace_database_url() {
        let mut vars = complete();
        vars.retain(|(k, _)| *k != "DATABASE_URL");
        vars.extend([("POSTGRES_DB", "catalog"), ("POSTGRES_USER", "app"), ("POSTGRES_PASSWORD", "short")]);
        let report = check(&vars);
        assert_eq!(vars_with_errors(&report), vec!["POSTGRES_PASSWORD"]);
    }

    #[test]
    fn missing_recommended_vars_only_fail_strict() {
        let mut vars = complete();
        vars.retain(|(k, _)| *k != "SENTRY_DSN");
        let report = check(&vars);
        assert!(report.passed(false));
        assert!(!report.passed(true));
    }

    #[test]
    fn production_rejects_insecure_values() {
        let report = check(&[
            ("APP_ENV", "production"),
            ("SECRET_KEY", "django-insecure-0123456789012345678901234567890123456789"),
            ("DEBUG", "True"),
            ("DATABASE_URL", "postgres://app:postgres@db/catalog"),
            ("REDIS_URL", "redis://redis"),
            ("ALLOWED_HOSTS", "*"),
        ]);
        let errors = vars_with_errors(&report);
        for var in ["SECRET_KEY", "DEBUG", "POSTGRES_PASSWORD", "ALLOWED_HOSTS"] {
            assert!(errors.contains(&var), "{var} deveria falhar: {errors:?}");
        }
    }

    #[test]
    fn localhost_in_production_is_a_warning() {
        let mut vars = complete();
        vars.retain(|(k, _)| *k != "ALLOWED_HOSTS");
        vars.extend([("APP_ENV", "production"), ("ALLOWED_HOSTS", "localhost,catalog.example.com")]);
        let report = check(&vars);
        assert!(!report.has_errors(), "{:?}", report.findings);
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask(STRONG_KEY), "k8s7d6f5...12345678");
        assert_eq!(mask("tiny"), "****");
        let report = check(&complete());
        let secret = report.checked.iter().find(|c| c.var == "SECRET_KEY").unwrap();
        assert!(!secret.shown.contains("qwerty"));
        let hosts = report.checked.iter().find(|c| c.var == "ALLOWED_HOSTS").unwrap();
        assert_eq!(hosts.shown, "catalog.example.com");
    }
}
