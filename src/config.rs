// src/config.rs

pub mod env_check;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;

use crate::{
    common::{
        cache::{RedisConfig, RedisPool},
        i18n::I18nStore,
    },
    db::{CategoryRepository, ProductRepository, ProfileRepository, TagRepository, UserRepository},
    services::{
        auth::AuthService,
        category_service::CategoryService,
        hooks::AccountHooks,
        product_service::ProductService,
        profile_service::ProfileService,
        rate_limiter::{RateLimiter, ThrottleRate, ThrottleSettings},
        tag_service::TagService,
    },
    tasks::queue::{RedisTaskQueue, TaskQueue, UnavailableTaskQueue},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("variável de ambiente obrigatória ausente: {0}")]
    Missing(&'static str),

    #[error("valor inválido em {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("configuração insegura para produção: {0}")]
    Unsafe(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("ambiente desconhecido '{other}'")),
        }
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// Configuração lida uma única vez na partida do processo.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub debug: bool,
    pub secret_key: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: Option<String>,
    pub allowed_hosts: Vec<String>,
    pub cors_allowed_origins: Vec<String>,
    pub media_root: PathBuf,
    pub bind_addr: SocketAddr,
    pub language_code: String,
    pub throttle: ThrottleSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Mesmo que `from_env`, mas lendo de qualquer fonte (testes usam um mapa).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("APP_ENV") {
            Some(raw) => raw
                .parse()
                .map_err(|reason| ConfigError::Invalid { var: "APP_ENV", reason })?,
            None => Environment::Development,
        };

        let debug = match get("DEBUG") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: "DEBUG",
                reason: format!("'{raw}' não é um booleano"),
            })?,
            None => environment == Environment::Development,
        };

        let secret_key = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => postgres_url_from_parts(&get)?,
        };

        let allowed_hosts = match get("ALLOWED_HOSTS") {
            Some(raw) => csv(&raw),
            None if environment == Environment::Production => Vec::new(),
            None => vec!["localhost".into(), "127.0.0.1".into()],
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| csv(&raw))
            .unwrap_or_else(|| vec!["http://localhost:3000".into()]);

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), SocketAddr::from(([0, 0, 0, 0], 8000)))?;
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5u32)?;

        let defaults = ThrottleSettings::default();
        let throttle = ThrottleSettings {
            enabled: match get("THROTTLE_ENABLED") {
                Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                    var: "THROTTLE_ENABLED",
                    reason: format!("'{raw}' não é um booleano"),
                })?,
                None => environment != Environment::Test,
            },
            anon: parse_rate("THROTTLE_ANON", get("THROTTLE_ANON"), defaults.anon)?,
            user: parse_rate("THROTTLE_USER", get("THROTTLE_USER"), defaults.user)?,
            burst: parse_rate("THROTTLE_BURST", get("THROTTLE_BURST"), defaults.burst)?,
        };

        Ok(Self {
            environment,
            debug,
            secret_key,
            database_url,
            db_max_connections,
            redis_url: get("REDIS_URL"),
            allowed_hosts,
            cors_allowed_origins,
            media_root: get("MEDIA_ROOT").map(PathBuf::from).unwrap_or_else(|| "mediafiles".into()),
            bind_addr,
            language_code: get("LANGUAGE_CODE").unwrap_or_else(|| "pt-br".into()),
            throttle,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Cookies de sessão só com `Secure` fora do desenvolvimento.
    pub fn secure_cookies(&self) -> bool {
        self.is_production()
    }
}

/// Literais aceitos: true/false/1/0 (sem diferenciar maiúsculas).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

pub fn csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_or<T: FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_rate(var: &'static str, raw: Option<String>, default: ThrottleRate) -> Result<ThrottleRate, ConfigError> {
    parse_or(var, raw, default)
}

/// Monta a URL a partir das variáveis POSTGRES_* (padrão do docker-compose).
fn postgres_url_from_parts<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let db = get("POSTGRES_DB").ok_or(ConfigError::Missing("DATABASE_URL"))?;
    let user = get("POSTGRES_USER").ok_or(ConfigError::Missing("POSTGRES_USER"))?;
    let password = get("POSTGRES_PASSWORD").unwrap_or_default();
    let host = get("POSTGRES_HOST").unwrap_or_else(|| "localhost".into());
    let port = get("POSTGRES_PORT").unwrap_or_else(|| "5432".into());
    Ok(format!("postgres://{user}:{password}@{host}:{port}/{db}"))
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,
    pub cache: Option<RedisPool>,
    pub task_queue: Arc<dyn TaskQueue>,
    pub rate_limiter: RateLimiter,
    pub auth_service: AuthService,
    pub product_service: ProductService,
    pub category_service: CategoryService,
    pub tag_service: TagService,
    pub profile_service: ProfileService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        if settings.is_production() {
            let report = env_check::validate(|key| env::var(key).ok());
            for warning in report.warnings() {
                tracing::warn!("{}", warning);
            }
            if report.has_errors() {
                return Err(ConfigError::Unsafe(report.errors().join("; ")).into());
            }
        }

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;
        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let cache = match &settings.redis_url {
            Some(url) => match RedisPool::new(&RedisConfig { url: url.clone() }) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!("Redis indisponível, seguindo sem cache: {}", e);
                    None
                }
            },
            None => {
                tracing::warn!("REDIS_URL não definida: sem limite de requisições e sem fila de tarefas");
                None
            }
        };

        let task_queue: Arc<dyn TaskQueue> = match &cache {
            Some(pool) => Arc::new(RedisTaskQueue::new(pool.clone())),
            None => Arc::new(UnavailableTaskQueue),
        };

        Self::from_parts(settings, db_pool, cache, task_queue)
    }

    /// Monta o gráfico de dependências a partir de peças já prontas.
    pub fn from_parts(
        settings: Settings,
        db_pool: PgPool,
        cache: Option<RedisPool>,
        task_queue: Arc<dyn TaskQueue>,
    ) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load(&settings.language_code)?);

        let users = UserRepository::new(db_pool.clone());
        let profiles = ProfileRepository::new(db_pool.clone());
        let products = ProductRepository::new(db_pool.clone());
        let categories = CategoryRepository::new(db_pool.clone());
        let tags = TagRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            users.clone(),
            AccountHooks::new(profiles.clone()),
            settings.secret_key.clone(),
        );
        let product_service =
            ProductService::new(products, categories.clone(), tags.clone(), task_queue.clone());
        let category_service = CategoryService::new(categories);
        let tag_service = TagService::new(tags);
        let profile_service = ProfileService::new(profiles, users, settings.media_root.clone());
        let rate_limiter = RateLimiter::new(cache.clone(), settings.throttle.clone());

        Ok(Self {
            db_pool,
            settings: Arc::new(settings),
            i18n_store,
            cache,
            task_queue,
            rate_limiter,
            auth_service,
            product_service,
            category_service,
            tag_service,
            profile_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let s = settings(&[("SECRET_KEY", "dev"), ("DATABASE_URL", "postgres://localhost/catalog")]).unwrap();
        assert_eq!(s.environment, Environment::Development);
        assert!(s.debug);
        assert_eq!(s.allowed_hosts, vec!["localhost", "127.0.0.1"]);
        assert_eq!(s.bind_addr.port(), 8000);
        assert_eq!(s.throttle.anon, ThrottleRate::new(100, 3_600));
        assert!(s.redis_url.is_none());
    }

    #[test]
    fn database_url_falls_back_to_postgres_parts() {
        let s = settings(&[
            ("SECRET_KEY", "dev"),
            ("POSTGRES_DB", "catalog"),
            ("POSTGRES_USER", "app"),
            ("POSTGRES_PASSWORD", "s3cretpass"),
            ("POSTGRES_HOST", "db"),
        ])
        .unwrap();
        assert_eq!(s.database_url, "postgres://app:s3cretpass@db:5432/catalog");
    }

    #[test]
    fn missing_secret_and_database_are_reported() {
        assert!(matches!(
            settings(&[("DATABASE_URL", "postgres://x")]),
            Err(ConfigError::Missing("SECRET_KEY"))
        ));
        assert!(matches!(
            settings(&[("SECRET_KEY", "k")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let base = [("SECRET_KEY", "k"), ("DATABASE_URL", "postgres://x")];
        let with = |extra: (&'static str, &'static str)| {
            let mut pairs = base.to_vec();
            pairs.push(extra);
            settings(&pairs)
        };
        assert!(matches!(with(("DEBUG", "yes")), Err(ConfigError::Invalid { var: "DEBUG", .. })));
        assert!(matches!(
            with(("THROTTLE_BURST", "10/fortnight")),
            Err(ConfigError::Invalid { var: "THROTTLE_BURST", .. })
        ));
        assert!(matches!(with(("APP_ENV", "staging")), Err(ConfigError::Invalid { var: "APP_ENV", .. })));
    }

    #[test]
    fn csv_lists_ignore_blanks() {
        assert_eq!(csv("a.com, b.com,,"), vec!["a.com", "b.com"]);
    }
}
