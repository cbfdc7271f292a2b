// src/services/rate_limiter.rs

//! Limite de requisições por janela fixa, com os contadores no Redis para
//! valer entre vários processos. Sem Redis, tudo passa.

use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::common::cache::RedisPool;

const KEY_PREFIX: &str = "catalog:throttle";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("taxa inválida '{0}': use <n>/<second|minute|hour|day>")]
pub struct InvalidRate(pub String);

/// Taxa no formato "100/hour". Só a primeira letra da unidade importa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRate {
    pub requests: u64,
    pub window_secs: u64,
}

impl ThrottleRate {
    pub const fn new(requests: u64, window_secs: u64) -> Self {
        Self {
            requests,
            window_secs,
        }
    }
}

impl FromStr for ThrottleRate {
    type Err = InvalidRate;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidRate(raw.to_string());
        let (count, unit) = raw.trim().split_once('/').ok_or_else(invalid)?;
        let requests = count.trim().parse::<u64>().map_err(|_| invalid())?;
        let window_secs = match unit.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 3_600,
            Some('d') => 86_400,
            _ => return Err(invalid()),
        };
        Ok(Self::new(requests, window_secs))
    }
}

impl fmt::Display for ThrottleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.window_secs {
            1 => "second",
            60 => "minute",
            3_600 => "hour",
            86_400 => "day",
            other => return write!(f, "{}/{}s", self.requests, other),
        };
        write!(f, "{}/{}", self.requests, unit)
    }
}

#[derive(Debug, Clone)]
pub struct ThrottleSettings {
    pub enabled: bool,
    pub anon: ThrottleRate,
    pub user: ThrottleRate,
    pub burst: ThrottleRate,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            anon: ThrottleRate::new(100, 3_600),
            user: ThrottleRate::new(1_000, 3_600),
            burst: ThrottleRate::new(10, 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleScope {
    Anon,
    User,
    /// Escritas de produtos, além do limite do usuário.
    Burst,
}

impl ThrottleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleScope::Anon => "anon",
            ThrottleScope::User => "user",
            ThrottleScope::Burst => "burst",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Throttled { retry_after: u64 },
}

/// `count` já inclui a requisição atual; `remaining` é o que falta da janela.
pub fn decide(count: u64, remaining: u64, rate: ThrottleRate) -> Decision {
    if count > rate.requests {
        Decision::Throttled {
            retry_after: remaining.max(1),
        }
    } else {
        Decision::Allowed
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: Option<RedisPool>,
    settings: ThrottleSettings,
}

impl RateLimiter {
    pub fn new(cache: Option<RedisPool>, settings: ThrottleSettings) -> Self {
        Self { cache, settings }
    }

    pub fn disabled() -> Self {
        Self::new(
            None,
            ThrottleSettings {
                enabled: false,
                ..Default::default()
            },
        )
    }

    pub fn rate(&self, scope: ThrottleScope) -> ThrottleRate {
        match scope {
            ThrottleScope::Anon => self.settings.anon,
            ThrottleScope::User => self.settings.user,
            ThrottleScope::Burst => self.settings.burst,
        }
    }

    pub async fn check(&self, scope: ThrottleScope, ident: &str) -> Decision {
        if !self.settings.enabled {
            return Decision::Allowed;
        }
        let Some(cache) = &self.cache else {
            return Decision::Allowed;
        };

        let rate = self.rate(scope);
        let key = format!("{KEY_PREFIX}:{}:{ident}", scope.as_str());
        match cache.incr_window(&key, rate.window_secs).await {
            Ok((count, remaining)) => {
                let decision = decide(count, remaining, rate);
                if let Decision::Throttled { retry_after } = decision {
                    tracing::info!(scope = scope.as_str(), %ident, retry_after, "Requisição limitada");
                }
                decision
            }
            Err(e) => {
                tracing::warn!(scope = scope.as_str(), error = %e, "Cache indisponível, limite ignorado");
                Decision::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rates_by_first_letter_of_the_unit() {
        assert_eq!("100/hour".parse(), Ok(ThrottleRate::new(100, 3_600)));
        assert_eq!("10/min".parse(), Ok(ThrottleRate::new(10, 60)));
        assert_eq!("5/s".parse(), Ok(ThrottleRate::new(5, 1)));
        assert_eq!(" 1000 / day ".parse(), Ok(ThrottleRate::new(1_000, 86_400)));
    }

    #[test]
    fn rejects_malformed_rates() {
        assert!("100".parse::<ThrottleRate>().is_err());
        assert!("abc/hour".parse::<ThrottleRate>().is_err());
        assert!("10/week".parse::<ThrottleRate>().is_err());
    }

    #[test]
    fn display_round_trips_known_units() {
        assert_eq!(ThrottleRate::new(10, 60).to_string(), "10/minute");
    }

    #[test]
    fn requests_beyond_the_limit_wait_for_the_window() {
        let rate = ThrottleRate::new(2, 60);
        assert_eq!(decide(1, 60, rate), Decision::Allowed);
        assert_eq!(decide(2, 59, rate), Decision::Allowed);
        assert_eq!(decide(3, 42, rate), Decision::Throttled { retry_after: 42 });
        assert_eq!(decide(3, 0, rate), Decision::Throttled { retry_after: 1 });
    }

    #[tokio::test]
    async fn missing_cache_lets_everything_through() {
        let limiter = RateLimiter::new(None, ThrottleSettings::default());
        for _ in 0..500 {
            assert_eq!(limiter.check(ThrottleScope::Anon, "127.0.0.1").await, Decision::Allowed);
        }
    }
}
