// src/common/cache.rs

//! Acesso ao Redis: contadores do rate limiter, fila de tarefas e resultados.
//! O cliente é preguiçoso: `new` não conecta, cada operação abre (ou reaproveita)
//! uma conexão multiplexada.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisResult};

#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// URL de conexão (ex.: "redis://localhost:6379/0")
    pub url: String,
}

#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    pub fn new(config: &RedisConfig) -> RedisResult<Self> {
        let client = Client::open(config.url.as_str())?;
        tracing::info!("Cliente Redis inicializado.");
        Ok(Self { client })
    }

    async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await
    }

    /// Incrementa o contador de uma janela fixa.
    /// Retorna (valor após o incremento, segundos restantes da janela).
    pub async fn incr_window(&self, key: &str, window_secs: u64) -> RedisResult<(u64, u64)> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.incr(key, 1u64).await?;
        if count == 1 {
            // primeira requisição da janela: inicia o relógio
            let _: bool = conn.expire(key, window_secs as i64).await?;
        }
        let ttl: i64 = conn.ttl(key).await?;
        let remaining = if ttl > 0 { ttl as u64 } else { window_secs };
        Ok((count, remaining))
    }

    /// Empilha um valor no início da lista (LPUSH).
    pub async fn push(&self, list: &str, value: &str) -> RedisResult<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.lpush(list, value).await?;
        Ok(())
    }

    /// Retira um valor do fim da lista, bloqueando por até `timeout_secs` (BRPOP).
    pub async fn pop_blocking(&self, list: &str, timeout_secs: u64) -> RedisResult<Option<String>> {
        let mut conn = self.connection().await?;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(list)
            .arg(timeout_secs)
            .query_async(&mut conn)
            .await?;
        Ok(popped.map(|(_, value)| value))
    }

    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> RedisResult<()> {
        let mut conn = self.connection().await?;
        if let Some(ttl) = ttl_seconds {
            let _: () = conn.set_ex(key, value, ttl).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key).await
    }

    pub async fn health_check(&self) -> RedisResult<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_does_not_connect() {
        let pool = RedisPool::new(&RedisConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
        });
        assert!(pool.is_ok());
    }

    #[test]
    fn invalid_url_is_rejected() {
        let pool = RedisPool::new(&RedisConfig {
            url: "not a url".to_string(),
        });
        assert!(pool.is_err());
    }

    #[tokio::test]
    #[ignore = "requer Redis em REDIS_URL"]
    async fn window_counter_increments() -> RedisResult<()> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let pool = RedisPool::new(&RedisConfig { url })?;
        let key = format!("catalog:test:{}", uuid::Uuid::new_v4());
        let (first, ttl) = pool.incr_window(&key, 60).await?;
        let (second, _) = pool.incr_window(&key, 60).await?;
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert!(ttl <= 60);
        Ok(())
    }
}
