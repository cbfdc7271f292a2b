// src/tasks/worker.rs

use serde_json::json;
use std::{future::Future, time::Duration};

use crate::{
    common::cache::RedisPool,
    tasks::{
        handlers::{dispatch, TaskContext, TaskOutcome},
        queue::{RedisTaskQueue, TaskEnvelope, FAILED_KEY, QUEUE_KEY},
    },
};

/// Tempo de vida dos resultados gravados no Redis.
const RESULT_TTL_SECS: u64 = 24 * 60 * 60;
/// Quanto o BRPOP espera antes de checar o sinal de parada de novo.
const POLL_TIMEOUT_SECS: u64 = 5;

/// Política de retentativa: até `max_retries` novas tentativas, com os atrasos
/// de `delays` (o último se repete se faltar), e um tempo limite por execução.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delays: Vec<Duration>,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays: vec![
                Duration::from_secs(5),
                Duration::from_secs(15),
                Duration::from_secs(60),
            ],
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Atraso antes da próxima tentativa, dado o número da tentativa que falhou.
    /// `None` quando as retentativas acabaram.
    pub fn delay_after(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt == 0 || failed_attempt > self.max_retries {
            return None;
        }
        let index = (failed_attempt - 1) as usize;
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .or(Some(Duration::ZERO))
    }
}

pub struct Worker {
    cache: RedisPool,
    queue: RedisTaskQueue,
    ctx: TaskContext,
    policy: RetryPolicy,
}

impl Worker {
    pub fn new(cache: RedisPool, ctx: TaskContext, policy: RetryPolicy) -> Self {
        Self {
            queue: RedisTaskQueue::new(cache.clone()),
            cache,
            ctx,
            policy,
        }
    }

    /// Consome a fila até `shutdown` completar.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        tracing::info!(queue = QUEUE_KEY, "Worker aguardando tarefas");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Sinal de parada recebido, encerrando worker");
                    break;
                }
                popped = self.cache.pop_blocking(QUEUE_KEY, POLL_TIMEOUT_SECS) => match popped {
                    Ok(Some(raw)) => self.process(&raw).await,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis indisponível, tentando de novo em instantes");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                },
            }
        }
    }

    async fn process(&self, raw: &str) {
        let envelope: TaskEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, "Tarefa ilegível descartada para a fila de falhas");
                let record = json!({ "raw": raw, "error": e.to_string() });
                self.push_failed(&record.to_string()).await;
                return;
            }
        };

        tracing::info!(
            task_id = %envelope.id,
            task = envelope.job.name(),
            attempt = envelope.attempt,
            "Executando tarefa"
        );

        match tokio::time::timeout(self.policy.timeout, dispatch(&envelope.job, &self.ctx)).await {
            Ok(Ok(outcome)) => self.store_result(&envelope, &outcome).await,
            Ok(Err(e)) => self.retry_or_fail(envelope, e.to_string()).await,
            Err(_) => {
                let reason = format!("tempo limite de {}s excedido", self.policy.timeout.as_secs());
                self.retry_or_fail(envelope, reason).await
            }
        }
    }

    async fn retry_or_fail(&self, mut envelope: TaskEnvelope, reason: String) {
        match self.policy.delay_after(envelope.attempt) {
            Some(delay) => {
                tracing::warn!(
                    task_id = %envelope.id,
                    attempt = envelope.attempt,
                    delay_secs = delay.as_secs(),
                    error = %reason,
                    "Tarefa falhou, reagendando"
                );
                envelope.attempt += 1;
                let queue = self.queue.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = queue.push_envelope(&envelope).await {
                        tracing::error!(task_id = %envelope.id, error = %e, "Falha ao reenfileirar tarefa");
                    }
                });
            }
            None => {
                tracing::error!(
                    task_id = %envelope.id,
                    attempts = envelope.attempt,
                    error = %reason,
                    "Tarefa esgotou as tentativas"
                );
                let record = json!({
                    "envelope": envelope,
                    "error": reason,
                    "failed_at": chrono::Utc::now(),
                });
                self.push_failed(&record.to_string()).await;
            }
        }
    }

    async fn store_result(&self, envelope: &TaskEnvelope, outcome: &TaskOutcome) {
        let Ok(payload) = serde_json::to_string(outcome) else {
            return;
        };
        if let Err(e) = self
            .cache
            .set(&envelope.result_key(), &payload, Some(RESULT_TTL_SECS))
            .await
        {
            tracing::warn!(task_id = %envelope.id, error = %e, "Não foi possível gravar o resultado");
        }
        tracing::info!(task_id = %envelope.id, result = %payload, "Tarefa concluída");
    }

    async fn push_failed(&self, record: &str) {
        if let Err(e) = self.cache.push(FAILED_KEY, record).await {
            tracing::error!(error = %e, "Não foi possível registrar a falha da tarefa");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_backs_off_then_gives_up() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(15)));
        assert_eq!(policy.delay_after(3), Some(Duration::from_secs(60)));
        assert_eq!(policy.delay_after(4), None);
        assert_eq!(policy.timeout, Duration::from_secs(60));
    }

    #[test]
    fn last_delay_repeats_when_list_is_short() {
        let policy = RetryPolicy {
            max_retries: 5,
            delays: vec![Duration::from_secs(1)],
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_after(4), Some(Duration::from_secs(1)));
    }

    #[test]
    fn attempt_zero_never_retries() {
        assert_eq!(RetryPolicy::default().delay_after(0), None);
    }
}
