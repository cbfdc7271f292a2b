// src/tasks/queue.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::common::cache::RedisPool;

/// Lista Redis com as tarefas pendentes (LPUSH na ponta do produtor, BRPOP no worker).
pub const QUEUE_KEY: &str = "catalog:tasks";
/// Tarefas que esgotaram as tentativas.
pub const FAILED_KEY: &str = "catalog:tasks:failed";
/// Prefixo dos resultados: `catalog:tasks:result:<id>`.
pub const RESULT_KEY_PREFIX: &str = "catalog:tasks:result:";

pub type TaskId = Uuid;

/// Tarefas conhecidas pelo worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", content = "args", rename_all = "snake_case")]
pub enum Job {
    NotifyNewProduct {
        product_id: Uuid,
        product_name: String,
    },
    BulkUpdateProductStatus {
        product_ids: Vec<Uuid>,
        is_deleted: bool,
    },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::NotifyNewProduct { .. } => "notify_new_product",
            Job::BulkUpdateProductStatus { .. } => "bulk_update_product_status",
        }
    }
}

/// O que de fato trafega na fila: a tarefa mais o controle de tentativas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: TaskId,
    pub job: Job,
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl TaskEnvelope {
    pub fn new(job: Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            attempt: 1,
            enqueued_at: Utc::now(),
        }
    }

    pub fn result_key(&self) -> String {
        format!("{RESULT_KEY_PREFIX}{}", self.id)
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("fila indisponível: {0}")]
    Unavailable(#[from] redis::RedisError),

    #[error("falha ao serializar a tarefa: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("fila recusou a tarefa: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<TaskId, QueueError>;
}

// ---
// Implementação Redis
// ---

#[derive(Clone)]
pub struct RedisTaskQueue {
    cache: RedisPool,
}

impl RedisTaskQueue {
    pub fn new(cache: RedisPool) -> Self {
        Self { cache }
    }

    /// Reenfileira um envelope existente (usado pelo worker nas novas tentativas).
    pub async fn push_envelope(&self, envelope: &TaskEnvelope) -> Result<(), QueueError> {
        let payload = serde_json::to_string(envelope)?;
        self.cache.push(QUEUE_KEY, &payload).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn enqueue(&self, job: Job) -> Result<TaskId, QueueError> {
        let envelope = TaskEnvelope::new(job);
        self.push_envelope(&envelope).await?;
        tracing::debug!(task_id = %envelope.id, task = envelope.job.name(), "Tarefa enfileirada");
        Ok(envelope.id)
    }
}

// ---
// Implementações em memória (testes e desenvolvimento sem Redis)
// ---

/// Guarda as tarefas enfileiradas para inspeção.
#[derive(Clone, Default)]
pub struct InMemoryTaskQueue {
    jobs: Arc<Mutex<Vec<Job>>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, job: Job) -> Result<TaskId, QueueError> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| QueueError::Rejected("fila em memória envenenada".into()))?;
        jobs.push(job);
        Ok(Uuid::new_v4())
    }
}

/// Fila que sempre falha; simula o broker fora do ar.
#[derive(Clone, Default)]
pub struct UnavailableTaskQueue;

#[async_trait]
impl TaskQueue for UnavailableTaskQueue {
    async fn enqueue(&self, _job: Job) -> Result<TaskId, QueueError> {
        Err(QueueError::Rejected("broker indisponível".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_wire_format() {
        let product_id = Uuid::new_v4();
        let envelope = TaskEnvelope::new(Job::NotifyNewProduct {
            product_id,
            product_name: "Laptop".into(),
        });
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["job"]["task"], "notify_new_product");
        assert_eq!(value["job"]["args"]["product_id"], json!(product_id));
        assert_eq!(value["attempt"], 1);

        let back: TaskEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn result_key_contains_task_id() {
        let envelope = TaskEnvelope::new(Job::BulkUpdateProductStatus {
            product_ids: vec![],
            is_deleted: true,
        });
        assert_eq!(envelope.result_key(), format!("catalog:tasks:result:{}", envelope.id));
    }

    #[tokio::test]
    async fn in_memory_queue_records_jobs() {
        let queue = InMemoryTaskQueue::new();
        let job = Job::BulkUpdateProductStatus {
            product_ids: vec![Uuid::new_v4()],
            is_deleted: false,
        };
        queue.enqueue(job.clone()).await.unwrap();
        assert_eq!(queue.jobs(), vec![job]);
    }
}
