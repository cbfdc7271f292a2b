// src/tasks/handlers.rs

//! Corpo das tarefas executadas pelo worker. Não há retentativa aqui: um `Err`
//! devolvido sobe para o worker, que decide se tenta de novo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProductLookup, ProductRepository},
    tasks::queue::Job,
};

/// Resultado estruturado de uma tarefa, gravado em `catalog:tasks:result:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_id: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        notifications_sent: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        updated_count: Option<u64>,
    },
    Error {
        error: String,
        message: String,
        product_id: Uuid,
    },
}

/// Dados da notificação simulada de produto novo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProductNotification {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: String,
    pub formatted_price: String,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
}

/// Recursos que as tarefas usam.
#[derive(Clone)]
pub struct TaskContext {
    pub products: ProductRepository,
}

pub async fn dispatch(job: &Job, ctx: &TaskContext) -> Result<TaskOutcome, AppError> {
    match job {
        Job::NotifyNewProduct {
            product_id,
            product_name,
        } => notify_new_product(&ctx.products, *product_id, product_name, Utc::now()).await,
        Job::BulkUpdateProductStatus {
            product_ids,
            is_deleted,
        } => bulk_update_product_status(&ctx.products, product_ids, *is_deleted).await,
    }
}

/// Procura o produto e registra a notificação (hoje apenas um log).
/// Produto inexistente gera um resultado de erro, não um `Err`.
pub async fn notify_new_product<L>(
    lookup: &L,
    product_id: Uuid,
    product_name: &str,
    now: DateTime<Utc>,
) -> Result<TaskOutcome, AppError>
where
    L: ProductLookup + ?Sized,
{
    tracing::info!(%product_id, product_name, "Iniciando tarefa notify_new_product");

    let product = match lookup.find_product(product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            let message = format!("Product {product_id} not found in database");
            tracing::error!(%product_id, "{}", message);
            return Ok(TaskOutcome::Error {
                error: "product_not_found".into(),
                message,
                product_id,
            });
        }
        Err(e) => {
            tracing::error!(%product_id, product_name, error = %e, "Falha na tarefa notify_new_product");
            return Err(e);
        }
    };

    let notification = NewProductNotification {
        product_id: product.id,
        product_name: product.name.clone(),
        product_price: product.price.to_string(),
        formatted_price: product.formatted_price(),
        is_new: product.is_new(now),
        created_at: product.audit.created_at,
    };
    tracing::info!(
        %product_id,
        payload = %serde_json::to_string(&notification).unwrap_or_default(),
        "Notificação de produto novo registrada"
    );

    Ok(TaskOutcome::Success {
        message: format!("New product notification sent: {}", product.name),
        product_id: Some(product.id),
        product_name: Some(product.name),
        notifications_sent: vec!["log".into()],
        updated_count: None,
    })
}

/// Exclui ou restaura logicamente vários produtos de uma vez.
pub async fn bulk_update_product_status(
    products: &ProductRepository,
    product_ids: &[Uuid],
    is_deleted: bool,
) -> Result<TaskOutcome, AppError> {
    tracing::info!(count = product_ids.len(), is_deleted, "Iniciando atualização de status em lote");

    let changed = products
        .bulk_set_deleted(product_ids, is_deleted)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Falha na atualização em lote"))?;

    // o UPDATE em lote não passa por `ProductHooks::before_update`
    let status = if is_deleted { "desativado" } else { "reativado" };
    for product_id in &changed {
        tracing::info!(%product_id, "Produto {} em lote", status);
    }

    let updated = changed.len() as u64;
    tracing::info!(updated, "Atualização em lote concluída");
    Ok(TaskOutcome::Success {
        message: format!("Updated {updated} products"),
        product_id: None,
        product_name: None,
        notifications_sent: vec![],
        updated_count: Some(updated),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{audit::AuditRecord, product::Product};
    use async_trait::async_trait;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    struct MemoryProducts(HashMap<Uuid, Product>);

    #[async_trait]
    impl ProductLookup for MemoryProducts {
        async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ProductLookup for BrokenStore {
        async fn find_product(&self, _id: Uuid) -> Result<Option<Product>, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("conexão perdida")))
        }
    }

    fn product(created_at: DateTime<Utc>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "MacBook Pro 16\"".into(),
            price: Decimal::new(249999, 2),
            stock: 15,
            category_id: None,
            audit: AuditRecord::new(None, created_at),
        }
    }

    #[tokio::test]
    async fn notifies_existing_product() {
        let now = Utc::now();
        let p = product(now - Duration::days(1));
        let id = p.id;
        let store = MemoryProducts(HashMap::from([(id, p)]));

        let outcome = notify_new_product(&store, id, "MacBook Pro 16\"", now).await.unwrap();

        match outcome {
            TaskOutcome::Success {
                product_id,
                notifications_sent,
                ..
            } => {
                assert_eq!(product_id, Some(id));
                assert_eq!(notifications_sent, vec!["log".to_string()]);
            }
            other => panic!("resultado inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_product_is_a_structured_error() {
        let store = MemoryProducts(HashMap::new());
        let id = Uuid::new_v4();
        let outcome = notify_new_product(&store, id, "Ghost", Utc::now()).await.unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "product_not_found");
        assert_eq!(json["product_id"], serde_json::json!(id));
    }

    #[tokio::test]
    async fn store_failures_propagate_for_retry() {
        let result = notify_new_product(&BrokenStore, Uuid::new_v4(), "x", Utc::now()).await;
        assert!(result.is_err());
    }

    #[test]
    fn success_outcome_shape() {
        let outcome = TaskOutcome::Success {
            message: "ok".into(),
            product_id: None,
            product_name: None,
            notifications_sent: vec![],
            updated_count: Some(3),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["updated_count"], 3);
        assert!(json.get("notifications_sent").is_none());
    }
}
