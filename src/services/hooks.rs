// src/services/hooks.rs

//! Callbacks executados ao redor das gravações de produtos e contas.
//! Nenhum deles pode desfazer a gravação: erros são registrados no log e
//! a operação principal segue.

use std::sync::Arc;
use thiserror::Error;

use crate::{
    db::{ProductLookup, ProfileRepository},
    models::{auth::User, product::Product, profile::UserProfile},
    tasks::queue::{Job, QueueError, TaskQueue},
};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("falha ao agendar tarefa: {0}")]
    Queue(#[from] QueueError),
}

/// Evento entregue aos callbacks pós-gravação.
#[derive(Debug, Clone, Copy)]
pub enum ProductSaved<'a> {
    Created(&'a Product),
    Updated(&'a Product),
}

impl<'a> ProductSaved<'a> {
    pub fn product(&self) -> &'a Product {
        match self {
            ProductSaved::Created(p) | ProductSaved::Updated(p) => p,
        }
    }
}

/// Callbacks pós-gravação, executados nesta ordem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSaveCallback {
    ScheduleNotification,
    RefreshSearchIndex,
}

pub const POST_SAVE_CALLBACKS: &[PostSaveCallback] = &[
    PostSaveCallback::ScheduleNotification,
    PostSaveCallback::RefreshSearchIndex,
];

/// Mudança relevante detectada antes de uma atualização.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

#[derive(Clone)]
pub struct ProductHooks {
    queue: Arc<dyn TaskQueue>,
}

impl ProductHooks {
    pub fn new(queue: Arc<dyn TaskQueue>) -> Self {
        Self { queue }
    }

    /// Compara o produto gravado com a versão que vai substituí-lo (preço e
    /// exclusão lógica) e registra as diferenças. Nunca falha.
    pub async fn before_update<L>(&self, lookup: &L, incoming: &Product) -> Vec<FieldChange>
    where
        L: ProductLookup + ?Sized,
    {
        let previous = match lookup.find_product(incoming.id).await {
            Ok(Some(previous)) => previous,
            Ok(None) => {
                tracing::warn!(
                    product_id = %incoming.id,
                    "Produto não encontrado antes da atualização; possível condição de corrida"
                );
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(product_id = %incoming.id, error = %e, "Erro ao comparar alterações do produto");
                return Vec::new();
            }
        };

        let changes = diff(&previous, incoming);
        for change in &changes {
            if change.field == "is_deleted" {
                let status = if incoming.audit.is_deleted { "desativado" } else { "reativado" };
                tracing::info!(product_id = %incoming.id, "Produto {}", status);
            } else {
                tracing::info!(
                    product_id = %incoming.id,
                    field = change.field,
                    old = %change.old,
                    new = %change.new,
                    "Alteração de produto"
                );
            }
        }
        changes
    }

    /// Executa todos os callbacks pós-gravação; falhas ficam no log.
    pub async fn after_save(&self, event: ProductSaved<'_>) {
        for callback in POST_SAVE_CALLBACKS {
            if let Err(e) = self.run(*callback, event).await {
                tracing::error!(
                    product_id = %event.product().id,
                    callback = ?callback,
                    error = %e,
                    "Callback pós-gravação falhou"
                );
            }
        }
    }

    async fn run(&self, callback: PostSaveCallback, event: ProductSaved<'_>) -> Result<(), HookError> {
        match (callback, event) {
            (PostSaveCallback::ScheduleNotification, ProductSaved::Created(product)) => {
                let task_id = self
                    .queue
                    .enqueue(Job::NotifyNewProduct {
                        product_id: product.id,
                        product_name: product.name.clone(),
                    })
                    .await?;
                tracing::info!(product_id = %product.id, %task_id, "Notificação de produto novo agendada");
                Ok(())
            }
            (PostSaveCallback::ScheduleNotification, ProductSaved::Updated(_)) => Ok(()),
            (PostSaveCallback::RefreshSearchIndex, event) => {
                // sem motor de busca: só registra
                tracing::debug!(product_id = %event.product().id, "Índice de busca atualizado");
                Ok(())
            }
        }
    }

    /// Remoção física (só acontece pelo `manage`).
    pub fn after_delete(&self, product: &Product) {
        tracing::info!(product_id = %product.id, name = %product.name, "Produto removido fisicamente");
    }
}

fn diff(previous: &Product, incoming: &Product) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if previous.price != incoming.price {
        changes.push(FieldChange {
            field: "price",
            old: previous.price.to_string(),
            new: incoming.price.to_string(),
        });
    }
    if previous.audit.is_deleted != incoming.audit.is_deleted {
        changes.push(FieldChange {
            field: "is_deleted",
            old: previous.audit.is_deleted.to_string(),
            new: incoming.audit.is_deleted.to_string(),
        });
    }
    changes
}

#[derive(Clone)]
pub struct AccountHooks {
    profiles: ProfileRepository,
}

impl AccountHooks {
    pub fn new(profiles: ProfileRepository) -> Self {
        Self { profiles }
    }

    /// Cria o perfil da conta recém-gravada. Se falhar, a conta continua
    /// existindo e o erro fica apenas no log.
    pub async fn after_user_created(&self, user: &User) -> Option<UserProfile> {
        match self.profiles.create_for_user(self.profiles.pool(), user.id).await {
            Ok(profile) => {
                tracing::info!(user_id = %user.id, username = %user.username, "Perfil criado para o usuário");
                Some(profile)
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, username = %user.username, error = %e, "Falha ao criar o perfil do usuário");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::error::AppError,
        models::audit::AuditRecord,
        tasks::queue::{InMemoryTaskQueue, UnavailableTaskQueue},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use uuid::Uuid;

    struct MemoryProducts(HashMap<Uuid, Product>);

    #[async_trait]
    impl ProductLookup for MemoryProducts {
        async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl ProductLookup for FailingLookup {
        async fn find_product(&self, _id: Uuid) -> Result<Option<Product>, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("timeout")))
        }
    }

    fn product(price: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Wireless Mouse".into(),
            price: Decimal::new(price, 2),
            stock: 100,
            category_id: None,
            audit: AuditRecord::new(None, Utc::now()),
        }
    }

    #[tokio::test]
    async fn creation_enqueues_exactly_one_notification() {
        let queue = InMemoryTaskQueue::new();
        let hooks = ProductHooks::new(Arc::new(queue.clone()));
        let p = product(2999);

        hooks.after_save(ProductSaved::Created(&p)).await;

        assert_eq!(
            queue.jobs(),
            vec![Job::NotifyNewProduct {
                product_id: p.id,
                product_name: p.name.clone(),
            }]
        );
    }

    #[tokio::test]
    async fn updates_enqueue_nothing() {
        let queue = InMemoryTaskQueue::new();
        let hooks = ProductHooks::new(Arc::new(queue.clone()));
        hooks.after_save(ProductSaved::Updated(&product(2999))).await;
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn unavailable_queue_does_not_propagate() {
        let hooks = ProductHooks::new(Arc::new(UnavailableTaskQueue));
        // só precisa retornar normalmente
        hooks.after_save(ProductSaved::Created(&product(2999))).await;
    }

    #[tokio::test]
    async fn before_update_reports_price_and_status_changes() {
        let hooks = ProductHooks::new(Arc::new(InMemoryTaskQueue::new()));
        let stored = product(2999);
        let mut incoming = stored.clone();
        incoming.price = Decimal::new(2499, 2);
        incoming.audit.soft_delete(None, Utc::now());
        let lookup = MemoryProducts(HashMap::from([(stored.id, stored)]));

        let changes = hooks.before_update(&lookup, &incoming).await;

        let fields: Vec<_> = changes.iter().map(|c| c.field).collect();
        assert_eq!(fields, vec!["price", "is_deleted"]);
        assert_eq!(changes[0].old, "29.99");
        assert_eq!(changes[0].new, "24.99");
    }

    #[tokio::test]
    async fn before_update_swallows_missing_rows_and_errors() {
        let hooks = ProductHooks::new(Arc::new(InMemoryTaskQueue::new()));
        let incoming = product(100);
        let empty = MemoryProducts(HashMap::new());
        assert!(hooks.before_update(&empty, &incoming).await.is_empty());
        assert!(hooks.before_update(&FailingLookup, &incoming).await.is_empty());
    }

    #[test]
    fn stock_only_changes_are_not_tracked() {
        let stored = product(500);
        let mut incoming = stored.clone();
        incoming.stock = 1;
        assert!(diff(&stored, &incoming).is_empty());
    }
}
