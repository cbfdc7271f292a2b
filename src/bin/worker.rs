// src/bin/worker.rs

//! Consome a fila `catalog:tasks` no Redis: notificações de novos produtos e
//! atualizações de status em lote.

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use catalog::{
    config::AppState,
    db::ProductRepository,
    tasks::{
        handlers::TaskContext,
        worker::{RetryPolicy, Worker},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    let Some(cache) = app_state.cache.clone() else {
        bail!("O worker precisa de REDIS_URL configurada");
    };

    let ctx = TaskContext {
        products: ProductRepository::new(app_state.db_pool.clone()),
    };
    let worker = Worker::new(cache, ctx, RetryPolicy::default());

    worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Falha ao escutar o sinal de parada: {}", e);
            }
        })
        .await;

    Ok(())
}
