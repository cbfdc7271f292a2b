//! Catálogo de produtos: API REST (`/api/v1`), páginas HTML renderizadas no
//! servidor, hooks de mutação explícitos e fila de tarefas em Redis.

pub mod app;
pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pages;
pub mod services;
pub mod tasks;
