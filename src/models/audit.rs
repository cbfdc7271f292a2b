// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Metadados de auditoria compartilhados por produtos e categorias:
/// timestamps, autoria e estado de exclusão lógica.
/// Embutido nas entidades com `#[sqlx(flatten)]` + `#[serde(flatten)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditRecord {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuditRecord {
    pub fn new(actor: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// "Ativo" é sempre o inverso de `is_deleted`.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Marca uma alteração. Sem autor (tarefas de sistema), mantém o último.
    pub fn touch(&mut self, actor: Option<Uuid>, now: DateTime<Utc>) {
        self.updated_at = now;
        if actor.is_some() {
            self.updated_by = actor;
        }
    }

    pub fn soft_delete(&mut self, actor: Option<Uuid>, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.touch(actor, now);
    }

    pub fn restore(&mut self, actor: Option<Uuid>, now: DateTime<Utc>) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.touch(actor, now);
    }
}
