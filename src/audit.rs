//! Append-only audit trail of admin and funding mutations.
//!
//! `record` is the only write path. There is no update or delete.

use crate::actor::Actor;
use crate::error::Result;
use crate::orm::audit_logs;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::Deserialize;

/// The resource an audit row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub kind: &'static str,
    pub id: i32,
}

impl Resource {
    pub fn new(kind: &'static str, id: i32) -> Self {
        Self { kind, id }
    }
}

/// Append an audit row.
pub async fn record<C>(
    conn: &C,
    actor_id: i32,
    action: &str,
    resource: Resource,
    details: impl Into<String>,
) -> Result<audit_logs::Model, DbErr>
where
    C: ConnectionTrait,
{
    let entry = audit_logs::ActiveModel {
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        resource_type: Set(resource.kind.to_string()),
        resource_id: Set(resource.id),
        details: Set(details.into()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    entry.insert(conn).await.map_err(|e| {
        log::error!("Failed to write audit entry {}: {}", action, e);
        e
    })
}

/// Filters for the audit read side. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<i32>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<i32>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub limit: Option<u64>,
}

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 500;

/// Search the audit log, newest first. Admin only.
pub async fn search<C>(conn: &C, actor: &Actor, query: &AuditQuery) -> Result<Vec<audit_logs::Model>>
where
    C: ConnectionTrait,
{
    actor.require_admin()?;

    let mut select = audit_logs::Entity::find()
        .order_by_desc(audit_logs::Column::CreatedAt)
        .order_by_desc(audit_logs::Column::Id);

    if let Some(actor_id) = query.actor_id {
        select = select.filter(audit_logs::Column::ActorId.eq(actor_id));
    }
    if let Some(action) = &query.action {
        select = select.filter(audit_logs::Column::Action.eq(action.as_str()));
    }
    if let Some(resource_type) = &query.resource_type {
        select = select.filter(audit_logs::Column::ResourceType.eq(resource_type.as_str()));
    }
    if let Some(resource_id) = query.resource_id {
        select = select.filter(audit_logs::Column::ResourceId.eq(resource_id));
    }
    if let Some(since) = query.since {
        select = select.filter(audit_logs::Column::CreatedAt.gte(since));
    }
    if let Some(until) = query.until {
        select = select.filter(audit_logs::Column::CreatedAt.lte(until));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(select.limit(limit).all(conn).await?)
}
