//! Admin moderation actions: suspending users and hiding content.
//!
//! Each action checks the actor once, then runs the mutation, its audit row
//! and its notification in one transaction. Repeating an action on a target
//! already in the requested state is a no-op success: nothing is written.

pub mod moderatable;

use crate::actor::Actor;
use crate::audit;
use crate::error::{Error, Result};
use crate::funding::RequestStatus;
use crate::notifications::{self, NotificationType};
use crate::orm::{comments, funding_requests, projects, reports, users};
use crate::reports::ReportStatus;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;

pub use moderatable::{ContentRef, Moderatable, ReportableRef};

pub const MAX_REASON_LENGTH: usize = 500;

fn validate_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::Validation("A reason is required".to_string()));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(Error::Validation(format!(
            "Reason must be at most {} characters",
            MAX_REASON_LENGTH
        )));
    }
    Ok(reason.to_string())
}

/// Writes the audit row and owner notification that follow a committed change.
async fn record_action(
    txn: &DatabaseTransaction,
    admin: &Actor,
    target: ReportableRef,
    owner_id: i32,
    action: NotificationType,
    reason: Option<&str>,
) -> Result<()> {
    audit::record(
        txn,
        admin.id,
        action.as_str(),
        target.resource(),
        reason.unwrap_or_default(),
    )
    .await?;

    notifications::notify(
        txn,
        owner_id,
        action,
        Some(admin.id),
        json!({
            "resource_type": target.kind(),
            "resource_id": target.id(),
            "reason": reason,
        }),
    )
    .await?;

    Ok(())
}

/// Restricts the row unless it already is. The flag flips by compare-and-set,
/// so of two concurrent calls only one reports a change.
async fn apply_restriction<M>(
    txn: &DatabaseTransaction,
    admin: &Actor,
    id: i32,
    reason: &str,
    at: NaiveDateTime,
) -> Result<(M, bool)>
where
    M: Moderatable,
{
    let row: M = moderatable::find(txn, id).await?;
    if row.is_restricted() {
        return Ok((row, false));
    }

    match moderatable::transition::<M, _>(txn, id, false, row.restrict(reason, admin.id, at)).await? {
        Some(row) => Ok((row, true)),
        None => Ok((moderatable::find(txn, id).await?, false)),
    }
}

/// Lifts the restriction unless it is already clear.
async fn lift_restriction<M>(txn: &DatabaseTransaction, id: i32) -> Result<(M, bool)>
where
    M: Moderatable,
{
    let row: M = moderatable::find(txn, id).await?;
    if !row.is_restricted() {
        return Ok((row, false));
    }

    match moderatable::transition::<M, _>(txn, id, true, row.lift()).await? {
        Some(row) => Ok((row, true)),
        None => Ok((moderatable::find(txn, id).await?, false)),
    }
}

// =============================================================================
// User suspension
// =============================================================================

/// Suspend a user account.
pub async fn suspend_user(
    db: &DatabaseConnection,
    admin: &Actor,
    user_id: i32,
    reason: &str,
) -> Result<users::Model> {
    admin.require_admin()?;

    // Prevent suspending yourself
    if admin.id == user_id {
        return Err(Error::SelfAction);
    }
    let reason = validate_reason(reason)?;

    let txn = db.begin().await?;

    let (user, changed) =
        apply_restriction::<users::Model>(&txn, admin, user_id, &reason, Utc::now().naive_utc())
            .await?;
    if !changed {
        log::debug!("User {} already suspended; nothing to do", user_id);
        return Ok(user);
    }

    record_action(
        &txn,
        admin,
        user.target(),
        user.owner_id(),
        NotificationType::UserSuspended,
        Some(&reason),
    )
    .await?;

    txn.commit().await?;

    log::info!("User {} suspended by admin {}: {}", user_id, admin.id, reason);

    Ok(user)
}

/// Lift a user's suspension.
pub async fn unsuspend_user(
    db: &DatabaseConnection,
    admin: &Actor,
    user_id: i32,
) -> Result<users::Model> {
    admin.require_admin()?;

    let txn = db.begin().await?;

    let (user, changed) = lift_restriction::<users::Model>(&txn, user_id).await?;
    if !changed {
        log::debug!("User {} is not suspended; nothing to do", user_id);
        return Ok(user);
    }

    record_action(
        &txn,
        admin,
        user.target(),
        user.owner_id(),
        NotificationType::UserUnsuspended,
        None,
    )
    .await?;

    txn.commit().await?;

    log::info!("User {} unsuspended by admin {}", user_id, admin.id);

    Ok(user)
}

// =============================================================================
// Content hiding
// =============================================================================

/// A project or comment after a moderation action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Project(projects::Model),
    Comment(comments::Model),
}

impl Content {
    pub fn is_hidden(&self) -> bool {
        match self {
            Content::Project(p) => p.is_restricted(),
            Content::Comment(c) => c.is_restricted(),
        }
    }

    fn owner_id(&self) -> i32 {
        match self {
            Content::Project(p) => p.owner_id(),
            Content::Comment(c) => c.owner_id(),
        }
    }
}

/// Hide a project or comment from public view.
pub async fn hide_content(
    db: &DatabaseConnection,
    admin: &Actor,
    content: ContentRef,
    reason: &str,
) -> Result<Content> {
    admin.require_admin()?;
    let reason = validate_reason(reason)?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;

    let (hidden, changed) = match content {
        ContentRef::Project(id) => {
            let (project, changed) =
                apply_restriction::<projects::Model>(&txn, admin, id, &reason, now).await?;
            (Content::Project(project), changed)
        }
        ContentRef::Comment(id) => {
            let (comment, changed) =
                apply_restriction::<comments::Model>(&txn, admin, id, &reason, now).await?;
            (Content::Comment(comment), changed)
        }
    };
    if !changed {
        log::debug!("{:?} already hidden; nothing to do", content);
        return Ok(hidden);
    }

    record_action(
        &txn,
        admin,
        content.into(),
        hidden.owner_id(),
        NotificationType::ContentHidden,
        Some(&reason),
    )
    .await?;

    txn.commit().await?;

    log::info!("{:?} hidden by admin {}: {}", content, admin.id, reason);

    Ok(hidden)
}

/// Make hidden content visible again.
pub async fn unhide_content(
    db: &DatabaseConnection,
    admin: &Actor,
    content: ContentRef,
) -> Result<Content> {
    admin.require_admin()?;

    let txn = db.begin().await?;

    let (visible, changed) = match content {
        ContentRef::Project(id) => {
            let (project, changed) = lift_restriction::<projects::Model>(&txn, id).await?;
            (Content::Project(project), changed)
        }
        ContentRef::Comment(id) => {
            let (comment, changed) = lift_restriction::<comments::Model>(&txn, id).await?;
            (Content::Comment(comment), changed)
        }
    };
    if !changed {
        log::debug!("{:?} is not hidden; nothing to do", content);
        return Ok(visible);
    }

    record_action(
        &txn,
        admin,
        content.into(),
        visible.owner_id(),
        NotificationType::ContentUnhidden,
        None,
    )
    .await?;

    txn.commit().await?;

    log::info!("{:?} unhidden by admin {}", content, admin.id);

    Ok(visible)
}

// =============================================================================
// Admin console
// =============================================================================

/// Queue sizes shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModerationStats {
    pub pending_reports: u64,
    pub reviewing_reports: u64,
    pub suspended_users: u64,
    pub hidden_projects: u64,
    pub hidden_comments: u64,
    pub pending_funding_requests: u64,
}

pub async fn moderation_stats<C>(conn: &C, admin: &Actor) -> Result<ModerationStats>
where
    C: ConnectionTrait,
{
    admin.require_admin()?;

    let pending_reports = reports::Entity::find()
        .filter(reports::Column::Status.eq(ReportStatus::Pending.as_str()))
        .count(conn)
        .await?;
    let reviewing_reports = reports::Entity::find()
        .filter(reports::Column::Status.eq(ReportStatus::Reviewing.as_str()))
        .count(conn)
        .await?;
    let suspended_users = users::Entity::find()
        .filter(users::Column::IsSuspended.eq(true))
        .count(conn)
        .await?;
    let hidden_projects = projects::Entity::find()
        .filter(projects::Column::IsHidden.eq(true))
        .count(conn)
        .await?;
    let hidden_comments = comments::Entity::find()
        .filter(comments::Column::IsHidden.eq(true))
        .count(conn)
        .await?;
    let pending_funding_requests = funding_requests::Entity::find()
        .filter(funding_requests::Column::Status.eq(RequestStatus::Pending.as_str()))
        .count(conn)
        .await?;

    Ok(ModerationStats {
        pending_reports,
        reviewing_reports,
        suspended_users,
        hidden_projects,
        hidden_comments,
        pending_funding_requests,
    })
}
