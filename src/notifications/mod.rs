//! Notification fan-out and recipient-side read tracking.
//!
//! Rows are written through whatever connection the caller holds, so a
//! workflow running inside a transaction enqueues its notifications in that
//! same transaction. Delivery means "visible in the recipient's list".

pub mod types;

use crate::actor::Role;
use crate::error::{Error, Result};
use crate::orm::{notifications, users};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde_json::Value;

pub use types::NotificationType;

/// Create a notification for a user.
///
/// Returns `None` without writing anything when the recipient is the actor
/// who caused the event.
pub async fn notify<C>(
    conn: &C,
    recipient_id: i32,
    notification_type: NotificationType,
    actor_id: Option<i32>,
    metadata: Value,
) -> Result<Option<notifications::Model>, DbErr>
where
    C: ConnectionTrait,
{
    // Don't notify yourself
    if actor_id == Some(recipient_id) {
        return Ok(None);
    }

    let notification = notifications::ActiveModel {
        user_id: Set(recipient_id),
        type_: Set(notification_type.as_str().to_string()),
        actor_id: Set(actor_id),
        metadata: Set(metadata),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    let result = notification.insert(conn).await?;
    log::debug!(
        "Notification {} ({}) queued for user {}",
        result.id,
        notification_type.as_str(),
        recipient_id
    );

    Ok(Some(result))
}

/// Create one notification per distinct recipient. Returns the number written.
pub async fn notify_many<C>(
    conn: &C,
    recipient_ids: &[i32],
    notification_type: NotificationType,
    actor_id: Option<i32>,
    metadata: Value,
) -> Result<usize, DbErr>
where
    C: ConnectionTrait,
{
    let mut recipients = recipient_ids.to_vec();
    recipients.sort_unstable();
    recipients.dedup();

    let mut sent = 0;
    for recipient_id in recipients {
        if notify(conn, recipient_id, notification_type, actor_id, metadata.clone())
            .await?
            .is_some()
        {
            sent += 1;
        }
    }

    Ok(sent)
}

/// Ids of every admin account.
pub async fn admin_ids<C>(conn: &C) -> Result<Vec<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let admins = users::Entity::find()
        .filter(users::Column::Role.eq(Role::Admin.as_str()))
        .all(conn)
        .await?;

    Ok(admins.iter().map(|u| u.id).collect())
}

/// Count unread notifications for a user
pub async fn unread_count<C>(conn: &C, user_id: i32) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::IsRead.eq(false))
        .count(conn)
        .await
}

/// Fetch recent notifications for a user, newest first.
pub async fn list<C>(
    conn: &C,
    user_id: i32,
    unread_only: bool,
    limit: u64,
) -> Result<Vec<notifications::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .order_by_desc(notifications::Column::CreatedAt)
        .order_by_desc(notifications::Column::Id)
        .limit(limit);

    if unread_only {
        query = query.filter(notifications::Column::IsRead.eq(false));
    }

    query.all(conn).await
}

/// Loads a notification only if `user_id` is its recipient.
async fn find_owned<C>(conn: &C, user_id: i32, notification_id: i32) -> Result<notifications::Model>
where
    C: ConnectionTrait,
{
    notifications::Entity::find_by_id(notification_id)
        .filter(notifications::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or(Error::NotFound("Notification"))
}

/// Mark a notification as read. Already-read notifications keep their `read_at`.
pub async fn mark_read<C>(
    conn: &C,
    user_id: i32,
    notification_id: i32,
) -> Result<notifications::Model>
where
    C: ConnectionTrait,
{
    let notification = find_owned(conn, user_id, notification_id).await?;
    if notification.is_read {
        return Ok(notification);
    }

    let mut active: notifications::ActiveModel = notification.into();
    active.is_read = Set(true);
    active.read_at = Set(Some(Utc::now().naive_utc()));
    Ok(active.update(conn).await?)
}

/// Mark a notification as unread again.
pub async fn mark_unread<C>(
    conn: &C,
    user_id: i32,
    notification_id: i32,
) -> Result<notifications::Model>
where
    C: ConnectionTrait,
{
    let notification = find_owned(conn, user_id, notification_id).await?;
    if !notification.is_read {
        return Ok(notification);
    }

    let mut active: notifications::ActiveModel = notification.into();
    active.is_read = Set(false);
    active.read_at = Set(None);
    Ok(active.update(conn).await?)
}

/// Mark all notifications as read for a user. Returns how many changed.
pub async fn mark_all_read<C>(conn: &C, user_id: i32) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let result = notifications::Entity::update_many()
        .col_expr(notifications::Column::IsRead, Expr::value(true))
        .col_expr(
            notifications::Column::ReadAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::IsRead.eq(false))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
