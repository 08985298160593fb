//! Notification inbox endpoints. Every route acts on the caller's own inbox.

use crate::app_config;
use crate::error::Error;
use crate::middleware::ClientCtx;
use crate::notifications;
use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    // mark-all-read before {id} routes
    conf.service(mark_all_notifications_read)
        .service(view_notifications)
        .service(view_unread_count)
        .service(mark_notification_read)
        .service(mark_notification_unread);
}

#[derive(Deserialize)]
struct InboxQuery {
    #[serde(default)]
    unread: bool,
    limit: Option<u64>,
}

/// GET /notifications - Recent notifications, newest first
#[get("/notifications")]
async fn view_notifications(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<InboxQuery>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let limit = query
        .limit
        .unwrap_or_else(|| app_config::limits().notifications_per_page)
        .max(1);

    let items = notifications::list(db.get_ref(), actor.id, query.unread, limit).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[get("/notifications/unread-count")]
async fn view_unread_count(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let count = notifications::unread_count(db.get_ref(), actor.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

#[post("/notifications/{id}/read")]
async fn mark_notification_read(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let notification = notifications::mark_read(db.get_ref(), actor.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

#[post("/notifications/{id}/unread")]
async fn mark_notification_unread(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let notification =
        notifications::mark_unread(db.get_ref(), actor.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

#[post("/notifications/mark-all-read")]
async fn mark_all_notifications_read(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let updated = notifications::mark_all_read(db.get_ref(), actor.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "updated": updated })))
}
