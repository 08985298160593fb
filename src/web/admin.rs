//! Administration and moderation tools
//!
//! Every route here requires an admin session.

use crate::app_config;
use crate::audit::{self, AuditQuery};
use crate::error::Error;
use crate::middleware::ClientCtx;
use crate::moderation::{self, ContentRef};
use crate::reports::{self, ReportStatus};
use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_reports)
        .service(view_moderation_stats)
        .service(view_report)
        .service(review_report)
        .service(resolve_report)
        .service(dismiss_report)
        .service(suspend_user)
        .service(unsuspend_user)
        .service(hide_content)
        .service(unhide_content)
        .service(view_audit_logs);
}

#[derive(Deserialize)]
struct ReportListQuery {
    status: Option<String>,
    limit: Option<u64>,
}

#[derive(Deserialize, Validate)]
struct ResolutionForm {
    #[validate(length(max = 2000))]
    note: Option<String>,
}

#[derive(Deserialize, Validate)]
struct ReasonForm {
    #[validate(length(min = 1, max = 500))]
    reason: String,
}

/// Parses the `{projects|comments}` path segment.
fn content_ref(kind: &str, id: i32) -> Result<ContentRef, Error> {
    match kind {
        "projects" => Ok(ContentRef::Project(id)),
        "comments" => Ok(ContentRef::Comment(id)),
        _ => Err(Error::NotFound("Content")),
    }
}

/// Optional resolution note; an empty body means no note.
fn resolution_note(form: &Option<web::Json<ResolutionForm>>) -> Result<Option<&str>, Error> {
    match form {
        Some(form) => {
            form.validate()?;
            Ok(form.note.as_deref())
        }
        None => Ok(None),
    }
}

// =============================================================================
// Reports
// =============================================================================

/// GET /admin/moderation/reports - Report queue, optionally filtered by status
#[get("/admin/moderation/reports")]
async fn view_reports(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ReportListQuery>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;

    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            ReportStatus::from_str(s)
                .ok_or_else(|| Error::Validation(format!("Invalid report status: {}", s)))?,
        ),
    };
    let limit = query
        .limit
        .unwrap_or_else(|| app_config::limits().reports_per_page)
        .max(1);

    let reports = reports::list(db.get_ref(), &admin, status, limit).await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// GET /admin/moderation/stats - Queue sizes for the dashboard
#[get("/admin/moderation/stats")]
async fn view_moderation_stats(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let stats = moderation::moderation_stats(db.get_ref(), &admin).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/admin/moderation/reports/{id}")]
async fn view_report(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let report = reports::get(db.get_ref(), &admin, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[post("/admin/moderation/reports/{id}/review")]
async fn review_report(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let report = reports::start_review(&db, &admin, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[post("/admin/moderation/reports/{id}/resolve")]
async fn resolve_report(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: Option<web::Json<ResolutionForm>>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let note = resolution_note(&form)?;
    let report = reports::resolve(&db, &admin, path.into_inner(), note).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[post("/admin/moderation/reports/{id}/dismiss")]
async fn dismiss_report(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: Option<web::Json<ResolutionForm>>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let note = resolution_note(&form)?;
    let report = reports::dismiss(&db, &admin, path.into_inner(), note).await?;
    Ok(HttpResponse::Ok().json(report))
}

// =============================================================================
// Users
// =============================================================================

#[post("/admin/moderation/users/{id}/suspend")]
async fn suspend_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<ReasonForm>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    form.validate()?;

    let user = moderation::suspend_user(&db, &admin, path.into_inner(), &form.reason).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/admin/moderation/users/{id}/unsuspend")]
async fn unsuspend_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let user = moderation::unsuspend_user(&db, &admin, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

// =============================================================================
// Projects and comments
// =============================================================================

#[post("/admin/moderation/{kind}/{id}/hide")]
async fn hide_content(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
    form: web::Json<ReasonForm>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let (kind, id) = path.into_inner();
    let target = content_ref(&kind, id)?;
    form.validate()?;

    let content = moderation::hide_content(&db, &admin, target, &form.reason).await?;
    Ok(HttpResponse::Ok().json(content))
}

#[post("/admin/moderation/{kind}/{id}/unhide")]
async fn unhide_content(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;
    let (kind, id) = path.into_inner();
    let target = content_ref(&kind, id)?;

    let content = moderation::unhide_content(&db, &admin, target).await?;
    Ok(HttpResponse::Ok().json(content))
}

// =============================================================================
// Audit log
// =============================================================================

/// GET /admin/audit-logs - Search the audit trail
#[get("/admin/audit-logs")]
async fn view_audit_logs(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, Error> {
    let admin = client.require_admin()?;

    let mut query = query.into_inner();
    if query.limit.is_none() {
        query.limit = Some(app_config::limits().audit_log_per_page);
    }

    let entries = audit::search(db.get_ref(), &admin, &query).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_ref_from_path() {
        assert_eq!(content_ref("projects", 4).unwrap(), ContentRef::Project(4));
        assert_eq!(content_ref("comments", 9).unwrap(), ContentRef::Comment(9));
        assert!(matches!(
            content_ref("users", 1),
            Err(Error::NotFound(_))
        ));
    }
}
