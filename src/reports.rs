//! Report lifecycle: users flag users, projects and comments; admins review,
//! resolve or dismiss the reports.
//!
//! ```text
//! pending ──> reviewing ──> resolved | dismissed
//!    └────────────────────────^
//! ```
//!
//! Resolution is final: `resolved_by`/`resolved_at` are written together on
//! the transition out of pending/reviewing and never change afterwards.

use crate::actor::Actor;
use crate::audit;
use crate::error::{Error, Result};
use crate::moderation::ReportableRef;
use crate::notifications::{self, NotificationType};
use crate::orm::reports;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const MAX_REASON_LENGTH: usize = 64;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub const OPEN: [ReportStatus; 2] = [ReportStatus::Pending, ReportStatus::Reviewing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "reviewing" => Some(Self::Reviewing),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    fn open_strs() -> [&'static str; 2] {
        [Self::Pending.as_str(), Self::Reviewing.as_str()]
    }
}

/// Input for a new report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub target: ReportableRef,
    pub reason: String,
    pub description: Option<String>,
}

/// Number of non-dismissed reports referencing the target.
pub async fn reports_count<C>(conn: &C, target: ReportableRef) -> Result<u64>
where
    C: ConnectionTrait,
{
    Ok(reports::Entity::find()
        .filter(reports::Column::ReportableType.eq(target.kind()))
        .filter(reports::Column::ReportableId.eq(target.id()))
        .filter(reports::Column::Status.ne(ReportStatus::Dismissed.as_str()))
        .count(conn)
        .await?)
}

async fn open_reports_count<C>(conn: &C, target: ReportableRef) -> Result<u64>
where
    C: ConnectionTrait,
{
    Ok(reports::Entity::find()
        .filter(reports::Column::ReportableType.eq(target.kind()))
        .filter(reports::Column::ReportableId.eq(target.id()))
        .filter(reports::Column::Status.is_in(ReportStatus::open_strs()))
        .count(conn)
        .await?)
}

/// Submit a report. Any authenticated user may report.
pub async fn submit(
    db: &DatabaseConnection,
    reporter: &Actor,
    report: NewReport,
) -> Result<reports::Model> {
    let reason = report.reason.trim();
    if reason.is_empty() {
        return Err(Error::Validation("A report reason is required".to_string()));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(Error::Validation(format!(
            "Report reason must be at most {} characters",
            MAX_REASON_LENGTH
        )));
    }
    let description = report
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH)
    {
        return Err(Error::Validation(format!(
            "Report description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }

    let target = report.target;
    let txn = db.begin().await?;

    // Validate that content exists
    if !target.exists(&txn).await? {
        return Err(Error::Validation(format!(
            "Reported {} does not exist",
            target.kind()
        )));
    }

    // Check if user already has an open report for this content
    let existing = reports::Entity::find()
        .filter(reports::Column::ReporterId.eq(reporter.id))
        .filter(reports::Column::ReportableType.eq(target.kind()))
        .filter(reports::Column::ReportableId.eq(target.id()))
        .filter(reports::Column::Status.is_in(ReportStatus::open_strs()))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Error::Validation(
            "You have already reported this content".to_string(),
        ));
    }

    let new_report = reports::ActiveModel {
        reporter_id: Set(reporter.id),
        reportable_type: Set(target.kind().to_string()),
        reportable_id: Set(target.id()),
        reason: Set(reason.to_string()),
        description: Set(description),
        status: Set(ReportStatus::Pending.as_str().to_string()),
        resolved_by: Set(None),
        resolved_at: Set(None),
        resolution_note: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let report = new_report.insert(&txn).await?;

    target.set_reported(&txn, true).await?;

    let admins = notifications::admin_ids(&txn).await?;
    notifications::notify_many(
        &txn,
        &admins,
        NotificationType::ReportSubmitted,
        Some(reporter.id),
        json!({
            "report_id": report.id,
            "resource_type": target.kind(),
            "resource_id": target.id(),
            "reason": report.reason,
        }),
    )
    .await?;

    txn.commit().await?;

    log::info!(
        "Report {} submitted by user {} against {} {}",
        report.id,
        reporter.id,
        target.kind(),
        target.id()
    );

    Ok(report)
}

/// Move a pending report into review.
pub async fn start_review(
    db: &DatabaseConnection,
    admin: &Actor,
    report_id: i32,
) -> Result<reports::Model> {
    admin.require_admin()?;

    let txn = db.begin().await?;

    let report = reports::Entity::find_by_id(report_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound("Report"))?;

    let updated = reports::Entity::update_many()
        .col_expr(
            reports::Column::Status,
            Expr::value(ReportStatus::Reviewing.as_str()),
        )
        .filter(reports::Column::Id.eq(report_id))
        .filter(reports::Column::Status.eq(ReportStatus::Pending.as_str()))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        return Err(match ReportStatus::from_str(&report.status) {
            Some(ReportStatus::Reviewing) => {
                Error::InvalidState("Report is already under review".to_string())
            }
            _ => Error::AlreadyResolved,
        });
    }

    audit::record(
        &txn,
        admin.id,
        "report_reviewing",
        audit::Resource::new("report", report_id),
        "",
    )
    .await?;

    let report = reports::Entity::find_by_id(report_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound("Report"))?;

    txn.commit().await?;

    log::info!("Report {} taken into review by admin {}", report_id, admin.id);

    Ok(report)
}

/// Closes an open report. Shared by `resolve` and `dismiss`.
async fn close(
    db: &DatabaseConnection,
    admin: &Actor,
    report_id: i32,
    outcome: ReportStatus,
    note: Option<&str>,
) -> Result<reports::Model> {
    admin.require_admin()?;

    let (action, notification_type) = match outcome {
        ReportStatus::Resolved => ("report_resolved", NotificationType::ReportResolved),
        ReportStatus::Dismissed => ("report_dismissed", NotificationType::ReportDismissed),
        _ => {
            return Err(Error::InvalidState(format!(
                "{} is not a closing status",
                outcome.as_str()
            )))
        }
    };
    let note = note.map(str::trim).filter(|n| !n.is_empty());

    let txn = db.begin().await?;

    reports::Entity::find_by_id(report_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound("Report"))?;

    // Compare-and-set: only an open report can be closed, and only once.
    let now = Utc::now().naive_utc();
    let updated = reports::Entity::update_many()
        .col_expr(reports::Column::Status, Expr::value(outcome.as_str()))
        .col_expr(reports::Column::ResolvedBy, Expr::value(admin.id))
        .col_expr(reports::Column::ResolvedAt, Expr::value(now))
        .col_expr(
            reports::Column::ResolutionNote,
            Expr::value(note.map(str::to_string)),
        )
        .filter(reports::Column::Id.eq(report_id))
        .filter(reports::Column::Status.is_in(ReportStatus::open_strs()))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        return Err(Error::AlreadyResolved);
    }

    let report = reports::Entity::find_by_id(report_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound("Report"))?;

    // The reported flag stays up only while open reports remain.
    let target = ReportableRef::parse(&report.reportable_type, report.reportable_id)?;
    if open_reports_count(&txn, target).await? == 0 {
        match target.set_reported(&txn, false).await {
            // The reported row may have been deleted since; the report still closes.
            Ok(()) | Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    audit::record(
        &txn,
        admin.id,
        action,
        audit::Resource::new("report", report_id),
        note.unwrap_or_default(),
    )
    .await?;

    notifications::notify(
        &txn,
        report.reporter_id,
        notification_type,
        Some(admin.id),
        json!({
            "report_id": report.id,
            "resource_type": report.reportable_type,
            "resource_id": report.reportable_id,
        }),
    )
    .await?;

    txn.commit().await?;

    log::info!(
        "Report {} {} by admin {}",
        report_id,
        outcome.as_str(),
        admin.id
    );

    Ok(report)
}

/// Resolve a report: the complaint was valid and has been acted on.
pub async fn resolve(
    db: &DatabaseConnection,
    admin: &Actor,
    report_id: i32,
    note: Option<&str>,
) -> Result<reports::Model> {
    close(db, admin, report_id, ReportStatus::Resolved, note).await
}

/// Dismiss a report: no action was warranted.
pub async fn dismiss(
    db: &DatabaseConnection,
    admin: &Actor,
    report_id: i32,
    note: Option<&str>,
) -> Result<reports::Model> {
    close(db, admin, report_id, ReportStatus::Dismissed, note).await
}

/// Fetch a single report. Admin only.
pub async fn get<C>(conn: &C, admin: &Actor, report_id: i32) -> Result<reports::Model>
where
    C: ConnectionTrait,
{
    admin.require_admin()?;

    reports::Entity::find_by_id(report_id)
        .one(conn)
        .await?
        .ok_or(Error::NotFound("Report"))
}

/// List reports, newest first. `None` lists every status. Admin only.
pub async fn list<C>(
    conn: &C,
    admin: &Actor,
    status: Option<ReportStatus>,
    limit: u64,
) -> Result<Vec<reports::Model>>
where
    C: ConnectionTrait,
{
    admin.require_admin()?;

    let mut query = reports::Entity::find()
        .order_by_desc(reports::Column::CreatedAt)
        .order_by_desc(reports::Column::Id);

    if let Some(status) = status {
        query = query.filter(reports::Column::Status.eq(status.as_str()));
    }

    Ok(query.limit(limit).all(conn).await?)
}
