//! Funding requests and the funding ledger.
//!
//! A funder offers an amount to a project; the project owner verifies or
//! rejects the offer. Verification is the only way money enters the ledger:
//! within one transaction the request flips to `verified`, a `funds` row is
//! written and the project's running total is incremented. Terminal states
//! never change again.
//!
//! Amounts travel as `Decimal` with at most two fractional digits and are
//! stored as integer cents.

use crate::actor::Actor;
use crate::audit::{self, Resource};
use crate::error::{Error, Result};
use crate::notifications::{self, NotificationType};
use crate::orm::{funding_requests, funds, projects};
use chrono::{NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const MAX_NOTE_LENGTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Verified,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Converts a positive amount with at most two decimal places into cents.
pub fn amount_to_cents(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation("Amount must be greater than zero".to_string()));
    }
    if amount.normalize().scale() > 2 {
        return Err(Error::Validation(
            "Amount cannot have more than two decimal places".to_string(),
        ));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| Error::Validation("Amount is too large".to_string()))
}

pub fn cents_to_amount(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// JSON shape of a funding request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingRequestView {
    pub id: i32,
    pub project_id: i32,
    pub funder_id: i32,
    pub amount: Decimal,
    pub note: Option<String>,
    pub status: String,
    pub verifier_id: Option<i32>,
    pub verified_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<funding_requests::Model> for FundingRequestView {
    fn from(r: funding_requests::Model) -> Self {
        Self {
            id: r.id,
            project_id: r.project_id,
            funder_id: r.funder_id,
            amount: cents_to_amount(r.amount_cents),
            note: r.note,
            status: r.status,
            verifier_id: r.verifier_id,
            verified_at: r.verified_at,
            created_at: r.created_at,
        }
    }
}

/// JSON shape of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundView {
    pub id: i32,
    pub project_id: i32,
    pub funder_id: i32,
    pub funding_request_id: i32,
    pub amount: Decimal,
    pub funded_at: NaiveDateTime,
}

impl From<funds::Model> for FundView {
    fn from(f: funds::Model) -> Self {
        Self {
            id: f.id,
            project_id: f.project_id,
            funder_id: f.funder_id,
            funding_request_id: f.funding_request_id,
            amount: cents_to_amount(f.amount_cents),
            funded_at: f.funded_at,
        }
    }
}

/// Input for a new funding request.
#[derive(Debug, Clone)]
pub struct NewFundingRequest {
    pub amount: Decimal,
    pub note: Option<String>,
}

async fn find_project<C>(conn: &C, project_id: i32) -> Result<projects::Model>
where
    C: ConnectionTrait,
{
    projects::Entity::find_by_id(project_id)
        .one(conn)
        .await?
        .ok_or(Error::NotFound("Project"))
}

/// Submit a funding request against a project.
pub async fn submit(
    db: &DatabaseConnection,
    funder: &Actor,
    project_id: i32,
    request: NewFundingRequest,
) -> Result<funding_requests::Model> {
    let amount_cents = amount_to_cents(request.amount)?;
    let note = request
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if note
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH)
    {
        return Err(Error::Validation(format!(
            "Note must be at most {} characters",
            MAX_NOTE_LENGTH
        )));
    }

    let txn = db.begin().await?;

    // Row lock serializes submits on one project, so the pending check below holds.
    let project = projects::Entity::find_by_id(project_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(Error::NotFound("Project"))?;

    let pending = funding_requests::Entity::find()
        .filter(funding_requests::Column::ProjectId.eq(project_id))
        .filter(funding_requests::Column::FunderId.eq(funder.id))
        .filter(funding_requests::Column::Status.eq(RequestStatus::Pending.as_str()))
        .one(&txn)
        .await?;
    if pending.is_some() {
        return Err(Error::DuplicatePending);
    }

    let new_request = funding_requests::ActiveModel {
        project_id: Set(project_id),
        funder_id: Set(funder.id),
        amount_cents: Set(amount_cents),
        note: Set(note),
        status: Set(RequestStatus::Pending.as_str().to_string()),
        verifier_id: Set(None),
        verified_at: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let created = new_request.insert(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicatePending,
        _ => Error::from(e),
    })?;

    audit::record(
        &txn,
        funder.id,
        "funding_requested",
        Resource::new("funding_request", created.id),
        format!("project {} amount {}", project_id, cents_to_amount(amount_cents)),
    )
    .await?;

    notifications::notify(
        &txn,
        project.owner_id,
        NotificationType::FundingRequested,
        Some(funder.id),
        json!({
            "funding_request_id": created.id,
            "project_id": project_id,
            "amount": cents_to_amount(amount_cents).to_string(),
        }),
    )
    .await?;

    txn.commit().await?;

    log::info!(
        "Funding request {} for {} submitted by user {} on project {}",
        created.id,
        cents_to_amount(amount_cents),
        funder.id,
        project_id
    );

    Ok(created)
}

/// Loads a request on a project and checks the actor owns the project.
async fn load_for_decision(
    txn: &DatabaseTransaction,
    actor: &Actor,
    project_id: i32,
    request_id: i32,
) -> Result<(projects::Model, funding_requests::Model)> {
    let request = funding_requests::Entity::find_by_id(request_id)
        .filter(funding_requests::Column::ProjectId.eq(project_id))
        .one(txn)
        .await?
        .ok_or(Error::NotFound("Funding request"))?;

    let project = find_project(txn, project_id).await?;
    actor.require_owner(project.owner_id)?;

    Ok((project, request))
}

/// Compare-and-set a pending request into a terminal state.
async fn decide(
    txn: &DatabaseTransaction,
    actor: &Actor,
    request: &funding_requests::Model,
    outcome: RequestStatus,
    at: NaiveDateTime,
) -> Result<()> {
    let updated = funding_requests::Entity::update_many()
        .col_expr(funding_requests::Column::Status, Expr::value(outcome.as_str()))
        .col_expr(funding_requests::Column::VerifierId, Expr::value(actor.id))
        .col_expr(funding_requests::Column::VerifiedAt, Expr::value(at))
        .filter(funding_requests::Column::Id.eq(request.id))
        .filter(funding_requests::Column::Status.eq(RequestStatus::Pending.as_str()))
        .exec(txn)
        .await?;

    if updated.rows_affected == 0 {
        // Re-read so a concurrent decision reports its real outcome.
        let current = funding_requests::Entity::find_by_id(request.id)
            .one(txn)
            .await?
            .map(|r| r.status)
            .unwrap_or_else(|| request.status.clone());
        log::warn!(
            "User {} tried to {} funding request {} which is {}",
            actor.id,
            outcome.as_str(),
            request.id,
            current
        );
        return Err(Error::InvalidState(format!(
            "Funding request is already {}",
            current
        )));
    }

    Ok(())
}

async fn reload(txn: &DatabaseTransaction, request_id: i32) -> Result<funding_requests::Model> {
    funding_requests::Entity::find_by_id(request_id)
        .one(txn)
        .await?
        .ok_or(Error::NotFound("Funding request"))
}

/// Verify a pending request: credit the ledger and the project total.
///
/// All writes share one transaction. If any of them fails the request stays
/// pending and no ledger entry exists.
pub async fn verify(
    db: &DatabaseConnection,
    actor: &Actor,
    project_id: i32,
    request_id: i32,
) -> Result<funding_requests::Model> {
    let txn = db.begin().await?;

    let (project, request) = load_for_decision(&txn, actor, project_id, request_id).await?;
    let now = Utc::now().naive_utc();

    decide(&txn, actor, &request, RequestStatus::Verified, now).await?;

    let fund = funds::ActiveModel {
        project_id: Set(project.id),
        funder_id: Set(request.funder_id),
        funding_request_id: Set(request.id),
        amount_cents: Set(request.amount_cents),
        funded_at: Set(now),
        ..Default::default()
    };
    let fund = fund.insert(&txn).await?;

    projects::Entity::update_many()
        .col_expr(
            projects::Column::CurrentFundingCents,
            Expr::col(projects::Column::CurrentFundingCents).add(request.amount_cents),
        )
        .filter(projects::Column::Id.eq(project.id))
        .exec(&txn)
        .await?;

    audit::record(
        &txn,
        actor.id,
        "funding_verified",
        Resource::new("funding_request", request.id),
        format!("fund {} amount {}", fund.id, cents_to_amount(fund.amount_cents)),
    )
    .await?;

    notifications::notify(
        &txn,
        request.funder_id,
        NotificationType::FundingVerified,
        Some(actor.id),
        json!({
            "funding_request_id": request.id,
            "project_id": project.id,
            "amount": cents_to_amount(request.amount_cents).to_string(),
        }),
    )
    .await?;

    let request = reload(&txn, request_id).await?;

    txn.commit().await?;

    log::info!(
        "Funding request {} verified by user {}; project {} credited {}",
        request.id,
        actor.id,
        project.id,
        cents_to_amount(request.amount_cents)
    );

    Ok(request)
}

/// Reject a pending request. The ledger and project total are untouched.
pub async fn reject(
    db: &DatabaseConnection,
    actor: &Actor,
    project_id: i32,
    request_id: i32,
) -> Result<funding_requests::Model> {
    let txn = db.begin().await?;

    let (project, request) = load_for_decision(&txn, actor, project_id, request_id).await?;

    decide(
        &txn,
        actor,
        &request,
        RequestStatus::Rejected,
        Utc::now().naive_utc(),
    )
    .await?;

    audit::record(
        &txn,
        actor.id,
        "funding_rejected",
        Resource::new("funding_request", request.id),
        format!("amount {}", cents_to_amount(request.amount_cents)),
    )
    .await?;

    notifications::notify(
        &txn,
        request.funder_id,
        NotificationType::FundingRejected,
        Some(actor.id),
        json!({
            "funding_request_id": request.id,
            "project_id": project.id,
            "amount": cents_to_amount(request.amount_cents).to_string(),
        }),
    )
    .await?;

    let request = reload(&txn, request_id).await?;

    txn.commit().await?;

    log::info!("Funding request {} rejected by user {}", request.id, actor.id);

    Ok(request)
}

/// Funding requests on a project. The owner and admins see every request;
/// anyone else sees only their own.
pub async fn list_requests<C>(
    conn: &C,
    actor: &Actor,
    project_id: i32,
) -> Result<Vec<funding_requests::Model>>
where
    C: ConnectionTrait,
{
    let project = find_project(conn, project_id).await?;

    let mut query = funding_requests::Entity::find()
        .filter(funding_requests::Column::ProjectId.eq(project_id))
        .order_by_desc(funding_requests::Column::CreatedAt)
        .order_by_desc(funding_requests::Column::Id);

    if actor.id != project.owner_id && !actor.is_admin() {
        query = query.filter(funding_requests::Column::FunderId.eq(actor.id));
    }

    Ok(query.all(conn).await?)
}

/// Ledger entries for a project, oldest first.
pub async fn list_funds<C>(conn: &C, project_id: i32) -> Result<Vec<funds::Model>>
where
    C: ConnectionTrait,
{
    find_project(conn, project_id).await?;

    Ok(funds::Entity::find()
        .filter(funds::Column::ProjectId.eq(project_id))
        .order_by_asc(funds::Column::FundedAt)
        .order_by_asc(funds::Column::Id)
        .all(conn)
        .await?)
}

/// Running total next to the ledger sum, for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingSummary {
    pub project_id: i32,
    pub current_funding: Decimal,
    pub ledger_total: Decimal,
    pub funds_count: usize,
}

impl FundingSummary {
    pub fn is_balanced(&self) -> bool {
        self.current_funding == self.ledger_total
    }
}

pub async fn summary<C>(conn: &C, project_id: i32) -> Result<FundingSummary>
where
    C: ConnectionTrait,
{
    let project = find_project(conn, project_id).await?;
    let entries = list_funds(conn, project_id).await?;
    let ledger_cents: i64 = entries.iter().map(|f| f.amount_cents).sum();

    let summary = FundingSummary {
        project_id,
        current_funding: cents_to_amount(project.current_funding_cents),
        ledger_total: cents_to_amount(ledger_cents),
        funds_count: entries.len(),
    };

    if !summary.is_balanced() {
        log::error!(
            "Project {} funding total {} does not match ledger {}",
            project_id,
            summary.current_funding,
            summary.ledger_total
        );
    }

    Ok(summary)
}
