//! Project funding endpoints

use crate::error::Error;
use crate::funding::{self, FundView, FundingRequestView, NewFundingRequest};
use crate::middleware::ClientCtx;
use actix_web::{get, post, web, HttpResponse};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(request_funding)
        .service(verify_funding)
        .service(reject_funding)
        .service(view_funding_requests)
        .service(view_funds)
        .service(view_funding_summary);
}

#[derive(Deserialize, Validate)]
struct FundingRequestForm {
    amount: Decimal,
    #[validate(length(max = 1000))]
    note: Option<String>,
}

#[derive(Deserialize)]
struct DecisionForm {
    request_id: i32,
}

/// POST /projects/{id}/fund/request - Offer funding to a project
#[post("/projects/{id}/fund/request")]
async fn request_funding(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<FundingRequestForm>,
) -> Result<HttpResponse, Error> {
    let funder = client.require_actor()?;
    form.validate()?;

    let form = form.into_inner();
    let request = funding::submit(
        &db,
        &funder,
        path.into_inner(),
        NewFundingRequest {
            amount: form.amount,
            note: form.note,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(FundingRequestView::from(request)))
}

/// POST /projects/{id}/fund/verify - Owner confirms receipt of a pending request
#[post("/projects/{id}/fund/verify")]
async fn verify_funding(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<DecisionForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let request = funding::verify(&db, &actor, path.into_inner(), form.request_id).await?;
    Ok(HttpResponse::Ok().json(FundingRequestView::from(request)))
}

/// POST /projects/{id}/fund/reject - Owner declines a pending request
#[post("/projects/{id}/fund/reject")]
async fn reject_funding(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<DecisionForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let request = funding::reject(&db, &actor, path.into_inner(), form.request_id).await?;
    Ok(HttpResponse::Ok().json(FundingRequestView::from(request)))
}

#[get("/projects/{id}/fund/requests")]
async fn view_funding_requests(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_actor()?;
    let requests: Vec<FundingRequestView> =
        funding::list_requests(db.get_ref(), &actor, path.into_inner())
            .await?
            .into_iter()
            .map(FundingRequestView::from)
            .collect();

    Ok(HttpResponse::Ok().json(requests))
}

/// GET /projects/{id}/funds - The project's ledger
#[get("/projects/{id}/funds")]
async fn view_funds(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    client.require_actor()?;
    let funds: Vec<FundView> = funding::list_funds(db.get_ref(), path.into_inner())
        .await?
        .into_iter()
        .map(FundView::from)
        .collect();

    Ok(HttpResponse::Ok().json(funds))
}

#[get("/projects/{id}/funds/summary")]
async fn view_funding_summary(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    client.require_actor()?;
    let summary = funding::summary(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}
