//! Report submission endpoint

use crate::error::Error;
use crate::middleware::ClientCtx;
use crate::moderation::ReportableRef;
use crate::reports::{self, NewReport};
use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(submit_report);
}

#[derive(Deserialize, Validate)]
struct ReportForm {
    reportable_type: String,
    reportable_id: i32,
    #[validate(length(min = 1, max = 64))]
    reason: String,
    #[validate(length(max = 2000))]
    description: Option<String>,
}

/// POST /reports - Flag a user, project or comment
#[post("/reports")]
async fn submit_report(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<ReportForm>,
) -> Result<HttpResponse, Error> {
    let reporter = client.require_actor()?;
    form.validate()?;

    let form = form.into_inner();
    let target = ReportableRef::parse(&form.reportable_type, form.reportable_id)?;

    let report = reports::submit(
        &db,
        &reporter,
        NewReport {
            target,
            reason: form.reason,
            description: form.description,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(report))
}
