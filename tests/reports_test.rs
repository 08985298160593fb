/// Integration tests for the report lifecycle
mod common;

use common::{database::*, fixtures::*};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use unicollab::error::Error;
use unicollab::moderation::ReportableRef;
use unicollab::orm::{audit_logs, notifications, projects, users};
use unicollab::reports::{self, NewReport, ReportStatus};

fn report(target: ReportableRef, reason: &str) -> NewReport {
    NewReport {
        target,
        reason: reason.to_string(),
        description: Some("Details for the moderators".to_string()),
    }
}

async fn project_reported(db: &DatabaseConnection, project_id: i32) -> bool {
    projects::Entity::find_by_id(project_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .is_reported
}

#[actix_rt::test]
async fn test_submit_report_flags_target_and_notifies_admins() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin_a = create_test_admin(&db, "admin_a").await.unwrap();
    let admin_b = create_test_admin(&db, "admin_b").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let project = create_test_project(&db, owner.id, "Project").await.unwrap();

    let created = reports::submit(
        &db,
        &actor(&reporter),
        report(ReportableRef::Project(project.id), "spam"),
    )
    .await
    .expect("Failed to submit report");

    assert_eq!(created.status, "pending");
    assert_eq!(created.reporter_id, reporter.id);
    assert_eq!(created.reportable_type, "project");
    assert_eq!(created.resolved_by, None);
    assert!(project_reported(&db, project.id).await);

    for admin in [&admin_a, &admin_b] {
        let notes = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(admin.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].type_, "report_submitted");
        assert_eq!(notes[0].metadata["report_id"], created.id);
    }

    let count = reports::reports_count(&db, ReportableRef::Project(project.id))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[actix_rt::test]
async fn test_submit_report_validation() {
    let db = setup_test_database().await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let target = create_test_user(&db, "target").await.unwrap();

    let blank = reports::submit(&db, &actor(&reporter), report(ReportableRef::User(target.id), "  ")).await;
    assert!(matches!(blank, Err(Error::Validation(_))));

    let long = "x".repeat(reports::MAX_REASON_LENGTH + 1);
    let too_long = reports::submit(&db, &actor(&reporter), report(ReportableRef::User(target.id), &long)).await;
    assert!(matches!(too_long, Err(Error::Validation(_))));

    let missing = reports::submit(&db, &actor(&reporter), report(ReportableRef::Comment(9_999), "spam")).await;
    assert!(matches!(missing, Err(Error::Validation(_))));

    assert!(ReportableRef::parse("thread", 1).is_err());

    reports::submit(&db, &actor(&reporter), report(ReportableRef::User(target.id), "harassment"))
        .await
        .unwrap();
    let duplicate = reports::submit(&db, &actor(&reporter), report(ReportableRef::User(target.id), "again")).await;
    assert!(matches!(duplicate, Err(Error::Validation(_))));
}

#[actix_rt::test]
async fn test_resolve_sets_resolution_once() {
    let db = setup_test_database().await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let project = create_test_project(&db, owner.id, "Project").await.unwrap();

    let created = reports::submit(&db, &actor(&reporter), report(ReportableRef::Project(project.id), "spam"))
        .await
        .unwrap();

    let resolved = reports::resolve(&db, &actor(&admin), created.id, Some("Hidden the project"))
        .await
        .expect("Failed to resolve report");
    assert_eq!(resolved.status, "resolved");
    assert_eq!(resolved.resolved_by, Some(admin.id));
    assert_eq!(resolved.resolution_note.as_deref(), Some("Hidden the project"));
    let resolved_at = resolved.resolved_at.expect("resolved_at should be set");

    let second_resolve = reports::resolve(&db, &actor(&admin), created.id, None).await;
    assert!(matches!(second_resolve, Err(Error::AlreadyResolved)));
    let then_dismiss = reports::dismiss(&db, &actor(&admin), created.id, None).await;
    assert!(matches!(then_dismiss, Err(Error::AlreadyResolved)));

    let reloaded = reports::get(&db, &actor(&admin), created.id).await.unwrap();
    assert_eq!(reloaded.resolved_at, Some(resolved_at));
    assert_eq!(reloaded.status, "resolved");

    let audits = audit_logs::Entity::find()
        .filter(audit_logs::Column::Action.eq("report_resolved"))
        .filter(audit_logs::Column::ResourceId.eq(created.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(audits, 1);

    let reporter_notes = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(reporter.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(reporter_notes.len(), 1);
    assert_eq!(reporter_notes[0].type_, "report_resolved");
}

#[actix_rt::test]
async fn test_dismiss_and_review_flow() {
    let db = setup_test_database().await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let target = create_test_user(&db, "target").await.unwrap();

    let created = reports::submit(&db, &actor(&reporter), report(ReportableRef::User(target.id), "rude"))
        .await
        .unwrap();

    let reviewing = reports::start_review(&db, &actor(&admin), created.id)
        .await
        .unwrap();
    assert_eq!(reviewing.status, "reviewing");

    let again = reports::start_review(&db, &actor(&admin), created.id).await;
    assert!(matches!(again, Err(Error::InvalidState(_))));

    let dismissed = reports::dismiss(&db, &actor(&admin), created.id, None)
        .await
        .unwrap();
    assert_eq!(dismissed.status, "dismissed");
    assert_eq!(dismissed.resolved_by, Some(admin.id));
    assert_eq!(dismissed.resolution_note, None);

    let after_close = reports::start_review(&db, &actor(&admin), created.id).await;
    assert!(matches!(after_close, Err(Error::AlreadyResolved)));

    // Dismissed reports don't count against the target
    let count = reports::reports_count(&db, ReportableRef::User(target.id))
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[actix_rt::test]
async fn test_reported_flag_clears_when_no_open_reports_remain() {
    let db = setup_test_database().await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let first = create_test_user(&db, "first").await.unwrap();
    let second = create_test_user(&db, "second").await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let project = create_test_project(&db, owner.id, "Project").await.unwrap();
    let target = ReportableRef::Project(project.id);

    let r1 = reports::submit(&db, &actor(&first), report(target, "spam")).await.unwrap();
    let r2 = reports::submit(&db, &actor(&second), report(target, "spam")).await.unwrap();

    reports::dismiss(&db, &actor(&admin), r1.id, None).await.unwrap();
    assert!(project_reported(&db, project.id).await);

    reports::resolve(&db, &actor(&admin), r2.id, None).await.unwrap();
    assert!(!project_reported(&db, project.id).await);
}

#[actix_rt::test]
async fn test_report_admin_access() {
    let db = setup_test_database().await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let reporter = create_test_user(&db, "reporter").await.unwrap();
    let target = create_test_user(&db, "target").await.unwrap();

    let created = reports::submit(&db, &actor(&reporter), report(ReportableRef::User(target.id), "spam"))
        .await
        .unwrap();

    let as_user = reports::resolve(&db, &actor(&reporter), created.id, None).await;
    assert!(matches!(as_user, Err(Error::Authorization(_))));
    let list_as_user = reports::list(&db, &actor(&reporter), None, 10).await;
    assert!(matches!(list_as_user, Err(Error::Authorization(_))));

    let missing = reports::resolve(&db, &actor(&admin), 9_999, None).await;
    assert!(matches!(missing, Err(Error::NotFound("Report"))));

    let pending = reports::list(&db, &actor(&admin), Some(ReportStatus::Pending), 10)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let resolved = reports::list(&db, &actor(&admin), Some(ReportStatus::Resolved), 10)
        .await
        .unwrap();
    assert!(resolved.is_empty());

    let reported_user = users::Entity::find_by_id(target.id).one(&db).await.unwrap().unwrap();
    assert!(reported_user.is_reported);
}
