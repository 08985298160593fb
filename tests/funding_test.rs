/// Integration tests for the funding request lifecycle and ledger
mod common;

use common::{database::*, fixtures::*};
use rust_decimal::Decimal;
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};
use unicollab::error::Error;
use unicollab::funding::{self, NewFundingRequest};
use unicollab::orm::{audit_logs, funding_requests, funds, notifications, projects};

fn dollars(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

fn request(amount: Decimal) -> NewFundingRequest {
    NewFundingRequest {
        amount,
        note: Some("For the lab equipment".to_string()),
    }
}

async fn current_funding(db: &DatabaseConnection, project_id: i32) -> i64 {
    projects::Entity::find_by_id(project_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .current_funding_cents
}

async fn fund_count(db: &DatabaseConnection, project_id: i32) -> u64 {
    funds::Entity::find()
        .filter(funds::Column::ProjectId.eq(project_id))
        .count(db)
        .await
        .unwrap()
}

#[actix_rt::test]
async fn test_verify_then_reject_scenario() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Solar Car").await.unwrap();

    let first = funding::submit(&db, &actor(&funder), project.id, request(dollars(500)))
        .await
        .expect("Failed to submit funding request");
    assert_eq!(first.status, "pending");
    assert_eq!(first.amount_cents, 50_000);

    let verified = funding::verify(&db, &actor(&owner), project.id, first.id)
        .await
        .expect("Failed to verify funding request");
    assert_eq!(verified.status, "verified");
    assert_eq!(verified.verifier_id, Some(owner.id));
    assert!(verified.verified_at.is_some());

    assert_eq!(current_funding(&db, project.id).await, 50_000);
    let ledger = funding::list_funds(&db, project.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].funder_id, funder.id);
    assert_eq!(ledger[0].funding_request_id, first.id);
    assert_eq!(funding::cents_to_amount(ledger[0].amount_cents).to_string(), "500.00");

    let second = funding::submit(&db, &actor(&funder), project.id, request(dollars(300)))
        .await
        .expect("Second request should be allowed once the first is decided");

    let rejected = funding::reject(&db, &actor(&owner), project.id, second.id)
        .await
        .expect("Failed to reject funding request");
    assert_eq!(rejected.status, "rejected");

    assert_eq!(current_funding(&db, project.id).await, 50_000);
    assert_eq!(fund_count(&db, project.id).await, 1);

    let summary = funding::summary(&db, project.id).await.unwrap();
    assert!(summary.is_balanced());
    assert_eq!(summary.current_funding.to_string(), "500.00");
    assert_eq!(summary.funds_count, 1);
}

#[actix_rt::test]
async fn test_verify_twice_fails_without_double_credit() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    let req = funding::submit(&db, &actor(&funder), project.id, request(dollars(120)))
        .await
        .unwrap();
    funding::verify(&db, &actor(&owner), project.id, req.id)
        .await
        .unwrap();

    let again = funding::verify(&db, &actor(&owner), project.id, req.id).await;
    assert!(matches!(again, Err(Error::InvalidState(_))));

    let reject_after = funding::reject(&db, &actor(&owner), project.id, req.id).await;
    assert!(matches!(reject_after, Err(Error::InvalidState(_))));

    assert_eq!(fund_count(&db, project.id).await, 1);
    assert_eq!(current_funding(&db, project.id).await, 12_000);
}

#[actix_rt::test]
async fn test_duplicate_pending_request_is_refused() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let other = create_test_user(&db, "other").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    funding::submit(&db, &actor(&funder), project.id, request(dollars(10)))
        .await
        .unwrap();

    let duplicate = funding::submit(&db, &actor(&funder), project.id, request(dollars(20))).await;
    assert!(matches!(duplicate, Err(Error::DuplicatePending)));

    // A different funder is unaffected
    funding::submit(&db, &actor(&other), project.id, request(dollars(20)))
        .await
        .expect("Other funders may request in parallel");

    let pending = funding_requests::Entity::find()
        .filter(funding_requests::Column::ProjectId.eq(project.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(pending, 2);
}

#[actix_rt::test]
async fn test_reject_leaves_ledger_untouched() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    let req = funding::submit(&db, &actor(&funder), project.id, request(dollars(75)))
        .await
        .unwrap();
    funding::reject(&db, &actor(&owner), project.id, req.id)
        .await
        .unwrap();

    assert_eq!(current_funding(&db, project.id).await, 0);
    assert_eq!(fund_count(&db, project.id).await, 0);

    let audit = audit_logs::Entity::find()
        .filter(audit_logs::Column::Action.eq("funding_rejected"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(audit, 1);
}

#[actix_rt::test]
async fn test_invalid_amounts_are_refused() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    for amount in [dollars(0), dollars(-5), Decimal::new(1_005, 3)] {
        let result = funding::submit(&db, &actor(&funder), project.id, request(amount)).await;
        assert!(
            matches!(result, Err(Error::Validation(_))),
            "{} should be refused",
            amount
        );
    }

    // Trailing zeros beyond two places are still whole cents
    let ok = funding::submit(&db, &actor(&funder), project.id, request(Decimal::new(12_500, 3)))
        .await
        .unwrap();
    assert_eq!(ok.amount_cents, 1_250);
}

#[actix_rt::test]
async fn test_missing_project_and_request() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();
    let other_project = create_test_project(&db, owner.id, "Glider").await.unwrap();

    let missing = funding::submit(&db, &actor(&funder), 9_999, request(dollars(5))).await;
    assert!(matches!(missing, Err(Error::NotFound("Project"))));

    let req = funding::submit(&db, &actor(&funder), project.id, request(dollars(5)))
        .await
        .unwrap();

    // The request belongs to a different project
    let wrong_project = funding::verify(&db, &actor(&owner), other_project.id, req.id).await;
    assert!(matches!(wrong_project, Err(Error::NotFound(_))));

    let unknown = funding::verify(&db, &actor(&owner), project.id, 9_999).await;
    assert!(matches!(unknown, Err(Error::NotFound(_))));
}

#[actix_rt::test]
async fn test_only_owner_can_decide() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    let req = funding::submit(&db, &actor(&funder), project.id, request(dollars(40)))
        .await
        .unwrap();

    let by_funder = funding::verify(&db, &actor(&funder), project.id, req.id).await;
    assert!(matches!(by_funder, Err(Error::Authorization(_))));

    let by_admin = funding::reject(&db, &actor(&admin), project.id, req.id).await;
    assert!(matches!(by_admin, Err(Error::Authorization(_))));

    let still = funding_requests::Entity::find_by_id(req.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still.status, "pending");
}

#[actix_rt::test]
async fn test_failed_verify_rolls_back() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    let req = funding::submit(&db, &actor(&funder), project.id, request(dollars(500)))
        .await
        .unwrap();

    // Ledger insert fails after the status update has already run
    drop_table(&db, "funds").await.unwrap();

    let result = funding::verify(&db, &actor(&owner), project.id, req.id).await;
    assert!(matches!(result, Err(Error::Database(_))));

    let after = funding_requests::Entity::find_by_id(req.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, "pending");
    assert_eq!(after.verifier_id, None);
    assert_eq!(current_funding(&db, project.id).await, 0);

    let verified_audit = audit_logs::Entity::find()
        .filter(audit_logs::Column::Action.eq("funding_verified"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(verified_audit, 0);
}

#[actix_rt::test]
async fn test_notifications_follow_the_request() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    let req = funding::submit(&db, &actor(&funder), project.id, request(dollars(60)))
        .await
        .unwrap();

    let owner_inbox = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(owner.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(owner_inbox.len(), 1);
    assert_eq!(owner_inbox[0].type_, "funding_requested");
    assert_eq!(owner_inbox[0].actor_id, Some(funder.id));
    assert_eq!(owner_inbox[0].metadata["amount"], "60.00");

    funding::verify(&db, &actor(&owner), project.id, req.id)
        .await
        .unwrap();

    let funder_inbox = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(funder.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(funder_inbox.len(), 1);
    assert_eq!(funder_inbox[0].type_, "funding_verified");
    assert_eq!(funder_inbox[0].metadata["funding_request_id"], req.id);
}

#[actix_rt::test]
async fn test_request_visibility() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let admin = create_test_admin(&db, "admin").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    funding::submit(&db, &actor(&alice), project.id, request(dollars(1)))
        .await
        .unwrap();
    funding::submit(&db, &actor(&bob), project.id, request(dollars(2)))
        .await
        .unwrap();

    let as_owner = funding::list_requests(&db, &actor(&owner), project.id).await.unwrap();
    assert_eq!(as_owner.len(), 2);

    let as_admin = funding::list_requests(&db, &actor(&admin), project.id).await.unwrap();
    assert_eq!(as_admin.len(), 2);

    let as_alice = funding::list_requests(&db, &actor(&alice), project.id).await.unwrap();
    assert_eq!(as_alice.len(), 1);
    assert_eq!(as_alice[0].funder_id, alice.id);
}

#[actix_rt::test]
async fn test_ledger_matches_total_after_many_decisions() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    for (i, cents) in [1_999_i64, 250, 10_000, 1, 733].into_iter().enumerate() {
        let funder = create_test_user(&db, &format!("funder{}", i)).await.unwrap();
        let req = funding::submit(
            &db,
            &actor(&funder),
            project.id,
            request(funding::cents_to_amount(cents)),
        )
        .await
        .unwrap();

        if i % 2 == 0 {
            funding::verify(&db, &actor(&owner), project.id, req.id)
                .await
                .unwrap();
        } else {
            funding::reject(&db, &actor(&owner), project.id, req.id)
                .await
                .unwrap();
        }
    }

    let summary = funding::summary(&db, project.id).await.unwrap();
    assert!(summary.is_balanced());
    assert_eq!(summary.funds_count, 3);
    assert_eq!(current_funding(&db, project.id).await, 1_999 + 10_000 + 733);
}

/// Inserts a request row directly, skipping the workflow's own checks.
async fn insert_raw_request(
    db: &DatabaseConnection,
    project_id: i32,
    funder_id: i32,
    status: &str,
) -> Result<funding_requests::Model, sea_orm::DbErr> {
    funding_requests::ActiveModel {
        project_id: Set(project_id),
        funder_id: Set(funder_id),
        amount_cents: Set(1_000),
        note: Set(None),
        status: Set(status.to_string()),
        verifier_id: Set(None),
        verified_at: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[actix_rt::test]
async fn test_schema_allows_one_pending_request_per_funder() {
    let db = setup_test_database().await.unwrap();
    let owner = create_test_user(&db, "owner").await.unwrap();
    let funder = create_test_user(&db, "funder").await.unwrap();
    let project = create_test_project(&db, owner.id, "Rover").await.unwrap();

    // Decided requests don't count
    insert_raw_request(&db, project.id, funder.id, "rejected")
        .await
        .unwrap();
    insert_raw_request(&db, project.id, funder.id, "pending")
        .await
        .unwrap();

    // A second pending row is refused even when the pre-check is bypassed
    let err = insert_raw_request(&db, project.id, funder.id, "pending")
        .await
        .expect_err("Second pending request must violate the unique index");
    assert!(matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ));

    let result = funding::submit(&db, &actor(&funder), project.id, request(dollars(5))).await;
    assert!(matches!(result, Err(Error::DuplicatePending)));
}
