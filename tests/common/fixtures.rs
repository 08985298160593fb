//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use unicollab::actor::{Actor, Role};
use unicollab::orm::{comments, projects, users};

async fn insert_user(db: &DatabaseConnection, name: &str, role: Role) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        name: Set(name.to_string()),
        email: Set(Some(format!("{}@uni.test", name))),
        role: Set(role.as_str().to_string()),
        is_reported: Set(false),
        is_suspended: Set(false),
        suspended_reason: Set(None),
        suspended_by: Set(None),
        suspended_at: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a regular user
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    insert_user(db, name, Role::User).await
}

/// Create an admin user
pub async fn create_test_admin(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    insert_user(db, name, Role::Admin).await
}

/// Create a project owned by `owner_id` with no funding
pub async fn create_test_project(
    db: &DatabaseConnection,
    owner_id: i32,
    title: &str,
) -> Result<projects::Model, DbErr> {
    projects::ActiveModel {
        owner_id: Set(owner_id),
        title: Set(title.to_string()),
        description: Set(Some(format!("{} description", title))),
        current_funding_cents: Set(0),
        is_reported: Set(false),
        is_hidden: Set(false),
        hidden_reason: Set(None),
        hidden_by: Set(None),
        hidden_at: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a comment by `user_id` on a project
pub async fn create_test_comment(
    db: &DatabaseConnection,
    project_id: i32,
    user_id: i32,
    body: &str,
) -> Result<comments::Model, DbErr> {
    comments::ActiveModel {
        project_id: Set(project_id),
        user_id: Set(user_id),
        body: Set(body.to_string()),
        is_reported: Set(false),
        is_hidden: Set(false),
        hidden_reason: Set(None),
        hidden_by: Set(None),
        hidden_at: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub fn actor(user: &users::Model) -> Actor {
    Actor::from(user)
}
