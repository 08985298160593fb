//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};
use std::env;

/// Each call opens a fresh database. The default in-memory SQLite database
/// lives only as long as the returned connection, so tests never share state.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let database_url =
        env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

    let db = unicollab::db::connect(&database_url, 5).await?;
    unicollab::db::create_schema(&db).await?;

    Ok(db)
}

/// Drops a table out from under the workflows to force a mid-transaction failure.
pub async fn drop_table(db: &DatabaseConnection, table: &str) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        format!("DROP TABLE {}", table),
    ))
    .await?;
    Ok(())
}
