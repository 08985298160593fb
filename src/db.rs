//! Database connection and schema bootstrap.

use crate::orm::{
    audit_logs, comments, funding_requests, funds, notifications, projects, reports, users,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

/// Partial unique index; the syntax is shared by Postgres and SQLite.
const ONE_PENDING_REQUEST_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
    idx_funding_requests_one_pending ON funding_requests (project_id, funder_id) \
    WHERE status = 'pending'";

/// Opens a connection pool.
///
/// In-memory SQLite lives and dies with its connection, so the pool is
/// pinned to a single connection for those URLs.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    if database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory") {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(max_connections);
    }
    opt.connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!("Connected to database ({:?})", db.get_database_backend());
    Ok(db)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates any missing tables from the entity definitions.
///
/// Production databases are expected to be migrated ahead of time; this is
/// used by development setups and the test suite.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // Referenced tables first.
    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, projects::Entity).await?;
    create_table(db, &schema, comments::Entity).await?;
    create_table(db, &schema, reports::Entity).await?;
    create_table(db, &schema, funding_requests::Entity).await?;
    create_table(db, &schema, funds::Entity).await?;
    create_table(db, &schema, audit_logs::Entity).await?;
    create_table(db, &schema, notifications::Entity).await?;

    // At most one pending request per funder and project.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        ONE_PENDING_REQUEST_INDEX.to_string(),
    ))
    .await?;

    Ok(())
}
