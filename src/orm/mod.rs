//! SeaORM entities.
//!
//! `crate::db::create_schema` creates the tables from these definitions.

pub mod audit_logs;
pub mod comments;
pub mod funding_requests;
pub mod funds;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod users;
