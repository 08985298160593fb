pub mod actor;
pub mod app_config;
pub mod audit;
pub mod db;
pub mod error;
pub mod funding;
pub mod middleware;
pub mod moderation;
pub mod notifications;
pub mod orm;
pub mod reports;
pub mod web;

pub use actor::{Actor, Role};
pub use error::{Error, Result};
