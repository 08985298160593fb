pub mod admin;
pub mod error;
pub mod funding;
pub mod notifications;
pub mod reports;

use actix_web::web;

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut web::ServiceConfig) {
    conf.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler));

    // Descending order. Order is important.
    // Route resolution will stop at the first match.
    admin::configure(conf);
    funding::configure(conf);
    notifications::configure(conf);
    reports::configure(conf);
}
