use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use rand::{distributions::Alphanumeric, Rng};
use unicollab::app_config;
use unicollab::db;
use unicollab::middleware::ClientCtx;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    app_config::init();

    let config = app_config::get_config();
    let pool = db::connect(&config.database_url(), config.database.max_connections)
        .await
        .context("Failed to connect to the database")?;

    if config.database.create_schema {
        db::create_schema(&pool)
            .await
            .context("Failed to create database schema")?;
        log::info!("Database schema ready");
    }

    let secret_key = session_key();
    let secure_cookies = config.server.secure_cookies;

    let mut server = HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(pool.clone()))
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(secure_cookies)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(unicollab::web::configure)
    });

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    log::info!("Listening on {}", config.server.bind_address);

    server
        .bind(&config.server.bind_address)
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?
        .run()
        .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env is fine; the environment may be set some other way.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Key for signing session cookies.
fn session_key() -> Key {
    match std::env::var("SECRET_KEY") {
        Ok(key) if key.len() >= 64 => Key::from(key.as_bytes()),
        other => {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(128)
                .map(char::from)
                .collect();
            log::warn!(
                "SECRET_KEY was invalid ({}). Session cookies will be invalidated every time the application restarts. A secret key must be at least 64 bytes.",
                match other {
                    Ok(_) => "too short".to_string(),
                    Err(err) => err.to_string(),
                }
            );
            Key::from(random_string.as_bytes())
        }
    }
}
