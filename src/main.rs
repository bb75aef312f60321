use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use anyhow::Context;
use chrono::Utc;
use serde_json::json;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod store;
mod utils;

use config::{Config, StoreBackend};
use db::init_db;

use crate::auth::handlers::bootstrap_admin;
use crate::docs::ApiDoc;
use crate::routes::RateLimiters;
use crate::service::{attendance::AttendancePolicy, employee::LoginIdRegistry};
use crate::store::{HrStore, MemoryStore, MySqlStore};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log plus console output filtered by RUST_LOG
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false) // removes module path
                .with_filter(LevelFilter::DEBUG),
        )
        .with(
            fmt::layer().with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            ),
        )
        .init();

    info!("Server starting...");

    let store: Arc<dyn HrStore> = match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await.context("Failed to connect to database")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(MySqlStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = Data::new(LoginIdRegistry::default());

    if let Some(admin) = &config.bootstrap_admin {
        let created = bootstrap_admin(store.as_ref(), &registry, admin, Utc::now())
            .await
            .context("Failed to seed bootstrap admin")?;
        if !created {
            info!(login_id = %admin.login_id, "Bootstrap admin already present");
        }
    }

    let store_for_warmup = store.clone();
    let registry_for_warmup = registry.clone();
    actix_web::rt::spawn(async move {
        // all login IDs into the filter, last 30 days of logins into the cache
        match registry_for_warmup
            .warm_up(store_for_warmup.as_ref(), Utc::now())
            .await
        {
            Ok((filtered, cached)) => info!(filtered, cached, "Login ID registry warmed up"),
            Err(e) => error!(error = %e, "Failed to warm up login ID registry"),
        }
    });

    let limiters = RateLimiters::from_config(&config)?;
    let store_data: Data<dyn HrStore> = Data::from(store);
    let config_data = Data::new(config.clone());
    let policy = Data::new(AttendancePolicy {
        standard_work_hours: config.standard_work_hours,
    });
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store_data.clone())
            .app_data(config_data.clone())
            .app_data(registry.clone())
            .app_data(policy.clone())
            .service(health)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
