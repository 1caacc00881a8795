use anyhow::Result;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use activity_tracker::collaboration::attachments::AttachmentStore;
use activity_tracker::config::Config;
use activity_tracker::db::{create_pool, ensure_primary_admin, run_migrations};
use activity_tracker::mail::mailer_from_config;
use activity_tracker::routes::build_router;
use activity_tracker::scheduler::spawn_reminders;
use activity_tracker::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Activity Tracker API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL + schema
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let admin_created = ensure_primary_admin(&db, &config.admin_initial_password).await?;
    if admin_created && config.uses_default_admin_password() {
        warn!("ADMIN_INITIAL_PASSWORD is not set; the bootstrap admin uses the default password");
    }

    // Attachment storage
    let attachments = AttachmentStore::new(config.upload_dir.clone());
    attachments.ensure_dir().await?;
    info!("Attachments stored under {}", attachments.root().display());

    let mailer = mailer_from_config(&config)?;

    // Reminder jobs run for the life of the process
    let _reminders = spawn_reminders(&config, db.clone(), mailer.clone())?;

    let state = AppState {
        db,
        config: config.clone(),
        mailer,
        attachments,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
