use std::sync::Arc;

use pushgate_api::{build_router, state::AppState};
use pushgate_config::Settings;
use pushgate_db::{connect, indexes::ensure_indexes};
use pushgate_services::gateway::TypedSubjectResolver;
use pushgate_services::push::WebPushSender;
use pushgate_services::store::MongoSubscriptionStore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "pushgate_api=debug,pushgate_services=debug,pushgate_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!(
        "Starting Pushgate API on {}:{}",
        settings.app.host, settings.app.port
    );
    info!(
        vapid_subject = %settings.vapid.subject,
        max_attempts = settings.delivery.max_attempts,
        concurrency = settings.delivery.concurrency,
        "Delivery config"
    );

    // Connect to MongoDB
    let db = connect(&settings).await?;

    // Ensure indexes
    ensure_indexes(&db, &settings.database.subscriptions_collection).await?;

    // Wire the store, sender and gateway
    let store = Arc::new(MongoSubscriptionStore::new(
        &db,
        &settings.database.subscriptions_collection,
    ));
    let sender = Arc::new(WebPushSender::new(settings.vapid.clone()));
    let resolver = Arc::new(TypedSubjectResolver::new(
        settings.gateway.subject_types.clone(),
    ));

    let app_state = AppState::new(settings.clone(), store, sender, resolver);

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
