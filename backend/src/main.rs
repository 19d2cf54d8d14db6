// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use social_backend::config::{ADMIN_PROFILE, Config};
use social_backend::events::{ChannelNotifier, spawn_mailer};
use social_backend::models::user::{NewUser, normalize};
use social_backend::routes;
use social_backend::state::AppState;
use social_backend::store::{PgUserStore, UserStore};
use social_backend::utils::hash::hash_password;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let pool = connect_with_retry(&config).await?;
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let store = PgUserStore::new(pool);

    // Seed Admin User
    if let Err(e) = seed_admin_user(&store, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Registration events are rendered into mail by a background task.
    let (notifier, events) = ChannelNotifier::new();
    let _mailer = spawn_mailer(events, config.clone());

    let state = AppState {
        store: Arc::new(store),
        notifier: Arc::new(notifier),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Connects to Postgres, retrying while the database is still starting up.
async fn connect_with_retry(config: &Config) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

/// Creates the configured admin account once. The seeded admin is pre-verified.
async fn seed_admin_user(
    store: &PgUserStore,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(nick), Some(email), Some(password)) =
        (&config.admin_nick, &config.admin_email, &config.admin_password)
    else {
        return Ok(());
    };

    let nick = normalize(nick);
    if store.nick_taken(&nick, None).await? {
        return Ok(());
    }

    let profile = store
        .profile_by_name(ADMIN_PROFILE)
        .await?
        .ok_or("admin profile is not seeded")?;

    tracing::info!("Seeding admin user: {}", nick);
    store
        .create_user(NewUser {
            profile_id: profile.id,
            nick,
            name: "Administrator".to_string(),
            email: normalize(email),
            password: hash_password(password)?,
            description: None,
            enabled: true,
            verified: true,
            verification_email_token: None,
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
