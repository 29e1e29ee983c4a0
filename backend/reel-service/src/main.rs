use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_middleware::{CorrelationIdMiddleware, Logging};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use crypto_core::JwtKeys;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use reel_service::clock::{Clock, SystemClock};
use reel_service::config::Config;
use reel_service::handlers;
use reel_service::logging::init_tracing;
use reel_service::repository::{InMemoryStore, MessageStore, PostgresStore, UserDirectory};
use reel_service::services::{EmailService, InMemoryOtpStore, OtpStore, RedisOtpStore};
use reel_service::AppState;

const OTP_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.json_logs);

    info!(
        env = %config.app.env,
        host = %config.app.host,
        port = config.app.http_port,
        "Starting reel-service"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (directory, messages): (Arc<dyn UserDirectory>, Arc<dyn MessageStore>) =
        match &config.database {
            Some(db) => {
                let pool = PgPoolOptions::new()
                    .max_connections(db.max_connections)
                    .min_connections(db.min_connections)
                    .acquire_timeout(StdDuration::from_secs(10))
                    .connect(&db.url)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                info!("PostgreSQL store ready");

                let store = Arc::new(PostgresStore::new(pool));
                (
                    store.clone() as Arc<dyn UserDirectory>,
                    store as Arc<dyn MessageStore>,
                )
            }
            None => {
                if config.is_production() {
                    warn!("DATABASE_URL not set in production; data will not survive a restart");
                } else {
                    warn!("DATABASE_URL not set; using in-memory store");
                }
                let store = Arc::new(InMemoryStore::new());
                (
                    store.clone() as Arc<dyn UserDirectory>,
                    store as Arc<dyn MessageStore>,
                )
            }
        };

    let otp_store: Arc<dyn OtpStore> = match &config.redis {
        Some(redis_cfg) => {
            let client =
                redis::Client::open(redis_cfg.url.as_str()).context("Invalid REDIS_URL")?;
            let manager = redis::aio::ConnectionManager::new(client)
                .await
                .context("Failed to connect to Redis")?;
            info!("Redis code store ready");
            Arc::new(RedisOtpStore::new(manager)) as Arc<dyn OtpStore>
        }
        None => {
            let store = Arc::new(InMemoryOtpStore::new());
            let sweeper = store.clone();
            let sweep_clock = clock.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(OTP_SWEEP_INTERVAL);
                loop {
                    interval.tick().await;
                    sweeper.cleanup_expired(sweep_clock.now());
                }
            });
            info!("In-memory code store ready");
            store as Arc<dyn OtpStore>
        }
    };

    let mailer = Arc::new(
        EmailService::new(&config.email, config.is_production())
            .context("Invalid email settings")?,
    );

    let jwt = Arc::new(
        JwtKeys::from_secret(
            &config.jwt.secret,
            chrono::Duration::seconds(config.jwt.expiry_secs),
        )
        .context("Invalid JWT settings")?,
    );

    let state = AppState::build(
        directory,
        messages,
        otp_store,
        mailer,
        clock,
        jwt.clone(),
        config.otp,
    );

    let bind_addr = (config.app.host.clone(), config.app.http_port);
    info!("HTTP server listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        let jwt = jwt.clone();
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logging)
            .wrap(CorrelationIdMiddleware)
            .configure(move |cfg| handlers::configure(cfg, jwt))
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("reel-service shut down");
    Ok(())
}
