use std::sync::Arc;

use anyhow::Context;
use beast_physique::api::create_routes;
use beast_physique::config::{run_migrations, AppConfig, DatabaseConfig, DatabaseSeeder};
use beast_physique::services::{BackgroundJobService, EmailService, MediaStorageService, TaskQueue};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_config = DatabaseConfig::from_env()?;
    let pool = db_config.create_pool().await?;
    run_migrations(&pool).await?;

    if config.seed_database {
        DatabaseSeeder::new(pool.clone()).seed_all().await?;
    }

    let email_service = EmailService::new(config.smtp.clone(), &config.email_from)
        .context("Failed to configure email delivery")?;
    let storage = match &config.media_bucket {
        Some(bucket) => Some(MediaStorageService::from_env(bucket.clone()).await),
        None => {
            info!("MEDIA_BUCKET not set, media uploads are disabled");
            None
        }
    };

    let (tasks, receiver) = TaskQueue::new();
    let jobs = Arc::new(BackgroundJobService::new(pool.clone(), email_service, storage));
    let _scheduler = jobs.start_maintenance().await?;
    let _worker = jobs.spawn_worker(receiver);

    let app = create_routes(pool, &config, tasks);

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Beast Physique server starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
