use dotenvy::dotenv;
use market_admin::{
    config::{
        self,
        database::{create_connection, create_tables, get_database_url},
    },
    core::user::bootstrap_owner,
    errors::Result,
    notify::{LogNotifier, Notifier},
    scheduler,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load the main application configuration
    let app_config = config::settings::load_app_configuration()
        .inspect_err(|e| error!("Failed to load application configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Connect and make sure the schema exists
    let database_url = app_config
        .database_url
        .clone()
        .unwrap_or_else(get_database_url);
    let db = create_connection(&database_url)
        .await
        .inspect(|_| info!("Connected to {}", database_url))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Owner bootstrap, a no-op once an owner exists
    bootstrap_owner(&db, &app_config.owner.email, &app_config.owner.name)
        .await
        .inspect_err(|e| error!("Failed to bootstrap owner account: {}", e))?;

    tokio::fs::create_dir_all(&app_config.media.root)
        .await
        .inspect_err(|e| error!("Failed to create media root: {}", e))?;

    // 6. Catch up on anything that expired while we were down, then schedule
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    if let Err(e) = scheduler::run_expiration_job(&db).await {
        error!("Startup expiration sweep failed: {}", e);
    }
    let jobs = scheduler::spawn(db, notifier, &app_config.scheduler);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down.");
    for job in jobs {
        job.abort();
    }
    Ok(())
}
