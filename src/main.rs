use dotenvy::dotenv;
use khata_ledger::{
    Ledger, Result,
    config::{database, settings},
    core::category,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Open the database and make sure the schema exists
    let database_url = database::get_database_url(app_config.database_url.as_deref());
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the built-in categories
    category::seed_default_categories(&db, &app_config.categories)
        .await
        .inspect_err(|e| error!("Failed to seed default categories: {}", e))?;

    // 6. Heal any ledger left half-recomputed by an earlier crash
    let ledger = Ledger::new(db);
    if app_config.repair_on_start {
        let repaired = ledger
            .repair_all()
            .await
            .inspect_err(|e| error!("Ledger repair failed: {}", e))?;
        info!(repaired, "Ledger verification finished");
    }

    info!("Ledger ready");
    Ok(())
}
