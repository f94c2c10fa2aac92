use circle_ledger::{
    config::{self, database},
    core::{
        engine::SettlementEngine,
        scheduler::{format_sweep_summary, run_enforcement_sweep},
    },
    errors::Result,
};
use dotenvy::dotenv;
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

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settlement rules
    let settlement_config = config::settlement::load_default_config()
        .inspect_err(|e| error!("Failed to load settlement configuration: {}", e))?;
    info!("Successfully processed settlement configuration.");

    // 4. Connect and make sure every table exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Run the enforcement sweep until interrupted
    let interval = settlement_config.scheduler.interval();
    let engine = SettlementEngine::new(db, settlement_config);
    let mut ticker = tokio::time::interval(interval);
    info!("Enforcement sweep every {}s", interval.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_enforcement_sweep(&engine).await {
                    Ok(report) => info!("{}", format_sweep_summary(&report)),
                    Err(e) => error!("Enforcement sweep failed: {}", e),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
