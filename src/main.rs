use budget_ledger::{
    config::{database, settings},
    core::{LedgerStore, SimulatedRemote, SyncCoordinator, TransactionService, format},
    errors::Result,
};
use dotenvy::dotenv;
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

    // 2. Load .env file; variables may also come from the environment directly
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = settings::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Open the database and the ledger store
    let db = database::init_db(&app_config.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;
    let store = Arc::new(LedgerStore::open(db).await?);

    // 5. Wire the service and start the background sync
    let service = TransactionService::new(Arc::clone(&store));
    let remote = Arc::new(SimulatedRemote::new(app_config.sync.remote_latency()));
    let sync = SyncCoordinator::new(Arc::clone(service.store()), remote, app_config.sync).start();

    for transaction in service.get_all().await?.iter().take(5) {
        info!("{}", format::transaction_line(transaction));
    }
    info!("{}", format::summary_line(&service.totals()));

    // 6. Report totals as they change until Ctrl-C
    let mut totals = service.subscribe_totals();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            changed = totals.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = *totals.borrow_and_update();
                info!("{}", format::summary_line(&latest));
            }
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown requested.");
                break;
            }
        }
    }

    sync.stop().await;
    Ok(())
}
