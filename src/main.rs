use rusty_library_lending::{
    adapters::postgres::{PostgresCatalog, PostgresLoanStore, PostgresMemberDirectory},
    application::lending::{ServiceDependencies, list_loans},
    config::Settings,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bootstrap the lending core and print the loan report.
///
/// Borrow and return requests are issued in-process by the request layer;
/// this binary prepares the schema and lists every loan as JSON lines.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_lending=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // .env があれば読み込む（なくてもよい）
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;

    tracing::info!(
        max_connections = settings.max_connections,
        acquire_timeout_secs = settings.acquire_timeout_secs,
        operation_timeout_secs = settings.operation_timeout_secs,
        "Connecting to database"
    );

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&settings.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied");

    // Initialize adapters
    let deps = ServiceDependencies::new(
        Arc::new(PostgresLoanStore::new(pool.clone())),
        Arc::new(PostgresCatalog::new(pool.clone())),
        Arc::new(PostgresMemberDirectory::new(pool.clone())),
    )
    .with_operation_timeout(settings.operation_timeout());

    let loans = list_loans(&deps).await?;
    let open_count = loans.iter().filter(|loan| loan.is_open()).count();

    for loan in &loans {
        println!("{}", serde_json::to_string(loan)?);
    }

    tracing::info!(total = loans.len(), open = open_count, "Loan report complete");

    pool.close().await;
    Ok(())
}
