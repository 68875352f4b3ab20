//! Nutricalc
//!
//! An MCP server for recipe nutrition calculation.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use nutricalc::build_info;
use nutricalc::config::Config;
use nutricalc::db::{self, Database};
use nutricalc::mcp::NutricalcService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutricalc=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::log_startup_banner();

    let config = Config::from_env();
    let db_path = config.database_path;
    tracing::info!(path = %db_path.display(), "opening database");

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&db_path)?;

    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        tracing::info!(version, "database schema ready");
        Ok(())
    })?;

    let service = NutricalcService::new(db_path, database);

    tracing::info!("starting MCP server on stdio");
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
