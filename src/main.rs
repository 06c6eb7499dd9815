//! MySQL MCP Gateway - Main entry point.
//!
//! Exposes one MySQL database to AI assistants through MCP tools and
//! resources, gated by a read/write policy.

use clap::Parser;
use mysql_mcp_gateway::config::Config;
use mysql_mcp_gateway::db::ConnectionPool;
use mysql_mcp_gateway::mcp::ToolDispatcher;
use mysql_mcp_gateway::transport::StdioTransport;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the MCP stream.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!("Starting MySQL MCP Gateway v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let target = config.target().inspect_err(|e| {
        error!(error = %e, "Invalid connection settings");
    })?;
    let policy = config.policy(&target);

    let pool_config = config.pool_config();
    info!(
        target_db = %target.display(),
        pool_size = pool_config.max_size,
        idle_timeout_secs = config.idle_timeout,
        max_lifetime_secs = config.max_lifetime,
        allow_write = policy.allow_write,
        deny_unclassified = policy.deny_unclassified,
        "Configured database access"
    );

    let pool = ConnectionPool::with_config(config.connector(&target), pool_config)?;
    if let Err(e) = pool.probe().await {
        error!(
            error = %e,
            suggestion = e.suggestion().unwrap_or_default(),
            "Database is unreachable"
        );
        return Err(e.into());
    }

    let dispatcher = Arc::new(ToolDispatcher::new(pool, policy, target.database.clone()));
    let transport = StdioTransport::new(dispatcher);
    info!(transport = transport.name(), "Serving MCP");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
