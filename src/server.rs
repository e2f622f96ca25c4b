//! MCP server initialization over stdio.

use anyhow::Result;
use rmcp::ServiceExt;
use std::time::Duration;

use daybook::config::DaybookConfig;
use daybook::engine::Daybook;

use crate::tools::DaybookTools;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: DaybookConfig) -> Result<()> {
    tracing::info!("starting daybook MCP server on stdio");

    let prune_every = Duration::from_secs(config.rate_limit.prune_interval_secs);
    let engine = Daybook::open(config)?;
    let pruner = tokio::spawn(prune_rate_limits(engine.clone(), prune_every));

    let tools = DaybookTools::new(engine);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    let result = server.waiting().await;
    pruner.abort();
    result?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Evict expired rate-limit buckets until the task is aborted.
async fn prune_rate_limits(engine: Daybook, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // first tick fires immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match engine.prune_rate_limits().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "rate-limit buckets pruned"),
            Err(e) => tracing::warn!(error = %e, "rate-limit prune failed"),
        }
    }
}
