//! Cache statistics and clear command handlers.

use anyhow::{Context, Result};

use inspirecache::inspire::{InspireClient, ServerStats};

/// Handle `inspirecache stats`.
pub(crate) async fn cmd_stats(client: &InspireClient, json: bool) -> Result<()> {
    let stats = client.server_stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_stats(&stats));
    }
    Ok(())
}

/// Handle `inspirecache clear`.
pub(crate) async fn cmd_clear(client: &InspireClient) -> Result<()> {
    let store = client.coordinator().store();
    let removed = store.size().await.context("Failed to read cache size")?;
    client
        .coordinator()
        .clear()
        .await
        .context("Failed to clear cache")?;
    println!("Cleared {} cached responses ({} backend).", removed, store.backend());
    Ok(())
}

/// Only what outlives the process is shown: hit, miss and throttle counters
/// start at zero with every invocation and are left to `--json`.
fn render_stats(stats: &ServerStats) -> String {
    let rows = [
        ("Backend", stats.backend.to_string()),
        ("Entries", format!("{} / {}", stats.entries, stats.max_size)),
        ("TTL", format!("{}s", stats.cache_ttl_secs)),
        ("Rate limit", format!("{} req/s", stats.requests_per_second)),
    ];

    let mut out = String::new();
    for (label, value) in rows {
        out.push_str(&format!("{:<16} {}\n", label, value));
    }
    out
}
