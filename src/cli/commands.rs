use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::app::{AppContext, Result};
use crate::checker::{RunOptions, RunReport};
use crate::cli::SourceKind;
use crate::health::{self, HealthCheck};
use crate::source::CatalogSource;

/// Run one availability check with the chosen source.
///
/// Sessions are always shut down, even when the run fails.
pub async fn check(
    ctx: &AppContext,
    force: bool,
    dry_run: bool,
    source: SourceKind,
) -> Result<RunReport> {
    let options = RunOptions {
        force: force || ctx.config.notify.force_notify,
        dry_run,
    };

    match source {
        SourceKind::Chrome => run_check(ctx, Arc::new(ctx.chrome_source()), options).await,
        SourceKind::Http => run_check(ctx, Arc::new(ctx.http_source()?), options).await,
    }
}

async fn run_check<C: CatalogSource>(
    ctx: &AppContext,
    source: Arc<C>,
    options: RunOptions,
) -> Result<RunReport> {
    let mut checker = ctx.checker(source);
    let result = checker.run(options).await;
    checker.shutdown().await;
    let report = result?;

    match ctx.heartbeat_path() {
        Ok(path) => {
            if let Err(e) = health::write_heartbeat(&path, Utc::now()) {
                warn!("Failed to write heartbeat to {}: {}", path.display(), e);
            }
        }
        Err(e) => warn!("No heartbeat location: {}", e),
    }

    println!(
        "{}: {} products, {} available, {} unavailable, {} notified{}",
        report.store,
        report.total,
        report.available,
        report.unavailable,
        report.notified,
        if report.degraded {
            " (snapshot store unavailable)"
        } else {
            ""
        }
    );

    Ok(report)
}

/// Run every health check and print one line per check.
///
/// Returns the names of the failed checks.
pub fn health(ctx: &AppContext, max_age: Duration) -> Result<Vec<&'static str>> {
    let checks = vec![
        health::check_snapshot_store(&ctx.db_path()?),
        health::check_last_fetch(&ctx.heartbeat_path()?, max_age, Utc::now()),
    ];

    for HealthCheck { passed, detail, .. } in &checks {
        if *passed {
            eprintln!("✅ {}", detail);
        } else {
            eprintln!("❌ {}", detail);
        }
    }

    let failed: Vec<&'static str> = checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.name)
        .collect();

    if failed.is_empty() {
        println!("✅ Health check passed");
    } else {
        eprintln!("❌ Health check failed: {}", failed.join(", "));
    }

    Ok(failed)
}
