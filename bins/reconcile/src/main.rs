//! Ledger reconciliation sweep for Finlog.
//!
//! Loads a ledger snapshot (JSON), replays every account's transaction
//! log, and compares the result against the cached balances. Exits
//! non-zero when any account drifted, so the sweep can run from cron and
//! page on failure.
//!
//! Usage:
//!   reconcile [snapshot.json]   - Audit the given snapshot
//!
//! With no argument the snapshot path comes from the configuration
//! (`FINLOG_RECONCILE__SNAPSHOT_PATH` or `reconcile.snapshot_path`).

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finlog_core::ledger::AccountAudit;
use finlog_shared::AppConfig;
use finlog_store::{LedgerSnapshot, MemoryLedgerStore, Reconciler};

/// One report line per account. Drifted accounts carry the full breakdown;
/// a missing `signed_amount` is a precondition violation and is called out
/// even when the balances still match.
fn render_audit(audit: &AccountAudit) -> String {
    let mut line = if audit.matches {
        format!("OK       {}  balance {}", audit.account_id, audit.stored_balance)
    } else {
        format!(
            "DRIFTED  {}  stored {}  calculated {}  diff {}  (missing rb: {}, stale rb: {})",
            audit.account_id,
            audit.stored_balance,
            audit.calculated_balance,
            audit.difference,
            audit.missing_running_balance,
            audit.stale_running_balance,
        )
    };
    if audit.missing_signed_amount > 0 {
        line.push_str(&format!(
            "\n         {}  missing signed_amount on {} transaction(s)",
            audit.account_id, audit.missing_signed_amount
        ));
    }
    for flag in &audit.flags {
        line.push_str(&format!("\n         {}  note: {flag:?}", audit.account_id));
    }
    line
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let path = std::env::args()
        .nth(1)
        .unwrap_or(config.reconcile.snapshot_path);

    info!(path = %path, "loading ledger snapshot");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read snapshot {path}"))?;
    let snapshot =
        LedgerSnapshot::from_json(&json).with_context(|| format!("Failed to parse {path}"))?;

    let store = Arc::new(MemoryLedgerStore::from_snapshot(snapshot));
    let reconciler = Reconciler::new(store);
    let report = reconciler.audit_all().await;

    for audit in &report.accounts {
        println!("{}", render_audit(audit));
    }
    for (account_id, error) in &report.failures {
        println!("FAILED   {account_id}  {error}");
    }

    let drifted = report.mismatches().count();
    let failed = report.failures.len();
    let tainted = report
        .accounts
        .iter()
        .filter(|a| a.missing_signed_amount > 0)
        .count();
    if drifted > 0 || failed > 0 || tainted > 0 {
        anyhow::bail!(
            "{drifted} drifted, {failed} unauditable, {tainted} with missing signed_amount"
        );
    }
    info!(
        audited = report.accounts.len(),
        "ledger is consistent"
    );
    Ok(())
}
