//! Callback Dispatcher
//!
//! Periodic batch job for FusionPBX callback requests:
//! - Fetches pending rows from `v_busy_extensions`
//! - Skips pairs with an active dialog in the FreeSWITCH sofia database
//! - Connects idle pairs via `fs_cli` (two-leg conference or
//!   originate-and-bridge)
//! - Removes each row once a dispatch attempt has been made
//!
//! One pass per invocation; re-scheduling (and mutual exclusion between
//! overlapping runs) belongs to the external scheduler, typically cron.

mod callstate;
mod config;
mod dispatch;
mod error;
mod store;
mod switch;

use std::sync::Arc;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

pub use config::Config;
pub use error::{Error, Result};

use callstate::CallStateDb;
use dispatch::Dispatcher;
use store::RequestStore;
use switch::FsCli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Starting callback dispatcher pass");

    // Load configuration
    let config = Config::from_env()?;

    let store = Arc::new(RequestStore::new(&config)?);
    let call_state = CallStateDb::new(&config.sofia_db_path);
    let switch = Arc::new(FsCli::new(&config.fs_cli_path));

    let dispatcher = Dispatcher::new(store, call_state, switch, config.call_method.clone());

    // A failed pass is logged, not turned into an exit code; this runs
    // unattended and the log file is the only failure surface.
    match dispatcher.run_pass().await {
        Ok(summary) => info!(
            pending = summary.pending,
            dispatched = summary.dispatched,
            deferred = summary.deferred,
            delete_failures = summary.delete_failures,
            "Callback pass complete"
        ),
        Err(e) => error!(error = %e, "Callback pass aborted"),
    }

    Ok(())
}
