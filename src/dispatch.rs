//! Pipeline driver
//!
//! One pass over the pending callback requests: check each pair against the
//! call-state database, connect idle pairs through the switch, then remove
//! the request row. Busy pairs stay pending for the next pass.

use std::sync::Arc;

use tracing::{error, info};

use crate::callstate::CallStateDb;
use crate::store::{CallbackRequest, CallbackStore};
use crate::switch::{conference_legs, originate_command, DispatchMode, SwitchCli};
use crate::{Error, Result};

/// Outcome of the dispatch step for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Commands were issued (some may individually have failed)
    Dispatched,
    /// The configured call method is unrecognized; no command was issued.
    /// The request row is still removed: a bad CALL_METHOD affects every
    /// request equally, and keeping the rows would only re-log the same
    /// error on every pass without progress.
    InvalidMode,
}

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub pending: usize,
    pub dispatched: usize,
    pub deferred: usize,
    pub delete_failures: usize,
}

pub struct Dispatcher {
    store: Arc<dyn CallbackStore>,
    call_state: CallStateDb,
    switch: Arc<dyn SwitchCli>,
    call_method: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CallbackStore>,
        call_state: CallStateDb,
        switch: Arc<dyn SwitchCli>,
        call_method: String,
    ) -> Self {
        Self {
            store,
            call_state,
            switch,
            call_method,
        }
    }

    /// Run one fetch-check-act-delete pass.
    ///
    /// A request-store failure during the fetch aborts the pass, as does a
    /// failure to launch the command sink at all (the current row and every
    /// remaining row stay pending). Everything else is handled per request
    /// and the pass continues.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let pending = self.store.fetch_pending().await?;

        let mut summary = PassSummary {
            pending: pending.len(),
            ..Default::default()
        };

        for request in pending {
            let free = self
                .call_state
                .extensions_free(&request.from_extension, &request.to_extension)
                .await;

            if !free {
                info!(
                    id = request.id,
                    from = %request.from_extension,
                    to = %request.to_extension,
                    "Extensions busy, leaving request pending"
                );
                summary.deferred += 1;
                continue;
            }

            if self.dispatch(&request).await? == DispatchOutcome::Dispatched {
                summary.dispatched += 1;
            }

            // The dispatch attempt has been made; the row goes regardless
            // of whether the switch accepted the commands.
            if let Err(e) = self.store.delete(request.id).await {
                error!(
                    id = request.id,
                    error = %e,
                    "Error deleting callback request, transaction rolled back"
                );
                summary.delete_failures += 1;
            }
        }

        Ok(summary)
    }

    /// Issue the switch command(s) for one request.
    ///
    /// A switch-rejected command (non-zero exit) is logged per leg and never
    /// gates the delete step. A sink that cannot be launched propagates and
    /// aborts the pass before any delete.
    async fn dispatch(&self, request: &CallbackRequest) -> Result<DispatchOutcome> {
        let from = &request.from_extension;
        let to = &request.to_extension;
        let domain = &request.domain_name;

        match self.call_method.parse::<DispatchMode>() {
            Ok(DispatchMode::Conference) => {
                info!(%from, %to, "Setting up conference between extensions");
                for leg in conference_legs(from, to, domain) {
                    self.run_command(&leg).await?;
                }
                Ok(DispatchOutcome::Dispatched)
            }
            Ok(DispatchMode::Originate) => {
                info!(%from, %to, "Originating call between extensions");
                self.run_command(&originate_command(from, to, domain))
                    .await?;
                Ok(DispatchOutcome::Dispatched)
            }
            Err(_) => {
                error!(
                    id = request.id,
                    method = %self.call_method,
                    "Invalid call method, no switch command issued"
                );
                Ok(DispatchOutcome::InvalidMode)
            }
        }
    }

    async fn run_command(&self, api_command: &str) -> Result<()> {
        match self.switch.execute(api_command).await {
            Ok(output) => {
                info!(%output, "Switch command placed successfully");
                Ok(())
            }
            // Non-zero exit is the switch's answer; log it and move on.
            Err(Error::Switch(e)) => {
                error!(error = %e, "Error placing call");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
