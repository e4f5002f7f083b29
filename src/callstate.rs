//! Availability checks against the FreeSWITCH call-state database
//!
//! FreeSWITCH keeps active dialogs in its sofia registration database
//! (SQLite). An extension is considered busy if it appears in any
//! `sip_dialogs` row, in either role column. The database is opened per
//! check: it belongs to the switch, and a momentarily unreadable file
//! must defer individual pairs rather than abort the whole pass.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use tracing::{debug, warn};

use crate::Result;

/// Read-only view over the sofia registration database
#[derive(Debug, Clone)]
pub struct CallStateDb {
    path: String,
}

impl CallStateDb {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// True iff neither extension appears in any active dialog.
    ///
    /// Fail-safe policy: any open or query error is reported as busy, so a
    /// broken call-state database never causes a dispatch.
    pub async fn extensions_free(&self, from_extension: &str, to_extension: &str) -> bool {
        match self.query_dialogs(from_extension, to_extension).await {
            Ok(free) => {
                debug!(
                    from = %from_extension,
                    to = %to_extension,
                    free,
                    "Checked extension availability"
                );
                free
            }
            Err(e) => {
                warn!(
                    from = %from_extension,
                    to = %to_extension,
                    error = %e,
                    "Call-state query failed, treating extensions as busy"
                );
                false
            }
        }
    }

    async fn query_dialogs(&self, from_extension: &str, to_extension: &str) -> Result<bool> {
        let mut conn = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .connect()
            .await?;

        let row = sqlx::query(
            "SELECT 1 FROM sip_dialogs \
             WHERE sip_from_user = ? OR sip_to_user = ? \
                OR sip_from_user = ? OR sip_to_user = ? \
             LIMIT 1",
        )
        .bind(from_extension)
        .bind(from_extension)
        .bind(to_extension)
        .bind(to_extension)
        .fetch_optional(&mut conn)
        .await?;

        Ok(row.is_none())
    }
}
