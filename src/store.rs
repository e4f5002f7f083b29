//! Request store access
//!
//! Reads pending callback requests from the FusionPBX database and removes
//! them once a dispatch attempt has been made. This module never inserts
//! rows or writes status values; the schema is owned by FusionPBX.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::{Config, Error, Result};

/// A pending callback request row from `v_busy_extensions`
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    pub id: i64,
    pub from_extension: String,
    pub to_extension: String,
    /// Opaque dialog reference; carried but never interpreted
    pub dialog_uuid: String,
    pub domain_name: String,
}

/// Read/delete surface over the request store
#[async_trait]
pub trait CallbackStore: Send + Sync {
    /// All requests still in `pending` status, in store order
    async fn fetch_pending(&self) -> Result<Vec<CallbackRequest>>;

    /// Remove one request row; an error must leave the row pending
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Pooled connection to the FusionPBX request store
#[derive(Clone)]
pub struct RequestStore {
    pool: Pool,
}

impl RequestStore {
    /// Create the connection pool
    pub fn new(config: &Config) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .database_url
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid database URL: {}", e)))?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = Manager::from_config(pg_config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;

        debug!(max_size = config.pool_size, "Request store pool created");

        Ok(Self { pool })
    }
}

#[async_trait]
impl CallbackStore for RequestStore {
    async fn fetch_pending(&self) -> Result<Vec<CallbackRequest>> {
        let client = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        let rows = client
            .query(
                "SELECT id, from_extension, to_extension, dialog_uuid, domain_name \
                 FROM v_busy_extensions WHERE status = 'pending'",
                &[],
            )
            .await?;

        let requests = rows
            .into_iter()
            .map(|row| CallbackRequest {
                id: row.get(0),
                from_extension: row.get(1),
                to_extension: row.get(2),
                dialog_uuid: row.get(3),
                domain_name: row.get(4),
            })
            .collect::<Vec<_>>();

        info!(pending = requests.len(), "Fetched pending callback requests");

        Ok(requests)
    }

    /// Delete one request row in its own transaction.
    ///
    /// An uncommitted transaction rolls back when dropped, so any error on
    /// the way out leaves the row pending for the next pass.
    async fn delete(&self, id: i64) -> Result<()> {
        let mut client = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        let tx = client.transaction().await?;
        tx.execute("DELETE FROM v_busy_extensions WHERE id = $1", &[&id])
            .await?;
        tx.commit().await?;

        info!(id, "Deleted callback request record");

        Ok(())
    }
}
