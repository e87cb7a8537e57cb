//! Meta-information about the proxied PostgreSQL database.
//!
//! The only place in the crate that talks to PostgreSQL through a SQL
//! driver rather than the wire codec. Result-set rewriting will need the
//! OID→table mapping to decide which columns a row came from.

use std::collections::HashMap;

use tokio_postgres::NoTls;
use tracing::error;

use crate::errors::Result;

// -----------------------------------------------------------------------------
// ----- Table -----------------------------------------------------------------

/// Fully qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub schema: String,
    pub name: String,
}

// -----------------------------------------------------------------------------
// ----- Inspector -------------------------------------------------------------

/// Inspects a PostgreSQL database over a regular driver connection.
pub struct Inspector {
    client: tokio_postgres::Client,
}

impl Inspector {
    /// Connect to the database with the given connection string and verify
    /// the connection actually works.
    pub async fn connect(conn_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(conn_string, NoTls).await?;

        // The connection object drives the socket; it needs its own task.
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!("pgmeta: connection error: {err}");
            }
        });

        Ok(Self { client })
    }

    /// Name of the connected database (e.g. `gevulot_test`).
    pub async fn database_name(&self) -> Result<String> {
        let row = self.client.query_one("SELECT current_database();", &[]).await?;

        Ok(row.try_get(0)?)
    }

    /// Mapping from table OID to table name for every user-visible table,
    /// view and materialized view.
    pub async fn oid_table_mapping(&self) -> Result<HashMap<u32, Table>> {
        let rows = self
            .client
            .query(
                r#"
                SELECT c.oid AS oid
                     , c.relname AS table
                     , n.nspname AS schema
                  FROM pg_class c
                  JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                 WHERE n.nspname NOT IN ('information_schema')
                   AND n.nspname NOT LIKE 'pg_%'
                   AND c.relkind IN ('r', 'm', 'v');
                "#,
                &[],
            )
            .await?;

        let mut mapping = HashMap::with_capacity(rows.len());

        for row in rows {
            let oid: u32 = row.try_get("oid")?;
            let name: String = row.try_get("table")?;
            let schema: String = row.try_get("schema")?;

            mapping.insert(oid, Table { schema, name });
        }

        Ok(mapping)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
