//! Best-effort persistence of authenticated search history.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use postgres::{Client, NoTls};
use uuid::Uuid;

/// Blocking writer for the search-history table.
///
/// History is advisory: callers run [`HistoryStore::record`] on a detached
/// task and treat any error as log-and-drop, so a broken history table can
/// never fail a search.
pub struct HistoryStore {
    client: Mutex<Client>,
    insert_sql: String,
}

impl HistoryStore {
    /// Connects to Postgres and prepares the insert statement for the given
    /// table.
    pub fn connect(database_url: &str, table: &str) -> Result<Self> {
        anyhow::ensure!(
            !table.trim().is_empty()
                && table
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_'),
            "history table name may only contain alphanumerics and underscores, got {table:?}"
        );
        let client = Client::connect(database_url, NoTls)
            .context("failed to connect to the history database")?;
        Ok(Self {
            client: Mutex::new(client),
            insert_sql: format!("INSERT INTO \"{table}\" (user_id, query) VALUES ($1, $2)"),
        })
    }

    /// Records one search against a user.
    ///
    /// The row timestamp is assigned by the database default. This never
    /// retries: a dropped history row is cheaper than a delayed search.
    pub fn record(&self, user: Uuid, query: &str) -> Result<()> {
        let mut client = self.client.lock();
        client
            .execute(self.insert_sql.as_str(), &[&user, &query])
            .context("history insert failed")?;
        Ok(())
    }
}
