use diesel::{Connection, ConnectionError, RunQueryDsl, SqliteConnection};
use diesel_migrations::MigrationHarness;

use crate::{
    MIGRATIONS,
    tournaments::rounds::results::{DebateResult, ResultBuffer, ResultError},
};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not open the database at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: ConnectionError,
    },
    #[error("could not apply migrations: {0}")]
    Migration(String),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// Opens the database at `url` (`:memory:` for a throwaway database) and
/// brings its schema up to date.
#[tracing::instrument]
pub fn connect(url: &str) -> Result<SqliteConnection, StateError> {
    let mut conn = SqliteConnection::establish(url).map_err(|source| {
        StateError::Connection {
            url: url.to_string(),
            source,
        }
    })?;

    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
    diesel::sql_query("PRAGMA busy_timeout = 5000").execute(&mut conn)?;

    let applied = migrate(&mut conn)?;
    if !applied.is_empty() {
        tracing::info!("applied migrations: {}", applied.join(", "));
    }

    Ok(conn)
}

/// Runs any pending migrations, returning the versions that were applied.
pub fn migrate(conn: &mut SqliteConnection) -> Result<Vec<String>, StateError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StateError::Migration(e.to_string()))?;
    Ok(applied.into_iter().map(|version| version.to_string()).collect())
}

/// Saves the result inside an immediate transaction. SQLite takes the write
/// lock when the transaction begins, so two saves of the same ballot are
/// serialized, and a save that fails part of the way through leaves nothing
/// behind.
#[tracing::instrument(skip_all, fields(ballot = %result.ballot().id))]
pub fn save_atomically(
    result: &DebateResult,
    conn: &mut SqliteConnection,
) -> Result<(), ResultError> {
    conn.immediate_transaction(|conn| result.save(conn))
}
