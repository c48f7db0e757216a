//! Database initialization for the application's SQLite schema.

use rusqlite::Connection;

use crate::{
    Error, budget::create_budget_table, transaction::create_transaction_table,
};

/// Create the application's tables in the database, if they do not exist.
///
/// # Errors
/// Returns an [Error::SqlError] if a table or index cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    create_transaction_table(connection)?;
    create_budget_table(connection)?;

    Ok(())
}
