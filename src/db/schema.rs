//! Creation and removal of the registry tables.

use sqlx::{Connection, PgConnection, Postgres, Transaction};
use tracing::info;

use crate::error::{RegistryError, Result};

const CREATE_CLIENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS clients (
        id SERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        surname VARCHAR(50) NOT NULL,
        email VARCHAR(50) NOT NULL,
        CONSTRAINT clients_email_key UNIQUE (email)
    )
"#;

const CREATE_NUMBERS: &str = r#"
    CREATE TABLE IF NOT EXISTS numbers (
        id SERIAL PRIMARY KEY,
        number VARCHAR(20) NOT NULL,
        client_id INTEGER NOT NULL,
        CONSTRAINT numbers_client_id_fkey FOREIGN KEY (client_id) REFERENCES clients (id)
    )
"#;

const CREATE_NUMBERS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS numbers_client_id_idx ON numbers (client_id)";

// numbers references clients, so it goes first
const DROP_TABLES: [&str; 2] = ["DROP TABLE IF EXISTS numbers", "DROP TABLE IF EXISTS clients"];

/// Create both tables if they are missing. Existing data is left alone.
pub async fn ensure_schema(conn: &mut PgConnection) -> Result<()> {
    let mut tx = conn.begin().await.map_err(RegistryError::Schema)?;
    create_tables(&mut tx).await?;
    tx.commit().await.map_err(RegistryError::Schema)?;

    info!("Registry schema ensured");
    Ok(())
}

/// Drop both tables and everything in them.
pub async fn reset_schema(conn: &mut PgConnection) -> Result<()> {
    let mut tx = conn.begin().await.map_err(RegistryError::Schema)?;
    drop_tables(&mut tx).await?;
    tx.commit().await.map_err(RegistryError::Schema)?;

    info!("Registry schema dropped");
    Ok(())
}

/// Drop and recreate both tables in one transaction, yielding an empty
/// registry. Either the whole new schema is in place afterwards or the old
/// one is untouched.
pub async fn initialize_schema(conn: &mut PgConnection) -> Result<()> {
    let mut tx = conn.begin().await.map_err(RegistryError::Schema)?;
    drop_tables(&mut tx).await?;
    create_tables(&mut tx).await?;
    tx.commit().await.map_err(RegistryError::Schema)?;

    info!("Registry schema initialized from scratch");
    Ok(())
}

async fn create_tables(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
    for statement in [CREATE_CLIENTS, CREATE_NUMBERS, CREATE_NUMBERS_INDEX] {
        sqlx::query(statement)
            .execute(&mut **tx)
            .await
            .map_err(RegistryError::Schema)?;
    }
    Ok(())
}

async fn drop_tables(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
    for statement in DROP_TABLES {
        sqlx::query(statement)
            .execute(&mut **tx)
            .await
            .map_err(RegistryError::Schema)?;
    }
    Ok(())
}
