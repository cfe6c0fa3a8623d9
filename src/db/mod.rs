pub mod registry;
pub mod schema;

use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::models::{
    ClientFilter, ClientId, ClientRecord, ClientUpdate, NewClient, PhoneId, PhoneNumber,
};

/// Database connection pool
///
/// Each method checks out one connection and runs a single registry
/// operation on it. Callers that want to drive a connection themselves use
/// [`registry`] and [`schema`] directly.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    async fn connection(&self) -> Result<PoolConnection<Postgres>> {
        Ok(self.pool.acquire().await?)
    }

    // Schema operations
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        schema::ensure_schema(&mut conn).await
    }

    pub async fn reset_schema(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        schema::reset_schema(&mut conn).await
    }

    pub async fn initialize_schema(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        schema::initialize_schema(&mut conn).await
    }

    // Client operations
    pub async fn add_client(&self, client: &NewClient) -> Result<ClientId> {
        let mut conn = self.connection().await?;
        registry::add_client(&mut conn, client).await
    }

    pub async fn update_client(&self, client_id: ClientId, update: &ClientUpdate) -> Result<()> {
        let mut conn = self.connection().await?;
        registry::update_client(&mut conn, client_id, update).await
    }

    pub async fn delete_client(&self, client_id: ClientId) -> Result<bool> {
        let mut conn = self.connection().await?;
        registry::delete_client(&mut conn, client_id).await
    }

    pub async fn find_client(&self, filter: &ClientFilter) -> Result<Vec<ClientId>> {
        let mut conn = self.connection().await?;
        registry::find_client(&mut conn, filter).await
    }

    pub async fn get_client(&self, client_id: ClientId) -> Result<ClientRecord> {
        let mut conn = self.connection().await?;
        registry::get_client(&mut conn, client_id).await
    }

    // Phone operations
    pub async fn add_phone(&self, client_id: ClientId, number: &str) -> Result<PhoneId> {
        let mut conn = self.connection().await?;
        registry::add_phone(&mut conn, client_id, number).await
    }

    pub async fn delete_phone(&self, client_id: ClientId, pattern: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        registry::delete_phone(&mut conn, client_id, pattern).await
    }

    pub async fn list_phones(&self, client_id: ClientId) -> Result<Vec<PhoneNumber>> {
        let mut conn = self.connection().await?;
        registry::list_phones(&mut conn, client_id).await
    }
}

/// Initialize the database connection pool and make sure the registry
/// tables exist.
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;
    db.ensure_schema().await?;

    info!(max_connections = config.max_connections, "Database connection established");
    Ok(db)
}
