use sqlx::postgres::{PgPool, PgPoolOptions};

/// Thin wrapper around the connection pool, mirroring the shape every
/// service expects (`db.pool.clone()`) without exposing pool-tuning
/// details at every call site.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}
