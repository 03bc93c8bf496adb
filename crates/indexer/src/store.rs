use std::time::Duration;

use anyhow::{bail, Context};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use sqlblock::Block;


/// Destination of decoded blocks plus the durable cursor position.
pub(crate) trait BlockStore {
    /// Height of the last committed block, if any.
    async fn max_height(&self) -> anyhow::Result<Option<u64>>;

    /// Persists the block, its transactions and logs in one atomic operation.
    async fn insert_block(&self, block: &Block) -> anyhow::Result<()>;
}


pub struct SqlStore {
    pool: PgPool,
    insert_timeout: Duration,
}


impl SqlStore {
    pub async fn connect(database_url: &str, insert_timeout: Duration) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .with_context(|| format!("unable to connect to database {database_url}"))?;

        Ok(Self {
            pool,
            insert_timeout,
        })
    }
}


impl BlockStore for SqlStore {
    async fn max_height(&self) -> anyhow::Result<Option<u64>> {
        let height: Option<i64> = sqlx::query_scalar("SELECT MAX(\"height\") FROM \"block\"")
            .fetch_one(&self.pool)
            .await?;
        Ok(height.map(|height| height as u64))
    }

    async fn insert_block(&self, block: &Block) -> anyhow::Result<()> {
        let mut statement = sqlblock::insert_statement(block)?;
        let execution = statement.build().execute(&self.pool);

        match tokio::time::timeout(self.insert_timeout, execution).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => bail!(
                "import of block {} timed out after {:?}",
                block.height,
                self.insert_timeout
            ),
        }
    }
}
