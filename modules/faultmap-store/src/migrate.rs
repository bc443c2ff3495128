use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

/// Run the embedded SQL migrations. Idempotent.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Report store migrations applied");
    Ok(())
}
