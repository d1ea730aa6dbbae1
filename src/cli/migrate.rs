use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub struct MigrationOpts {
    pub database_url: String,
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

pub async fn run_migrations(opts: MigrationOpts) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&opts.database_url)
        .await?;

    info!("Running database migrations.");

    MIGRATOR.run(&pool).await?;

    info!("Finished running database migrations.");

    Ok(())
}
