use crate::cli::ConfigArgs;
use crate::config::Config;
use crate::database;
use crate::store::{CacheStore, RedisStore};
use anyhow::{Context, Result};
use std::time::Instant;

pub async fn execute(args: &ConfigArgs) -> Result<()> {
    let config = Config::from_file(&args.config)?;

    let start = Instant::now();
    let store = RedisStore::connect(&config.redis)
        .await
        .context("Failed to connect to Redis")?;
    store.ping().await.context("Redis ping failed")?;
    println!("✅ Redis reachable ({:?})", start.elapsed());

    if let Some(db_config) = &config.database {
        let start = Instant::now();
        let db = database::connect(db_config)
            .await
            .context("Failed to connect to database")?;
        database::ping(&db).await.context("Database ping failed")?;
        println!("✅ Database reachable ({:?})", start.elapsed());
    } else {
        println!("- Database not configured, skipped");
    }
    Ok(())
}
