use crate::cache::NOT_FOUND_PLACEHOLDER;
use crate::cli::InspectArgs;
use crate::config::Config;
use crate::store::{CacheStore, RedisStore};
use anyhow::{Context, Result};

pub async fn execute(args: &InspectArgs) -> Result<()> {
    let config = Config::from_file(&args.config.config)?;
    let store = RedisStore::connect(&config.redis)
        .await
        .context("Failed to connect to Redis")?;

    let Some(data) = store.get(&args.key).await? else {
        println!("{}: <absent>", args.key);
        return Ok(());
    };
    let ttl = store.ttl(&args.key).await?;

    if data == NOT_FOUND_PLACEHOLDER {
        println!("{}: <not-found placeholder>", args.key);
    } else if config.cache.compress {
        println!("{}: <{} compressed bytes>", args.key, data.len());
    } else {
        println!("{}: {}", args.key, String::from_utf8_lossy(&data));
    }
    match ttl {
        Some(ttl) => println!("ttl: {:?}", ttl),
        None => println!("ttl: none"),
    }
    Ok(())
}
