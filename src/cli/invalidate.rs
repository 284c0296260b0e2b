use crate::cli::InvalidateArgs;
use crate::config::Config;
use crate::store::{CacheStore, RedisStore};
use anyhow::{Context, Result};
use std::io::Write;

pub async fn execute(args: &InvalidateArgs) -> Result<()> {
    let config = Config::from_file(&args.config.config)?;

    if !args.yes {
        println!("Preparing to delete {} key(s):", args.keys.len());
        for key in &args.keys {
            println!("  - {}", key);
        }
        print!("\nDo you want to continue? [y/N]: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "y" {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let store = RedisStore::connect(&config.redis)
        .await
        .context("Failed to connect to Redis")?;
    store
        .del(&args.keys)
        .await
        .context("Failed to delete keys")?;

    println!("✅ Invalidated {} key(s)", args.keys.len());
    Ok(())
}
