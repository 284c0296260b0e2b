use crate::cli::ConfigArgs;
use crate::config::Config;
use anyhow::{Context, Result};

pub fn execute(args: &ConfigArgs) -> Result<()> {
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Invalid config: {}", args.config.display()))?;

    let cache = &config.cache;
    println!("=== {} ===\n", args.config.display());
    println!("name:               {}", cache.name);
    println!("expiry:             {}s", cache.expiry_secs);
    println!("not found expiry:   {}s", cache.not_found_expiry_secs);
    println!("expiry deviation:   {}", cache.expiry_deviation);
    match cache.query_timeout_ms {
        Some(ms) => println!("query timeout:      {}ms", ms),
        None => println!("query timeout:      none"),
    }
    println!("compress:           {}", cache.compress);
    println!("redis mode:         {:?}", config.redis.mode);
    println!(
        "redis timeouts:     connect {}ms, command {}ms",
        config.redis.connection_timeout_ms, config.redis.command_timeout_ms
    );
    match &config.database {
        Some(db) => println!(
            "database pool:      {}..{} connections",
            db.min_connections, db.max_connections
        ),
        None => println!("database:           not configured"),
    }
    println!("\n✅ Configuration is valid");
    Ok(())
}
