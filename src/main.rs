use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

mod models;
mod repositories;
pub mod services;
pub mod settings;

use repositories::kv::{KeyValueStore, MemoryStore, RedisStore};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log4rs).expect("Failed to initialize logging.");

    let config = settings::Settings::new(&args.config).expect("Could not load config file.");

    let conn = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .connect(&config.postgres.url)
        .await
        .expect("Could not connect to database.");

    sqlx::migrate!("./migrations")
        .run(&conn)
        .await
        .expect("Could not run database migrations.");

    let kv: Arc<dyn KeyValueStore> = match &config.redis {
        Some(redis) => Arc::new(
            RedisStore::connect(&redis.url)
                .await
                .expect("Could not connect to Redis."),
        ),
        None => {
            log::warn!("No [redis] section in config, using the in-process key-value store.");
            Arc::new(MemoryStore::new())
        }
    };

    log::info!("Starting services.");
    services::start_services(conn, kv, config)
        .await
        .expect("Could not start services.");
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => Ok(()),
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
