use anyhow::{Context, Result};

use pickwire::clock::SystemClock;
use pickwire::config::{EngineConfig, db_path_arg};
use pickwire::engine::Engine;
use pickwire::http_client::build_http_client;
use pickwire::logging;
use pickwire::providers::default_providers;
use pickwire::store::SqliteStore;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut config = EngineConfig::from_env();
    if let Some(path) = db_path_arg(&args) {
        config.db_path = Some(path);
    }
    let db_path = config
        .db_path
        .clone()
        .context("unable to resolve sqlite path")?;

    let store = SqliteStore::open(&db_path)?;
    let client = build_http_client(config.http_timeout_secs)?;
    let providers = default_providers(&config, client);
    let mut engine = Engine::new(store, SystemClock, providers, config);

    let summary = engine.run_pass()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("serialize pass summary")?
    );
    Ok(())
}
