use anyhow::{Context, Result, anyhow};

use pickwire::clock::SystemClock;
use pickwire::config::{EngineConfig, arg_value, db_path_arg};
use pickwire::engine::Engine;
use pickwire::logging;
use pickwire::providers::parse_score_string;
use pickwire::store::{SqliteStore, stale_games};

const USAGE: &str = "usage: resolve_stale --game <id> (--cancel | --score H-A) [--db <path>]\n       resolve_stale --list [--db <path>]";

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

    if args.iter().any(|a| a == "--list") {
        return list_stale(&store);
    }

    let game_id = arg_value(&args, "--game")
        .ok_or_else(|| anyhow!(USAGE))?
        .parse::<i64>()
        .context("--game expects a numeric id")?;

    let mut engine = Engine::new(store, SystemClock, Vec::new(), config);
    let outcome = if args.iter().any(|a| a == "--cancel") {
        engine.resolve_stale_game(game_id)?
    } else if let Some(raw) = arg_value(&args, "--score") {
        let (home, away) =
            parse_score_string(&raw).ok_or_else(|| anyhow!("--score expects H-A, got {raw:?}"))?;
        engine.correct_score(game_id, home, away)?
    } else {
        return Err(anyhow!(USAGE));
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).context("serialize outcome")?
    );
    Ok(())
}

fn list_stale(store: &SqliteStore) -> Result<()> {
    let stale = stale_games(store)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&stale).context("serialize stale games")?
    );
    Ok(())
}
