pub mod bundle;
pub mod canonical;
pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod http_client;
pub mod live_cache;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod providers;
pub mod settlement;
pub mod status;
pub mod store;
