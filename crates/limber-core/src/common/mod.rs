pub mod config;
pub mod constants;

pub use config::{load_engine_config, EngineConfig};
