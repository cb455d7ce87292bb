// Core modules
pub mod classifier;
pub mod config;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod history;
pub mod models;
pub mod risk;
pub mod telemetry;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::Engine;
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
