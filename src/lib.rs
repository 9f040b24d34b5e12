pub mod codec;
pub mod config;
pub mod eval;
pub mod models;
pub mod render;
pub mod store;
pub mod telemetry;
