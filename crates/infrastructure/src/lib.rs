//! Tokenwarden Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod persistence;
pub mod serialization;
pub mod wiring;

pub use adapters::SystemClock;
pub use auth::ReqwestRefreshClient;
pub use config::{
    ConfigError, default_token_path, load_settings, read_settings, resolve_token_path,
};
pub use persistence::{FileTokenStore, TokioFileSystem};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};
pub use wiring::build_auth_gate;
