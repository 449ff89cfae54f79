//! Loading client settings from disk.

mod settings_file;

pub use settings_file::{
    ConfigError, default_token_path, load_settings, read_settings, resolve_token_path,
};
