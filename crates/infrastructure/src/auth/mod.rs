//! Token endpoint adapters.

mod refresh_client;

pub use refresh_client::ReqwestRefreshClient;
