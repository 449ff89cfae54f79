//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the token lifecycle core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod file_system;
mod refresh_client;
mod token_store;

pub use clock::{Clock, ManualClock};
pub use file_system::{FileSystem, FileSystemError};
pub use refresh_client::{RefreshClient, RefreshError};
pub use token_store::{StoreError, TokenStore};
