//! Adapters for runtime services.

mod system_clock;

pub use system_clock::SystemClock;
