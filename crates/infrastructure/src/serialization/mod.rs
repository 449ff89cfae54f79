//! Deterministic JSON serialization for the token file.
//!
//! Output uses 2-space indentation and a trailing newline so the file is
//! readable and diffs cleanly when inspected by hand.

mod json;

pub use json::*;
