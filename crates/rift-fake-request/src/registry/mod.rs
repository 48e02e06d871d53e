//! Fake request registry.
//!
//! The registry records every request created through its constructor since
//! the last reset, queues response rules, holds an optional broadcast
//! response, and runs the dispatch pass that applies them.

mod core;

#[cfg(test)]
mod tests;

pub use self::core::{MatchRule, Registry};
