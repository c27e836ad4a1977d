//! Detection module - picks the dialect parser for a decoded statement.

mod dispatcher;

#[cfg(test)]
mod dispatcher_tests;

pub use dispatcher::{detect_dialect, select_parser};
