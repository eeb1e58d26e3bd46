#![allow(clippy::collapsible_if)]

pub mod action;
pub mod config;
pub mod core;
pub mod logging;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use action::Action;
pub use crate::core::{
    Column, ColumnCatalog, ColumnType, Combinator, Condition, Forest, Group, NodeId,
};
pub use services::{FilterSink, JsonFileSink, MemorySink, SaveTarget};
pub use session::{CommitMode, EditingSession, Outcome, SessionError, SessionPolicy};
