//! API endpoint handlers, one module per route group.

pub mod analyze;
pub mod brands;
pub mod collection;
pub mod history;
pub mod probe;
