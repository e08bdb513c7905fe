//! Inventory domain module.
//!
//! Item records and the read-side filter used when requesters browse
//! equipment. Pure data and validation (no IO, no HTTP, no storage).

pub mod item;
pub mod query;

pub use item::{Item, ItemPatch, NewItem};
pub use query::ItemQuery;
