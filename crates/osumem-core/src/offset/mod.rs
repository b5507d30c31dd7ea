//! Versioned offset tables.
//!
//! This module contains:
//! - `OffsetTable` - field locators for one family of game versions
//! - `builtin` - the compiled-in table for the stable client
//! - `OffsetRegistry` - the tables version detection picks from
//! - `AnchorCache` - signature scan results for one attach cycle

mod anchors;
pub mod builtin;
mod detect;
#[doc(hidden)]
pub mod fixture;
mod loader;
mod table;

pub use anchors::AnchorCache;
pub use builtin::stable_table;
pub use detect::detect_table;
pub use loader::{OffsetRegistry, load_table, parse_table, save_table};
pub use table::{AnchorEntry, FieldEntry, Locator, OffsetTable, fields};
