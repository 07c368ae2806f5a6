//! SQLite persistence for the poll loop state.
//!
//! Only one row is ever stored: the checkpoint plus both dedup slots, so a
//! restarted bot neither re-announces a status nor skips the window it was
//! down for. External modules import from `hw_watchbot::db`.

pub mod repo;

pub use repo::*;
