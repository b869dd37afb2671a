//! Background Tasks Module
//!
//! The cache never spawns anything itself. These helpers let a caller own a
//! periodic sweep so an idle cache still releases its stale entries.
//!
//! # Tasks
//! - Purge: runs a full expiration sweep at a fixed interval

mod purge;

pub use purge::{spawn_purge_task, MIN_PURGE_TICK};
