//! Domain model shared by both sides of a sync pass.
//!
//! # Responsibility
//! - Define the record shapes read from the Bear database and the export tree.
//! - Own the epoch conversion between filesystem mtimes and store timestamps.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId` on both sides.
//! - All timestamps compared across sides are expressed as `StoreTime`.

pub mod note;
pub mod timestamp;
