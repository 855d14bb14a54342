//! Pure naming rules for exported note files.
//!
//! # Responsibility
//! - Embed and recover note identity in exported file names.
//! - Map Bear tags to folders relative to the export root.
//!
//! # Invariants
//! - Nothing in this module performs I/O.
//! - An encoded name always decodes back to the identity it was built from.

pub mod path_codec;
