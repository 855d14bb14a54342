//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, tree, and reconciler calls into a sync pass.
//! - Keep the scheduler decoupled from storage details.

pub mod sync_service;
