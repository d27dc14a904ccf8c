//! Common types module for the order desk system.
//!
//! This module defines the core data types and structures used throughout
//! the desk system. It provides a centralized location for shared types
//! to ensure consistency across all desk components.

/// Application and review types for the claim workflow.
pub mod application;
/// Channel synchronization request types.
pub mod events;
/// Order types including the status lifecycle and history ledger.
pub mod order;
/// Utility functions shared across crates.
pub mod utils;

// Re-export all types for convenient access
pub use application::*;
pub use events::*;
pub use order::*;
pub use utils::current_timestamp;
