//! Core engine for the order desk system.
//!
//! This module provides the order state machine and the orchestration
//! around it: validated status transitions with an append-only history
//! ledger, post-commit channel synchronization, and the builder/engine
//! pair used to assemble a running desk from pluggable storage and
//! channel implementations.

pub mod builder;
pub mod engine;
pub mod service;
pub mod state;
pub mod sync;

pub use builder::{BuilderError, DeskBuilder, DeskFactories};
pub use engine::{DeskEngine, EngineError};
pub use service::{OrderFlowError, OrderFlowService};
pub use sync::ChannelSyncWorker;
