//! Persistence layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define the collaborator contract the hierarchy engine depends on.
//! - Isolate SQL details and transaction boundaries from the engine.
//!
//! # Invariants
//! - Item mutation and forest save inside one logical operation commit or
//!   roll back together.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod store;
