//! Ordered-forest hierarchy engine primitives.
//!
//! # Responsibility
//! - Persist and restore each collection's ordered forest (codec).
//! - Reconcile the forest with the authoritative entity set and provide the
//!   structural mutations the engine facade composes (relations).
//!
//! # Invariants
//! - The forest is advisory ordering/nesting metadata; item existence is
//!   decided by the entity set alone.
//! - All functions are pure and return new forest values.

pub mod codec;
pub mod relations;
