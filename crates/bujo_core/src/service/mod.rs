//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate authorization, relations processing and persistence into
//!   the operations callers invoke.
//! - Keep transport layers decoupled from storage details.

pub mod engine;
