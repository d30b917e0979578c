//! Potluck Engine library.
//!
//! The condition evaluation and settlement engine for potluck events. It
//! evaluates condition groups against live participation data, drives the
//! event lifecycle (IN_PROGRESS to FINISHED or FAILED), pays out finished
//! events exactly once, and fans out achievement progress updates.
//!
//! ## Structure
//!
//! - `use_cases/` - Condition tracking, lifecycle, settlement, achievements
//! - `infrastructure/` - Ports and adapters (stores, notifier, clock, RNG)
//! - `app` - Application composition
//!
//! Transport, persistence, and authentication are collaborator concerns:
//! embedders hand the [`App`] their store implementations and call the hooks
//! when participations change or the periodic time check fires.

pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// E2E flow tests over the in-memory adapters.
#[cfg(test)]
mod e2e_tests;

pub use app::{App, Stores};
