// Port traits define the full contract - some methods are for future use
#![allow(dead_code)]

//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine: the persistence stores the
//! evaluation and settlement paths read and write, the notification bus for
//! live updates, and testability ports for time and randomness. Everything is
//! injected at construction; there is no runtime lookup of collaborators.

mod error;
mod notifier;
mod repos;
mod testing;

pub use error::{NotifyError, StoreError};
pub use notifier::*;
pub use repos::*;
pub use testing::*;
