//! Full-flow tests over the in-memory adapters.
//!
//! Each test seeds an event with condition groups and participations,
//! drives the engine through its public hooks, and asserts on the stores
//! and the recorded notifications. No mocks: this is the whole engine as
//! an embedder would run it, minus real persistence and transport.

mod e2e_helpers;


pub use e2e_helpers::*;
