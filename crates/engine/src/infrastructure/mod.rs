//! Infrastructure layer: port traits and the adapters that implement them.

pub mod clock;
pub mod logging;
pub mod memory;
pub mod ports;
