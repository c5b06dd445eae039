//! # System Interaction Layer
//!
//! Boundary between the shell core and the outside world.
//!
//! ## Modules
//!
//! - **`provider`**: the `ResourceProvider` trait and the inventory-file
//!   implementation used offline and in tests.
//! - **`fanout`**: bounded, cancellable multi-region discovery on a `rayon` pool.

pub mod fanout;
pub mod provider;
