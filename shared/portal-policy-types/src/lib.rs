//! Shared types for the portal calldata policy engine.
//!
//! Both the certification engine and the off-path encoder tooling work with
//! decoded bundles and the recognized wire shapes, so those live here.

pub mod operation;
pub mod shapes;

pub use alloy_primitives::Selector;
pub use operation::{Bundle, Operation};
