//! Calldata construction for portal bundle shapes.
//!
//! The inverse of the engine's decoder, built on the canonical ABI
//! encoder so hand-rolled decoding is always checked against an
//! independent implementation. Lives outside the certification path:
//! nothing here runs when a payload is judged.

pub mod encoder;

pub use encoder::{
    composite_operation, composite_params, encode_batch, encode_shortcut, RawBatch, RouteHead,
};
