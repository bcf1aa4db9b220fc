//! Pre-execution certification of bundled portal calldata.
//!
//! A portal payload carries many sub-operations in one blob of ABI-encoded
//! calldata. This crate decodes such a blob without trusting a single
//! offset or length in it, then certifies every decoded operation against
//! an allow-list policy: which targets may be called, which selectors are
//! granted per target, how much value an operation may forward, and how
//! deep bundles may nest. The result is a [`Verdict`]: certified or
//! rejected for exactly one reason, plus an audit trace of every
//! operation examined.
//!
//! Certification is advisory and stateless. It holds no funds and sends
//! no transactions; it answers, before anything is signed, whether a
//! payload stays inside policy.
//!
//! ```
//! use alloy_primitives::{address, U256};
//! use portal_policy::shapes::ERC20_TRANSFER;
//! use portal_policy::{CalldataCertifier, Operation, PolicyConfig};
//!
//! let usdc = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
//! let config = PolicyConfig::new(
//!     address!("b0324286B3ef7dDdC93Fb2fF7c8B7B8a3524803c"),
//!     vec![usdc],
//! )
//! .allow_call(usdc, ERC20_TRANSFER);
//! let certifier = CalldataCertifier::from_config(config)?;
//!
//! let payload = portal_policy_encoder::encode_batch(&[Operation::new(
//!     usdc,
//!     U256::ZERO,
//!     ERC20_TRANSFER,
//!     vec![0u8; 64],
//! )]);
//! assert!(certifier.certify(&payload).ok());
//! # Ok::<(), portal_policy::InvalidPolicy>(())
//! ```

pub mod cursor;
pub mod decoder;
pub mod errors;
pub mod registry;
pub mod validator;
pub mod verdict;

pub use errors::{DecodeError, InvalidPolicy, OpPath, RejectReason};
pub use registry::{PolicyConfig, PolicyRegistry, DEFAULT_RECURSION_DEPTH};
pub use verdict::{CalldataCertifier, TraceEntry, Verdict};

pub use portal_policy_types::{shapes, Bundle, Operation, Selector};
