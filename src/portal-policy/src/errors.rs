//! Failure taxonomy of the certification engine.
//!
//! Structural failures ([`DecodeError`]) abort decoding before any bundle
//! reaches the validator. Policy violations ([`RejectReason`]) are carried
//! in the verdict together with the position of the offending operation.
//! [`InvalidPolicy`] is configuration-time only: a policy that fails
//! validation never becomes a registry.

use alloy_primitives::{Address, Selector, U256};
use serde::Serialize;
use thiserror::Error;

/// Structural failure while decoding a bundle payload.
///
/// Decoding is all-or-nothing: any of these aborts the decode and no
/// partial bundle is exposed.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
pub enum DecodeError {
    /// A read fell outside its region: a fixed-width read past the end, an
    /// offset pointing past the region, or an offset/length word too large
    /// to address anything (reported with the offset saturated).
    #[error("read of {needed} bytes at offset {offset} exceeds region of {region_len} bytes")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        region_len: usize,
    },

    /// The outer selector does not match any recognized bundle shape.
    #[error("unrecognized outer selector {selector}")]
    UnrecognizedSelector { selector: Selector },

    /// The parallel arrays of a batch payload disagree on element count.
    #[error(
        "arity mismatch: targets={targets}, values={values}, opcodes={opcodes}, payloads={payloads}"
    )]
    ArityMismatch {
        targets: usize,
        values: usize,
        opcodes: usize,
        payloads: usize,
    },

    /// Nested bundles go deeper than the registry's recursion cap.
    #[error("recursion limit exceeded: bundle at depth {depth}, cap is {cap}")]
    RecursionLimitExceeded { depth: usize, cap: usize },
}

/// Configuration-time failure: the supplied policy cannot form a usable
/// registry. Fatal for construction; no registry is produced.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
pub enum InvalidPolicy {
    /// The router address is zero.
    #[error("invalid policy: router address is zero")]
    ZeroRouter,

    /// The target allow-list is empty; a registry that can certify nothing
    /// is a misconfiguration, not a policy.
    #[error("invalid policy: target allow-list is empty")]
    EmptyAllowList,

    /// The zero address was allow-listed.
    #[error("invalid policy: zero address in the target allow-list")]
    ZeroTarget,

    /// The router appeared in the target allow-list. The router is the
    /// entry point, never a callable sub-target.
    #[error("invalid policy: router {0} listed as an allowed target")]
    RouterInAllowList(Address),

    /// A per-target selector rule names a target outside the allow-list.
    #[error("invalid policy: selector rules for {0} which is not an allowed target")]
    CallOnUnlistedTarget(Address),

    /// The recursion cap is zero, which would reject even an un-nested
    /// bundle.
    #[error("invalid policy: recursion depth cap must be at least 1")]
    ZeroRecursionCap,
}

/// Why a bundle was rejected. Carried in the verdict.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
pub enum RejectReason {
    /// The payload never yielded a bundle.
    #[error("structural decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// An operation addresses a target outside the allow-list.
    #[error("operation {path}: target {target} is not allow-listed")]
    TargetNotAllowed { path: OpPath, target: Address },

    /// An operation invokes a selector not granted for its target.
    #[error("operation {path}: selector {selector} is not allowed on {target}")]
    SelectorNotAllowed {
        path: OpPath,
        target: Address,
        selector: Selector,
    },

    /// An operation forwards more value than the policy permits.
    #[error("operation {path}: value {value} exceeds the per-operation bound {bound}")]
    ValueExceedsBound {
        path: OpPath,
        value: U256,
        bound: U256,
    },

    /// A bundle level carried no operations while the policy requires
    /// every level to be non-empty.
    #[error("bundle at {path} is empty")]
    EmptyBundle { path: OpPath },
}

/// Index chain locating an operation: `[2, 0]` is the first operation of
/// the bundle nested under outer operation 2.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OpPath(Vec<usize>);

impl OpPath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Nesting depth of the located operation; outer operations are depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl From<&[usize]> for OpPath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl core::fmt::Display for OpPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        let mut first = true;
        for index in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        Ok(())
    }
}
