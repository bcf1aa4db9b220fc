//! Recognized portal call shapes.
//!
//! The engine certifies only call forms it was built to understand. Two
//! router entrypoints are recognized: the flat batch form (parallel arrays
//! of call fields) and the production router's shortcut-route form (a
//! dynamic struct carrying an array of routed calls).

use alloy_primitives::{keccak256, FixedBytes, Selector};
use alloy_sol_types::{sol, SolCall};

sol! {
    /// Flat bundle entrypoint: one sub-call per index across the four
    /// parallel arrays. `payloads[i]` holds the ABI arguments of the call
    /// identified by `opcodes[i]`; the selector is not repeated inside the
    /// payload.
    function executeBatch(
        address[] targets,
        uint256[] values,
        bytes4[] opcodes,
        bytes[] payloads
    );

    /// One routed sub-call of a shortcut. `data` is full call data
    /// (selector-prefixed); `spender` is routing metadata for the router's
    /// own token plumbing and is not a policy subject.
    struct RouteCall {
        address target;
        address spender;
        bytes data;
        uint256 value;
    }

    /// Shortcut route descriptor forwarded to the router.
    struct Shortcut {
        address tokenIn;
        uint256 amountIn;
        address tokenOut;
        uint256 amountOutMin;
        address receiver;
        RouteCall[] calls;
    }

    /// Composite interior: a composite-marked operation carries exactly one
    /// dynamic bytes argument whose content is a further bundle payload.
    function runBundle(bytes inner);
}

/// Selector of the batch entrypoint, derived from its declared signature.
pub const EXECUTE_BATCH: Selector = FixedBytes(executeBatchCall::SELECTOR);

/// Selector of the router's shortcut-route entrypoint.
///
/// The router publishes only the deployed selector; the originating
/// signature is not part of its public ABI, so the wire id is pinned here
/// verbatim. Its argument layout is `(Shortcut, address executor)`.
pub const ROUTE_SHORTCUT: Selector = FixedBytes([0xa2, 0xe4, 0x2c, 0x65]);

/// `transfer(address,uint256)`.
pub const ERC20_TRANSFER: Selector = FixedBytes([0xa9, 0x05, 0x9c, 0xbb]);

/// `approve(address,uint256)`.
pub const ERC20_APPROVE: Selector = FixedBytes([0x09, 0x5e, 0xa7, 0xb3]);

/// Selector reported for a routed call with empty call data (plain value
/// transfer). Allow-list it explicitly if the policy should admit such
/// operations.
pub const PLAIN_TRANSFER: Selector = FixedBytes([0x00, 0x00, 0x00, 0x00]);

/// First four bytes of `keccak256(signature)`.
///
/// Convenience for building allow-lists from human-readable signatures,
/// e.g. `selector("withdraw(uint256)")`.
pub fn selector(signature: &str) -> Selector {
    let digest = keccak256(signature.as_bytes());
    FixedBytes([digest[0], digest[1], digest[2], digest[3]])
}
