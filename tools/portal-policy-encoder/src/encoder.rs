use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use portal_policy_types::shapes::{
    executeBatchCall, RouteCall, Shortcut, PLAIN_TRANSFER, ROUTE_SHORTCUT,
};
use portal_policy_types::{Operation, Selector};

/// Encodes operations as `executeBatch` calldata, selector included.
pub fn encode_batch(operations: &[Operation]) -> Vec<u8> {
    RawBatch::from_operations(operations).encode()
}

/// The four parallel arrays of the batch shape, kept independent so that
/// vectors can disagree on element count on purpose.
#[derive(Clone, Debug, Default)]
pub struct RawBatch {
    pub targets: Vec<Address>,
    pub values: Vec<U256>,
    pub opcodes: Vec<Selector>,
    pub payloads: Vec<Vec<u8>>,
}

impl RawBatch {
    pub fn from_operations(operations: &[Operation]) -> Self {
        Self {
            targets: operations.iter().map(|op| op.target).collect(),
            values: operations.iter().map(|op| op.value).collect(),
            opcodes: operations.iter().map(|op| op.selector).collect(),
            payloads: operations.iter().map(|op| op.params.clone()).collect(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        executeBatchCall {
            targets: self.targets.clone(),
            values: self.values.clone(),
            opcodes: self.opcodes.clone(),
            payloads: self.payloads.iter().cloned().map(Bytes::from).collect(),
        }
        .abi_encode()
    }
}

/// Route header of the shortcut shape. The engine logs these fields and
/// judges only the calls, but realistic vectors carry realistic routes.
#[derive(Clone, Debug)]
pub struct RouteHead {
    pub token_in: Address,
    pub amount_in: U256,
    pub token_out: Address,
    pub amount_out_min: U256,
    pub receiver: Address,
    pub executor: Address,
}

/// Encodes operations as shortcut-route calldata under `head`. Each
/// operation becomes one `RouteCall` (spender mirrors the target); a zero
/// selector with no arguments encodes as empty call data.
pub fn encode_shortcut(head: &RouteHead, operations: &[Operation]) -> Vec<u8> {
    let calls = operations
        .iter()
        .map(|op| RouteCall {
            target: op.target,
            spender: op.target,
            data: Bytes::from(call_data(op)),
            value: op.value,
        })
        .collect();
    let shortcut = Shortcut {
        tokenIn: head.token_in,
        amountIn: head.amount_in,
        tokenOut: head.token_out,
        amountOutMin: head.amount_out_min,
        receiver: head.receiver,
        calls,
    };

    let mut data = ROUTE_SHORTCUT.to_vec();
    data.extend((shortcut, head.executor).abi_encode_params());
    data
}

fn call_data(op: &Operation) -> Vec<u8> {
    if op.selector == PLAIN_TRANSFER && op.params.is_empty() {
        return Vec::new();
    }
    let mut data = op.selector.to_vec();
    data.extend_from_slice(&op.params);
    data
}

/// Wraps already-encoded bundle calldata as a composite call's argument
/// bytes: a single ABI `bytes` parameter.
pub fn composite_params(inner: &[u8]) -> Vec<u8> {
    (Bytes::from(inner.to_vec()),).abi_encode_params()
}

/// Builds a composite operation whose arguments wrap `inner`.
pub fn composite_operation(
    target: Address,
    value: U256,
    selector: Selector,
    inner: &[u8],
) -> Operation {
    Operation::new(target, value, selector, composite_params(inner))
}
