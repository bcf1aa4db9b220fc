//! End-to-end certification scenarios: payloads built by the canonical
//! encoder, judged by the engine.

use alloy_primitives::{address, Address, U256};
use portal_policy_encoder::{composite_operation, encode_batch, encode_shortcut, RawBatch, RouteHead};
use portal_policy::shapes::{selector, ERC20_APPROVE, ERC20_TRANSFER, PLAIN_TRANSFER};
use portal_policy::{
    CalldataCertifier, DecodeError, OpPath, Operation, PolicyConfig, RejectReason, Selector,
};

const ROUTER: Address = address!("b0324286B3ef7dDdC93Fb2fF7c8B7B8a3524803c");
const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
const VAULT: Address = address!("99CBC45ea5bb7eF3a5BC08FB1B7E56bB2442Ef0D");
const OUTSIDER: Address = address!("Bdb9300b7CDE636d9cD4AFF00f6F009fFBBc8EE6");
const SPENDER: Address = address!("129b480ad625bcd1a5c3a1c10d708114726fa467");

fn base_config() -> PolicyConfig {
    PolicyConfig::new(ROUTER, vec![USDC, VAULT])
        .allow_call(USDC, ERC20_APPROVE)
        .allow_call(USDC, ERC20_TRANSFER)
        .allow_call(VAULT, ERC20_TRANSFER)
}

fn certifier(config: PolicyConfig) -> CalldataCertifier {
    CalldataCertifier::from_config(config).unwrap()
}

fn approve_params(spender: Address, amount: U256) -> Vec<u8> {
    let mut params = vec![0u8; 12];
    params.extend_from_slice(spender.as_slice());
    params.extend_from_slice(&amount.to_be_bytes::<32>());
    params
}

fn approve(target: Address, spender: Address, amount: u64) -> Operation {
    Operation::new(
        target,
        U256::ZERO,
        ERC20_APPROVE,
        approve_params(spender, U256::from(amount)),
    )
}

fn transfer(target: Address, amount: u64) -> Operation {
    Operation::new(
        target,
        U256::ZERO,
        ERC20_TRANSFER,
        approve_params(SPENDER, U256::from(amount)),
    )
}

#[test]
fn approve_then_transfer_batch_is_certified() {
    let data = encode_batch(&[
        approve(USDC, SPENDER, 2_500_000),
        transfer(VAULT, 1_000_000),
    ]);
    let verdict = certifier(base_config()).certify(&data);
    assert!(verdict.ok(), "{verdict}");
    assert_eq!(verdict.trace.len(), 2);
    assert_eq!(verdict.trace[0].selector, ERC20_APPROVE);
    assert_eq!(verdict.trace[1].target, VAULT);
}

#[test]
fn unlisted_target_rejects_at_its_index() {
    let data = encode_batch(&[
        approve(OUTSIDER, SPENDER, 2_500_000),
        transfer(VAULT, 1_000_000),
    ]);
    let verdict = certifier(base_config()).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::TargetNotAllowed {
            path: OpPath::new(vec![0]),
            target: OUTSIDER,
        })
    );
    assert_eq!(verdict.trace.len(), 1);
}

#[test]
fn selector_grants_do_not_transfer_between_targets() {
    // approve is granted on USDC only.
    let data = encode_batch(&[approve(VAULT, SPENDER, 1)]);
    let verdict = certifier(base_config()).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::SelectorNotAllowed {
            path: OpPath::new(vec![0]),
            target: VAULT,
            selector: ERC20_APPROVE,
        })
    );
}

#[test]
fn mismatched_parallel_arrays_never_reach_the_policy() {
    let raw = RawBatch {
        targets: vec![USDC, VAULT, USDC],
        values: vec![U256::ZERO, U256::ZERO],
        opcodes: vec![ERC20_TRANSFER, ERC20_TRANSFER],
        payloads: vec![Vec::new(), Vec::new()],
    };
    let verdict = certifier(base_config()).certify(&raw.encode());
    assert_eq!(
        verdict.reason,
        Some(RejectReason::Decode(DecodeError::ArityMismatch {
            targets: 3,
            values: 2,
            opcodes: 2,
            payloads: 2,
        }))
    );
    assert!(verdict.trace.is_empty());
}

#[test]
fn per_operation_value_bound_is_enforced() {
    let mut config = base_config();
    config.max_operation_value = U256::from(1_000_000u64);
    let certifier = certifier(config);

    let mut op = transfer(USDC, 1);
    op.value = U256::from(1_000_000u64);
    assert!(certifier.certify(&encode_batch(&[op.clone()])).ok());

    op.value = U256::from(1_000_001u64);
    let verdict = certifier.certify(&encode_batch(&[op]));
    assert_eq!(
        verdict.reason,
        Some(RejectReason::ValueExceedsBound {
            path: OpPath::new(vec![0]),
            value: U256::from(1_000_001u64),
            bound: U256::from(1_000_000u64),
        })
    );
}

#[test]
fn plain_transfers_need_an_explicit_zero_selector_grant() {
    let head = RouteHead {
        token_in: USDC,
        amount_in: U256::from(2_500_000u64),
        token_out: VAULT,
        amount_out_min: U256::from(2_400_000u64),
        receiver: SPENDER,
        executor: SPENDER,
    };
    let ops = [Operation::new(VAULT, U256::from(5u64), PLAIN_TRANSFER, Vec::new())];
    let data = encode_shortcut(&head, &ops);

    let verdict = certifier(base_config()).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::SelectorNotAllowed {
            path: OpPath::new(vec![0]),
            target: VAULT,
            selector: PLAIN_TRANSFER,
        })
    );

    let verdict = certifier(base_config().allow_call(VAULT, PLAIN_TRANSFER)).certify(&data);
    assert!(verdict.ok(), "{verdict}");
    assert_eq!(verdict.trace[0].param_len, 0);
}

#[test]
fn empty_bundles_certify_unless_the_policy_requires_otherwise() {
    let data = encode_batch(&[]);

    let verdict = certifier(base_config()).certify(&data);
    assert!(verdict.ok());
    assert!(verdict.trace.is_empty());

    let mut config = base_config();
    config.require_non_empty = true;
    let verdict = certifier(config).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::EmptyBundle {
            path: OpPath::default(),
        })
    );
}

/// Wraps `inner` calldata `wraps` times in composite operations on USDC.
fn nest(inner: Vec<u8>, wraps: usize, composite: Selector) -> Vec<u8> {
    let mut data = inner;
    for _ in 0..wraps {
        data = encode_batch(&[composite_operation(USDC, U256::ZERO, composite, &data)]);
    }
    data
}

fn composite_config() -> (PolicyConfig, Selector) {
    let run_bundle = selector("runBundle(bytes)");
    let config = base_config()
        .allow_call(USDC, run_bundle)
        .mark_composite(run_bundle);
    (config, run_bundle)
}

#[test]
fn nesting_at_the_cap_is_certified() {
    let (config, run_bundle) = composite_config();
    // Depth 4 total: three wraps around a plain batch.
    let data = nest(encode_batch(&[transfer(USDC, 10)]), 3, run_bundle);

    let verdict = certifier(config).certify(&data);
    assert!(verdict.ok(), "{verdict}");
    assert_eq!(verdict.trace.len(), 4);
    assert_eq!(verdict.trace[3].path, vec![0, 0, 0, 0]);
    assert_eq!(verdict.trace[3].selector, ERC20_TRANSFER);
}

#[test]
fn nesting_past_the_cap_is_a_decode_failure() {
    let (config, run_bundle) = composite_config();
    let data = nest(encode_batch(&[transfer(USDC, 10)]), 4, run_bundle);

    let verdict = certifier(config).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::Decode(DecodeError::RecursionLimitExceeded {
            depth: 5,
            cap: 4,
        }))
    );
    assert!(verdict.trace.is_empty());
}

#[test]
fn violations_inside_nested_bundles_carry_index_chains() {
    let (config, run_bundle) = composite_config();
    let inner = encode_batch(&[transfer(USDC, 1), transfer(OUTSIDER, 1)]);
    let data = nest(inner, 1, run_bundle);

    let verdict = certifier(config).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::TargetNotAllowed {
            path: OpPath::new(vec![0, 1]),
            target: OUTSIDER,
        })
    );
    // Wrapper, conforming inner transfer, then the violator.
    let paths: Vec<_> = verdict.trace.iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, vec![vec![0], vec![0, 0], vec![0, 1]]);
}

#[test]
fn unrecognized_payloads_are_rejected_structurally() {
    // A perfectly valid ERC-20 transfer is still not a bundle.
    let mut data = ERC20_TRANSFER.to_vec();
    data.extend_from_slice(&approve_params(SPENDER, U256::from(1u64)));

    let verdict = certifier(base_config()).certify(&data);
    assert_eq!(
        verdict.reason,
        Some(RejectReason::Decode(DecodeError::UnrecognizedSelector {
            selector: ERC20_TRANSFER,
        }))
    );
}
