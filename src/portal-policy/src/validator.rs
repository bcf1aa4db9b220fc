//! Policy validation over decoded bundles.
//!
//! Validation is a pre-order, fail-fast walk in encoded order: every
//! operation is appended to the trace as it is examined, checks run in a
//! fixed order (target, then selector, then value), and the first
//! violation stops the walk so the verdict names exactly one reason.

use portal_policy_types::{Bundle, Operation};

use crate::errors::{OpPath, RejectReason};
use crate::registry::PolicyRegistry;
use crate::verdict::TraceEntry;

/// Walks `bundle` against `registry`, filling `trace` with one entry per
/// examined operation. On `Ok` the trace covers every operation; on `Err`
/// it ends with the operation that failed.
pub fn validate_bundle(
    bundle: &Bundle,
    registry: &PolicyRegistry,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RejectReason> {
    let mut path = Vec::new();
    walk(bundle, registry, &mut path, trace)
}

fn walk(
    bundle: &Bundle,
    registry: &PolicyRegistry,
    path: &mut Vec<usize>,
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RejectReason> {
    if registry.require_non_empty() && bundle.is_empty() {
        return Err(RejectReason::EmptyBundle {
            path: OpPath::from(path.as_slice()),
        });
    }
    for (index, operation) in bundle.iter().enumerate() {
        path.push(index);
        check_operation(operation, registry, path, trace)?;
        if let Some(nested) = &operation.nested {
            walk(nested, registry, path, trace)?;
        }
        path.pop();
    }
    Ok(())
}

fn check_operation(
    operation: &Operation,
    registry: &PolicyRegistry,
    path: &[usize],
    trace: &mut Vec<TraceEntry>,
) -> Result<(), RejectReason> {
    trace.push(TraceEntry::from_operation(path, operation));

    if !registry.is_allowed_target(&operation.target) {
        return Err(RejectReason::TargetNotAllowed {
            path: OpPath::from(path),
            target: operation.target,
        });
    }
    if !registry.is_allowed_call(&operation.target, &operation.selector) {
        return Err(RejectReason::SelectorNotAllowed {
            path: OpPath::from(path),
            target: operation.target,
            selector: operation.selector,
        });
    }
    let bound = registry.max_operation_value();
    if operation.value > bound {
        return Err(RejectReason::ValueExceedsBound {
            path: OpPath::from(path),
            value: operation.value,
            bound,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PolicyConfig;
    use alloy_primitives::{address, Address, Selector, U256};
    use portal_policy_types::shapes::{ERC20_APPROVE, ERC20_TRANSFER};

    const ROUTER: Address = address!("b0324286B3ef7dDdC93Fb2fF7c8B7B8a3524803c");
    const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const VAULT: Address = address!("99CBC45ea5bb7eF3a5BC08FB1B7E56bB2442Ef0D");
    const OUTSIDER: Address = address!("Bdb9300b7CDE636d9cD4AFF00f6F009fFBBc8EE6");

    fn registry() -> PolicyRegistry {
        let config = PolicyConfig::new(ROUTER, vec![USDC, VAULT])
            .allow_call(USDC, ERC20_TRANSFER)
            .allow_call(USDC, ERC20_APPROVE)
            .allow_call(VAULT, ERC20_TRANSFER);
        PolicyRegistry::new(config).unwrap()
    }

    fn op(target: Address, selector: Selector, value: u64) -> Operation {
        Operation::new(target, U256::from(value), selector, Vec::new())
    }

    fn run(bundle: &Bundle, registry: &PolicyRegistry) -> (Vec<TraceEntry>, Result<(), RejectReason>) {
        let mut trace = Vec::new();
        let result = validate_bundle(bundle, registry, &mut trace);
        (trace, result)
    }

    #[test]
    fn conforming_bundle_passes_with_full_trace() {
        let bundle = Bundle::new(vec![
            op(USDC, ERC20_APPROVE, 0),
            op(USDC, ERC20_TRANSFER, 5),
            op(VAULT, ERC20_TRANSFER, 1),
        ]);
        let (trace, result) = run(&bundle, &registry());
        assert_eq!(result, Ok(()));
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[2].path, vec![2]);
        assert_eq!(trace[2].target, VAULT);
    }

    #[test]
    fn first_violation_stops_the_walk() {
        let bundle = Bundle::new(vec![
            op(USDC, ERC20_APPROVE, 0),
            op(OUTSIDER, ERC20_TRANSFER, 0),
            // Would also violate, but is never reached.
            op(OUTSIDER, ERC20_APPROVE, 0),
        ]);
        let (trace, result) = run(&bundle, &registry());
        assert_eq!(
            result,
            Err(RejectReason::TargetNotAllowed {
                path: OpPath::new(vec![1]),
                target: OUTSIDER,
            })
        );
        // Trace ends with the operation that failed.
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1].path, vec![1]);
    }

    #[test]
    fn target_check_precedes_selector_check() {
        // An unknown target with an unknown selector reports the target.
        let bundle = Bundle::new(vec![op(OUTSIDER, Selector::new([9, 9, 9, 9]), 0)]);
        let (_, result) = run(&bundle, &registry());
        assert!(matches!(result, Err(RejectReason::TargetNotAllowed { .. })));
    }

    #[test]
    fn selector_must_be_granted_for_the_specific_target() {
        // approve is granted on USDC, not on the vault.
        let bundle = Bundle::new(vec![op(VAULT, ERC20_APPROVE, 0)]);
        let (_, result) = run(&bundle, &registry());
        assert_eq!(
            result,
            Err(RejectReason::SelectorNotAllowed {
                path: OpPath::new(vec![0]),
                target: VAULT,
                selector: ERC20_APPROVE,
            })
        );
    }

    #[test]
    fn value_bound_is_inclusive() {
        let mut config = PolicyConfig::new(ROUTER, vec![USDC]).allow_call(USDC, ERC20_TRANSFER);
        config.max_operation_value = U256::from(100u64);
        let registry = PolicyRegistry::new(config).unwrap();

        let at_bound = Bundle::new(vec![op(USDC, ERC20_TRANSFER, 100)]);
        assert_eq!(run(&at_bound, &registry).1, Ok(()));

        let over = Bundle::new(vec![op(USDC, ERC20_TRANSFER, 101)]);
        assert_eq!(
            run(&over, &registry).1,
            Err(RejectReason::ValueExceedsBound {
                path: OpPath::new(vec![0]),
                value: U256::from(101u64),
                bound: U256::from(100u64),
            })
        );
    }

    #[test]
    fn nested_operations_carry_index_chains() {
        let inner = Bundle::new(vec![op(USDC, ERC20_TRANSFER, 1), op(OUTSIDER, ERC20_TRANSFER, 1)]);
        let bundle = Bundle::new(vec![
            op(USDC, ERC20_APPROVE, 0),
            op(USDC, ERC20_TRANSFER, 0).with_nested(inner),
        ]);
        let (trace, result) = run(&bundle, &registry());
        assert_eq!(
            result,
            Err(RejectReason::TargetNotAllowed {
                path: OpPath::new(vec![1, 1]),
                target: OUTSIDER,
            })
        );
        let paths: Vec<_> = trace.iter().map(|entry| entry.path.clone()).collect();
        assert_eq!(paths, vec![vec![0], vec![1], vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn empty_bundles_pass_unless_required_non_empty() {
        let bundle = Bundle::default();
        assert_eq!(run(&bundle, &registry()).1, Ok(()));

        let mut config = PolicyConfig::new(ROUTER, vec![USDC]);
        config.require_non_empty = true;
        let strict = PolicyRegistry::new(config).unwrap();
        assert_eq!(
            run(&bundle, &strict).1,
            Err(RejectReason::EmptyBundle {
                path: OpPath::default(),
            })
        );
    }

    #[test]
    fn nested_empty_bundle_is_located_by_path() {
        let mut config = PolicyConfig::new(ROUTER, vec![USDC]).allow_call(USDC, ERC20_TRANSFER);
        config.require_non_empty = true;
        let registry = PolicyRegistry::new(config).unwrap();

        let bundle = Bundle::new(vec![
            op(USDC, ERC20_TRANSFER, 0).with_nested(Bundle::default()),
        ]);
        assert_eq!(
            run(&bundle, &registry).1,
            Err(RejectReason::EmptyBundle {
                path: OpPath::new(vec![0]),
            })
        );
    }
}
