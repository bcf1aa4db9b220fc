//! Policy configuration and the validated registry built from it.
//!
//! [`PolicyConfig`] is the externally supplied document (JSON or built in
//! code); [`PolicyRegistry::new`] is the only way to turn one into
//! something the engine will consult, and it rejects contradictory
//! configurations outright rather than guessing.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256};
use portal_policy_types::Selector;
use serde::{Deserialize, Serialize};

use crate::errors::InvalidPolicy;

/// Nesting depth permitted when the config does not say otherwise. The
/// outer bundle counts as level 1.
pub const DEFAULT_RECURSION_DEPTH: u8 = 4;

fn default_max_value() -> U256 {
    U256::MAX
}

fn default_recursion_depth() -> u8 {
    DEFAULT_RECURSION_DEPTH
}

/// Externally supplied policy document.
///
/// Addresses, selectors and value bounds read from hex strings; omitted
/// fields take the documented defaults. Unknown fields are rejected, a
/// misspelled rule must not silently widen the policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Canonical router the portal forwards through. The entry point,
    /// never a callable sub-target.
    pub router: Address,

    /// Addresses sub-operations may call.
    pub allowed_targets: Vec<Address>,

    /// Selectors permitted per target. A target with no entry here admits
    /// no calls at all.
    #[serde(default)]
    pub allowed_calls: BTreeMap<Address, BTreeSet<Selector>>,

    /// Upper bound on the native value any single operation may forward.
    #[serde(default = "default_max_value")]
    pub max_operation_value: U256,

    /// Selectors whose argument bytes carry a further bundle payload.
    #[serde(default)]
    pub composite_selectors: BTreeSet<Selector>,

    /// Maximum bundle nesting depth, outer bundle included.
    #[serde(default = "default_recursion_depth")]
    pub max_recursion_depth: u8,

    /// Reject bundles that contain no operations, at every nesting level.
    #[serde(default)]
    pub require_non_empty: bool,
}

impl PolicyConfig {
    /// Minimal config: router plus targets, defaults everywhere else.
    pub fn new(router: Address, allowed_targets: Vec<Address>) -> Self {
        Self {
            router,
            allowed_targets,
            allowed_calls: BTreeMap::new(),
            max_operation_value: default_max_value(),
            composite_selectors: BTreeSet::new(),
            max_recursion_depth: default_recursion_depth(),
            require_non_empty: false,
        }
    }

    /// Permits `selector` on `target`. Does not implicitly allow the
    /// target itself.
    pub fn allow_call(mut self, target: Address, selector: Selector) -> Self {
        self.allowed_calls.entry(target).or_default().insert(selector);
        self
    }

    /// Marks `selector` as carrying a nested bundle in its arguments.
    pub fn mark_composite(mut self, selector: Selector) -> Self {
        self.composite_selectors.insert(selector);
        self
    }

    /// Parses a JSON policy document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Immutable allow-list registry consulted during decode and validation.
///
/// Built once from a validated [`PolicyConfig`] and never mutated, so one
/// registry can back any number of concurrent certifications by shared
/// reference.
#[derive(Clone, Debug)]
pub struct PolicyRegistry {
    router: Address,
    allowed_targets: BTreeSet<Address>,
    allowed_calls: BTreeMap<Address, BTreeSet<Selector>>,
    max_operation_value: U256,
    composite_selectors: BTreeSet<Selector>,
    max_recursion_depth: usize,
    require_non_empty: bool,
}

impl PolicyRegistry {
    /// Validates `config` and builds the registry.
    pub fn new(config: PolicyConfig) -> Result<Self, InvalidPolicy> {
        if config.router == Address::ZERO {
            return Err(InvalidPolicy::ZeroRouter);
        }
        if config.allowed_targets.is_empty() {
            return Err(InvalidPolicy::EmptyAllowList);
        }
        let allowed_targets: BTreeSet<Address> = config.allowed_targets.iter().copied().collect();
        if allowed_targets.contains(&Address::ZERO) {
            return Err(InvalidPolicy::ZeroTarget);
        }
        if allowed_targets.contains(&config.router) {
            return Err(InvalidPolicy::RouterInAllowList(config.router));
        }
        for target in config.allowed_calls.keys() {
            if !allowed_targets.contains(target) {
                return Err(InvalidPolicy::CallOnUnlistedTarget(*target));
            }
        }
        if config.max_recursion_depth == 0 {
            return Err(InvalidPolicy::ZeroRecursionCap);
        }
        Ok(Self {
            router: config.router,
            allowed_targets,
            allowed_calls: config.allowed_calls,
            max_operation_value: config.max_operation_value,
            composite_selectors: config.composite_selectors,
            max_recursion_depth: usize::from(config.max_recursion_depth),
            require_non_empty: config.require_non_empty,
        })
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn is_allowed_target(&self, target: &Address) -> bool {
        self.allowed_targets.contains(target)
    }

    pub fn is_allowed_call(&self, target: &Address, selector: &Selector) -> bool {
        self.allowed_calls
            .get(target)
            .is_some_and(|selectors| selectors.contains(selector))
    }

    pub fn is_composite(&self, selector: &Selector) -> bool {
        self.composite_selectors.contains(selector)
    }

    pub fn max_operation_value(&self) -> U256 {
        self.max_operation_value
    }

    pub fn max_recursion_depth(&self) -> usize {
        self.max_recursion_depth
    }

    pub fn require_non_empty(&self) -> bool {
        self.require_non_empty
    }
}
