use alloy_primitives::{Address, Selector, U256};

/// A single decoded sub-call extracted from a bundle payload.
///
/// Constructed only by the structural decoder and immutable afterwards. The
/// parameter bytes are the call's ABI-encoded arguments without the selector;
/// they are copied out of the validated tail segment so a bundle carries no
/// borrow of the input buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    /// Contract the portal would call.
    pub target: Address,
    /// Amount forwarded with the call. Sentinel values such as `U256::MAX`
    /// ("entire balance") pass through undisturbed.
    pub value: U256,
    /// 4-byte selector of the sub-call. The zero selector denotes a plain
    /// transfer with no call data.
    pub selector: Selector,
    /// ABI-encoded arguments of the sub-call (may be empty).
    pub params: Vec<u8>,
    /// Present when the selector is composite and the params carried a
    /// further bundle payload.
    pub nested: Option<Bundle>,
}

impl Operation {
    pub fn new(target: Address, value: U256, selector: Selector, params: Vec<u8>) -> Self {
        Self {
            target,
            value,
            selector,
            params,
            nested: None,
        }
    }

    /// Attaches a nested bundle (builder form, used by the decoder and by
    /// test-vector construction).
    pub fn with_nested(mut self, nested: Bundle) -> Self {
        self.nested = Some(nested);
        self
    }
}

/// Ordered sequence of operations decoded from one calldata payload.
///
/// Encoded order is execution order: later operations may depend on the
/// effects of earlier ones (approve before swap), so order is preserved
/// end to end and never re-sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bundle {
    pub operations: Vec<Operation>,
}

impl Bundle {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Number of operations in this bundle and every nested bundle below it.
    pub fn total_operations(&self) -> usize {
        self.operations
            .iter()
            .map(|op| 1 + op.nested.as_ref().map_or(0, Bundle::total_operations))
            .sum()
    }

    /// Number of bundle levels, counting this bundle as one.
    pub fn depth(&self) -> usize {
        1 + self
            .operations
            .iter()
            .filter_map(|op| op.nested.as_ref())
            .map(Bundle::depth)
            .max()
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = &'a Operation;
    type IntoIter = core::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
