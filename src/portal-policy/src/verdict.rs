//! Verdict assembly and the certification facade.

use core::fmt;

use alloy_primitives::{Address, U256};
use portal_policy_types::{Operation, Selector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::decoder;
use crate::errors::{InvalidPolicy, RejectReason};
use crate::registry::{PolicyConfig, PolicyRegistry};
use crate::validator;

/// One examined operation in the audit trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Index chain from the outer bundle to this operation; `[2, 0]` is
    /// the first operation nested under outer operation 2.
    pub path: Vec<usize>,
    pub target: Address,
    pub selector: Selector,
    pub value: U256,
    /// Length of the argument bytes. The bytes themselves stay in the
    /// bundle; the trace only records how much was carried.
    pub param_len: usize,
}

impl TraceEntry {
    pub(crate) fn from_operation(path: &[usize], operation: &Operation) -> Self {
        Self {
            path: path.to_vec(),
            target: operation.target,
            selector: operation.selector,
            value: operation.value,
            param_len: operation.params.len(),
        }
    }

    /// Nesting depth of the entry; outer-bundle operations are depth 1.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op ")?;
        let mut first = true;
        for index in &self.path {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        write!(
            f,
            ": target {}, selector {}, value {}, params {} bytes",
            self.target, self.selector, self.value, self.param_len
        )
    }
}

/// Outcome of certifying one calldata payload.
///
/// Equality compares the reason and the full trace, so certifying the
/// same bytes under the same registry yields equal verdicts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Populated on rejection; `None` means certified.
    pub reason: Option<RejectReason>,
    /// Operations examined, in walk order. Complete on acceptance, ends
    /// with the violating operation on policy rejection, and empty when
    /// the payload never decoded.
    pub trace: Vec<TraceEntry>,
}

impl Verdict {
    fn accept(trace: Vec<TraceEntry>) -> Self {
        Self { reason: None, trace }
    }

    fn reject(reason: RejectReason, trace: Vec<TraceEntry>) -> Self {
        Self {
            reason: Some(reason),
            trace,
        }
    }

    /// Whether the payload was certified.
    pub fn ok(&self) -> bool {
        self.reason.is_none()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            None => writeln!(f, "certified: {} operation(s) examined", self.trace.len())?,
            Some(reason) => writeln!(f, "rejected: {reason}")?,
        }
        for entry in &self.trace {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// The engine facade: decode, validate, report.
///
/// Holds the immutable registry. `certify` takes `&self` and shares no
/// mutable state, so one certifier can serve concurrent callers.
#[derive(Clone, Debug)]
pub struct CalldataCertifier {
    registry: PolicyRegistry,
}

impl CalldataCertifier {
    pub fn new(registry: PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Validates `config` and builds a certifier over it.
    pub fn from_config(config: PolicyConfig) -> Result<Self, InvalidPolicy> {
        Ok(Self::new(PolicyRegistry::new(config)?))
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Certifies one calldata payload. Every failure mode is carried in
    /// the verdict; this never panics on hostile input.
    pub fn certify(&self, data: &[u8]) -> Verdict {
        let bundle = match decoder::decode_calldata(data, &self.registry) {
            Ok(bundle) => bundle,
            Err(err) => {
                warn!(%err, payload_len = data.len(), "payload rejected during decode");
                return Verdict::reject(RejectReason::Decode(err), Vec::new());
            }
        };

        let mut trace = Vec::with_capacity(bundle.total_operations());
        match validator::validate_bundle(&bundle, &self.registry, &mut trace) {
            Ok(()) => {
                debug!(operations = trace.len(), "payload certified");
                Verdict::accept(trace)
            }
            Err(reason) => {
                warn!(%reason, examined = trace.len(), "payload rejected by policy");
                Verdict::reject(reason, trace)
            }
        }
    }
}
