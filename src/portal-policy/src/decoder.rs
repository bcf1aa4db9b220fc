//! Structural decoding of portal calldata into operation bundles.
//!
//! Two outer shapes are recognized, dispatched on the leading 4-byte
//! selector: the batch shape (four parallel arrays, one operation per
//! index) and the shortcut-route shape (a route struct whose call array
//! carries the operations). Everything else is rejected. Offsets and
//! lengths come from the payload itself and are treated as hostile; all
//! resolution goes through [`Cursor`] so a malformed payload can only ever
//! produce a [`DecodeError`], never a panic or an out-of-buffer read.

use portal_policy_types::{shapes, Bundle, Operation, Selector};
use tracing::debug;

use crate::cursor::{Cursor, WORD};
use crate::errors::DecodeError;
use crate::registry::PolicyRegistry;

/// Decodes one full calldata payload (outer selector included) into a
/// bundle. Operations whose selector the registry marks composite have
/// their argument bytes decoded as a further bundle, recursively, up to
/// the registry's depth cap.
pub fn decode_calldata(data: &[u8], registry: &PolicyRegistry) -> Result<Bundle, DecodeError> {
    let bundle = decode_level(data, registry, 1)?;
    debug!(
        operations = bundle.len(),
        total = bundle.total_operations(),
        depth = bundle.depth(),
        "decoded bundle"
    );
    Ok(bundle)
}

fn decode_level(data: &[u8], registry: &PolicyRegistry, depth: usize) -> Result<Bundle, DecodeError> {
    let cap = registry.max_recursion_depth();
    if depth > cap {
        return Err(DecodeError::RecursionLimitExceeded { depth, cap });
    }

    let outer = Cursor::new(data);
    let selector = Selector::from_slice(outer.bytes(0, 4)?);
    let args = outer.subregion(4)?;

    if selector == shapes::EXECUTE_BATCH {
        decode_batch(args, registry, depth)
    } else if selector == shapes::ROUTE_SHORTCUT {
        decode_shortcut(args, registry, depth)
    } else {
        Err(DecodeError::UnrecognizedSelector { selector })
    }
}

/// Batch shape: `executeBatch(address[],uint256[],bytes4[],bytes[])`.
///
/// The four arrays must agree on element count before any operation is
/// built; `targets[i]`, `values[i]`, `opcodes[i]` and `payloads[i]` then
/// form operation `i`, with `payloads[i]` taken verbatim as the argument
/// bytes.
fn decode_batch(args: Cursor<'_>, registry: &PolicyRegistry, depth: usize) -> Result<Bundle, DecodeError> {
    let targets = args.subregion(args.usize_word(0)?)?;
    let values = args.subregion(args.usize_word(WORD)?)?;
    let opcodes = args.subregion(args.usize_word(2 * WORD)?)?;
    let payloads = args.subregion(args.usize_word(3 * WORD)?)?;

    let n_targets = array_len(&targets)?;
    let n_values = array_len(&values)?;
    let n_opcodes = array_len(&opcodes)?;
    let n_payloads = array_len(&payloads)?;
    if n_targets != n_values || n_targets != n_opcodes || n_targets != n_payloads {
        return Err(DecodeError::ArityMismatch {
            targets: n_targets,
            values: n_values,
            opcodes: n_opcodes,
            payloads: n_payloads,
        });
    }

    // Element offsets of a bytes[] are relative to the slot after the
    // length word.
    let payload_data = payloads.subregion(WORD)?;

    let mut operations = Vec::with_capacity(n_targets);
    for i in 0..n_targets {
        let target = targets.address_word((1 + i) * WORD)?;
        let value = values.u256_word((1 + i) * WORD)?;
        let opcode = opcodes.selector_word((1 + i) * WORD)?;
        let params = payload_data.tail_bytes(payload_data.usize_word(i * WORD)?)?;

        let nested = if registry.is_composite(&opcode) {
            Some(decode_composite_interior(params, registry, depth)?)
        } else {
            None
        };
        operations.push(Operation {
            target,
            value,
            selector: opcode,
            params: params.to_vec(),
            nested,
        });
    }
    Ok(Bundle::new(operations))
}

/// Shortcut-route shape: a `Shortcut` struct plus an executor address,
/// with operations drawn from the route's call array.
fn decode_shortcut(args: Cursor<'_>, registry: &PolicyRegistry, depth: usize) -> Result<Bundle, DecodeError> {
    // Argument head: offset of the Shortcut struct, then the executor.
    // The executor is routing metadata; its slot must be present but its
    // value is not a policy subject.
    let shortcut = args.subregion(args.usize_word(0)?)?;
    let executor = args.address_word(WORD)?;

    // Shortcut head: tokenIn, amountIn, tokenOut, amountOutMin, receiver,
    // offset of the call array. The token fields describe the route, not
    // the calls, so they are logged and passed over.
    let token_in = shortcut.address_word(0)?;
    let amount_in = shortcut.u256_word(WORD)?;
    let token_out = shortcut.address_word(2 * WORD)?;
    let receiver = shortcut.address_word(4 * WORD)?;
    debug!(%token_in, %amount_in, %token_out, %receiver, %executor, "shortcut route header");

    let calls = shortcut.subregion(shortcut.usize_word(5 * WORD)?)?;
    let n_calls = array_len(&calls)?;
    let call_data = calls.subregion(WORD)?;

    let mut operations = Vec::with_capacity(n_calls);
    for i in 0..n_calls {
        let elem = call_data.subregion(call_data.usize_word(i * WORD)?)?;
        // RouteCall head: target, spender, offset of the call bytes, value.
        let target = elem.address_word(0)?;
        let spender = elem.address_word(WORD)?;
        let data = elem.tail_bytes(elem.usize_word(2 * WORD)?)?;
        let value = elem.u256_word(3 * WORD)?;

        let (selector, params) = split_call_data(data)?;
        debug!(call = i, %target, %spender, %selector, "routed call");
        let nested = if registry.is_composite(&selector) {
            Some(decode_composite_interior(&params, registry, depth)?)
        } else {
            None
        };
        operations.push(Operation {
            target,
            value,
            selector,
            params,
            nested,
        });
    }
    Ok(Bundle::new(operations))
}

/// Splits a routed call's data into selector and argument bytes. Empty
/// data is a plain value transfer (zero selector, no arguments); a 1 to 3
/// byte fragment cannot hold a selector and is malformed.
fn split_call_data(data: &[u8]) -> Result<(Selector, Vec<u8>), DecodeError> {
    if data.is_empty() {
        return Ok((shapes::PLAIN_TRANSFER, Vec::new()));
    }
    if data.len() < 4 {
        return Err(DecodeError::OutOfBounds {
            offset: 0,
            needed: 4,
            region_len: data.len(),
        });
    }
    Ok((Selector::from_slice(&data[..4]), data[4..].to_vec()))
}

/// Decodes the interior of a composite operation. The argument bytes must
/// be a single ABI `bytes` parameter whose content is itself a recognized
/// bundle payload; an interior that does not decode rejects the whole
/// bundle, since an uninspected payload must never reach execution.
fn decode_composite_interior(
    params: &[u8],
    registry: &PolicyRegistry,
    depth: usize,
) -> Result<Bundle, DecodeError> {
    let region = Cursor::new(params);
    let inner = region.tail_bytes(region.usize_word(0)?)?;
    decode_level(inner, registry, depth + 1)
}

/// Reads a dynamic array's length word and checks that the declared
/// element head region actually fits the remainder, so a hostile length
/// cannot drive the element loop past the buffer.
fn array_len(region: &Cursor<'_>) -> Result<usize, DecodeError> {
    let len = region.usize_word(0)?;
    let head_bytes = len
        .checked_mul(WORD)
        .ok_or_else(|| region.oob(usize::MAX, WORD))?;
    region.bytes(WORD, head_bytes)?;
    Ok(len)
}
