//! # Reconciliation
//!
//! Merges a redeclared tree into the running proxies. The new tree must have
//! the shape of the previous one: same root count, and at every position the
//! same kind and, for emitters, the same number of prototypes.
//!
//! The whole shape is checked before anything is written. A mismatch leaves
//! every proxy untouched; a match swaps behaviors slot for slot and keeps
//! identity, birth frame and physics.

use ember_core::ProxyPool;

use crate::error::{EmberError, EmberResult};
use crate::proxy::RuntimeProxy;
use crate::tree::{CompiledTree, SlotKind};

/// Outcome of a successful reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Proxies that took new behaviors.
    pub proxies_updated: usize,
    /// Of those, emitters that took new parameters.
    pub emitters_updated: usize,
}

/// Verifies that `next` has the shape of `previous`.
///
/// # Errors
///
/// Returns [`EmberError::StructuralMismatch`] naming the first divergent
/// position in pre-order.
pub(crate) fn check_shape(previous: &CompiledTree, next: &CompiledTree) -> EmberResult<()> {
    if previous.roots().len() != next.roots().len() {
        return Err(EmberError::StructuralMismatch {
            position: "roots".to_owned(),
            expected: format!("{} root(s)", previous.roots().len()),
            found: format!("{} root(s)", next.roots().len()),
        });
    }
    for (i, (&old, &new)) in previous.roots().iter().zip(next.roots()).enumerate() {
        check_slot(previous, old, next, new, &format!("root[{i}]"))?;
    }
    Ok(())
}

fn check_slot(
    previous: &CompiledTree,
    old: u32,
    next: &CompiledTree,
    new: u32,
    position: &str,
) -> EmberResult<()> {
    let (Some(old_slot), Some(new_slot)) = (previous.slot(old), next.slot(new)) else {
        return Err(EmberError::StructuralMismatch {
            position: position.to_owned(),
            expected: "a node".to_owned(),
            found: "nothing".to_owned(),
        });
    };

    let same_shape = match (&old_slot.kind, &new_slot.kind) {
        (SlotKind::Leaf, SlotKind::Leaf) => true,
        (SlotKind::Emitter { prototypes: a, .. }, SlotKind::Emitter { prototypes: b, .. }) => {
            a.len() == b.len()
        }
        _ => false,
    };
    if !same_shape {
        return Err(EmberError::StructuralMismatch {
            position: position.to_owned(),
            expected: old_slot.describe(),
            found: new_slot.describe(),
        });
    }

    for (j, (&a, &b)) in old_slot
        .prototypes()
        .iter()
        .zip(new_slot.prototypes())
        .enumerate()
    {
        check_slot(previous, a, next, b, &format!("{position}.prototype[{j}]"))?;
    }
    Ok(())
}

/// Hands every proxy the slot it occupies in `next`.
///
/// Callers must run [`check_shape`] first; isomorphic trees number their
/// slots identically.
pub(crate) fn transplant(
    pool: &mut ProxyPool<RuntimeProxy>,
    next: &CompiledTree,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for proxy in pool.values_mut() {
        let Some(slot) = next.slot(proxy.slot) else {
            continue;
        };
        proxy.transplant(slot);
        report.proxies_updated += 1;
        if proxy.is_emitter() {
            report.emitters_updated += 1;
        }
    }
    report
}
