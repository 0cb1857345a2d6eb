//! # Compiled Declaration Tree
//!
//! A declaration flattened into pre-order slots. Proxies remember the slot of
//! the node they came from, so two isomorphic declarations assign the same
//! slot to the same tree position and reconciliation becomes a slot-for-slot
//! swap.

use std::sync::Arc;

use crate::behavior::PropertySet;
use crate::emitter::MIN_INTERVAL;
use crate::node::{BirthHook, DeathHook, Declaration, EntityNode, NodeKind, StartPosition};
use crate::render::{RenderTag, Transition};

/// Slot-level kind.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SlotKind {
    Leaf,
    Emitter {
        interval: f32,
        spawn_cap: u32,
        prototypes: Vec<u32>,
    },
}

/// One flattened node.
#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) kind: SlotKind,
    pub(crate) properties: Arc<PropertySet>,
    pub(crate) tag: RenderTag,
    pub(crate) start: Option<StartPosition>,
    pub(crate) transitions: Arc<[Transition]>,
    pub(crate) on_birth: Option<BirthHook>,
    pub(crate) on_death: Option<DeathHook>,
}

impl Slot {
    /// Prototype slots of an emitter; empty for leaves.
    pub(crate) fn prototypes(&self) -> &[u32] {
        match &self.kind {
            SlotKind::Leaf => &[],
            SlotKind::Emitter { prototypes, .. } => prototypes,
        }
    }

    /// Human-readable shape, used in mismatch reports.
    pub(crate) fn describe(&self) -> String {
        match &self.kind {
            SlotKind::Leaf => "leaf".to_owned(),
            SlotKind::Emitter { prototypes, .. } => {
                format!("emitter with {} prototype(s)", prototypes.len())
            }
        }
    }
}

/// A declaration in slot form.
#[derive(Clone)]
pub(crate) struct CompiledTree {
    slots: Vec<Slot>,
    roots: Vec<u32>,
}

impl CompiledTree {
    /// Flattens `declaration`, resolving default tags and spawn caps.
    pub(crate) fn compile(declaration: &Declaration, default_spawn_cap: u32) -> Self {
        let mut tree = Self {
            slots: Vec::with_capacity(declaration.node_count()),
            roots: Vec::with_capacity(declaration.roots().len()),
        };
        for root in declaration.roots() {
            let index = tree.push(root, default_spawn_cap);
            tree.roots.push(index);
        }
        tree
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push(&mut self, node: &EntityNode, default_spawn_cap: u32) -> u32 {
        let index = self.slots.len() as u32;
        // Reserve the slot before the children so numbering is pre-order.
        self.slots.push(Slot {
            kind: SlotKind::Leaf,
            properties: Arc::new(node.properties().clone()),
            tag: node.tag().unwrap_or(RenderTag(index)),
            start: node.start(),
            transitions: node.transitions().into(),
            on_birth: node.birth_hook().cloned(),
            on_death: node.death_hook().cloned(),
        });

        if let NodeKind::Emitter(spec) = node.kind() {
            let prototypes = spec
                .prototypes
                .iter()
                .map(|child| self.push(child, default_spawn_cap))
                .collect();
            self.slots[index as usize].kind = SlotKind::Emitter {
                interval: sanitize_interval(spec.interval),
                spawn_cap: spec.spawn_cap.unwrap_or(default_spawn_cap),
                prototypes,
            };
        }
        index
    }

    pub(crate) fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }

    pub(crate) fn roots(&self) -> &[u32] {
        &self.roots
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn emitter_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.kind, SlotKind::Emitter { .. }))
            .count()
    }
}

fn sanitize_interval(interval: f32) -> f32 {
    if interval.is_nan() {
        MIN_INTERVAL
    } else {
        interval.max(MIN_INTERVAL)
    }
}
