//! # Reconciliation Tests
//!
//! Redeclaring a running simulation: what survives, what changes, and what
//! happens when the shape does not line up.

use ember::{EmberError, EntityNode, ProxyId, Simulation, Vec2};

const BOUNDS: Vec2 = Vec2::new(640.0, 480.0);

fn fountain(prototypes: Vec<EntityNode>) -> EntityNode {
    EntityNode::emitter(0.2, prototypes).with_spawn_cap(8)
}

/// Captures `(id, birth frame, packed physics)` for every proxy.
fn fingerprint(sim: &Simulation) -> Vec<(ProxyId, u64, Vec<u8>)> {
    let mut all: Vec<_> = sim
        .proxies()
        .map(|p| (p.id(), p.birth_frame(), p.physics().as_bytes().to_vec()))
        .collect();
    all.sort_by_key(|(id, ..)| id.to_bits());
    all
}

/// Test: isomorphic redeclaration keeps state and swaps behaviors.
#[test]
fn test_isomorphic_redeclare_keeps_state() {
    let mut sim = Simulation::default();
    sim.declare(EntityNode::leaf().with_velocity(Vec2::new(1.0, 0.0)))
        .unwrap();
    for _ in 0..3 {
        sim.tick(0.1, BOUNDS);
    }
    let before = fingerprint(&sim);

    let report = sim
        .declare(EntityNode::leaf().with_constant_velocity(Vec2::new(0.0, -2.0)))
        .unwrap();
    assert_eq!(report.proxies_updated, 1);
    assert_eq!(fingerprint(&sim), before);

    sim.tick(0.1, BOUNDS);
    let proxy = sim.proxies().next().unwrap();
    assert_eq!(proxy.physics().velocity(), Vec2::new(0.0, -2.0));
    // Position integrated the velocity from before the swap.
    assert_eq!(proxy.physics().position(), Vec2::new(4.0, 0.0));
}

/// Test: a shape mismatch is reported and changes nothing.
#[test]
fn test_mismatch_leaves_state_untouched() {
    let mut sim = Simulation::default();
    sim.declare(fountain(vec![EntityNode::leaf()])).unwrap();
    for _ in 0..5 {
        sim.tick(0.1, BOUNDS);
    }
    let before = fingerprint(&sim);
    assert!(before.len() > 1);

    let err = sim
        .declare(fountain(vec![EntityNode::leaf(), EntityNode::leaf()]))
        .unwrap_err();
    match err {
        EmberError::StructuralMismatch {
            position,
            expected,
            found,
        } => {
            assert_eq!(position, "root[0]");
            assert_eq!(expected, "emitter with 1 prototype(s)");
            assert_eq!(found, "emitter with 2 prototype(s)");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fingerprint(&sim), before);

    // The old tree is still in charge.
    let report = sim.tick(0.2, BOUNDS);
    assert_eq!(report.spawned, 1);
}

/// Test: a leaf turning into an emitter is a mismatch.
#[test]
fn test_kind_change_rejected() {
    let mut sim = Simulation::default();
    sim.declare(vec![EntityNode::leaf(), EntityNode::leaf()]).unwrap();
    let err = sim
        .declare(vec![EntityNode::leaf(), fountain(vec![])])
        .unwrap_err();
    assert!(matches!(
        err,
        EmberError::StructuralMismatch { ref position, .. } if position == "root[1]"
    ));
}

/// Test: emitters take the new interval and future children the new template.
#[test]
fn test_emitter_parameters_follow_redeclaration() {
    let mut sim = Simulation::default();
    sim.declare(fountain(vec![EntityNode::leaf().with_lifetime(10.0)]))
        .unwrap();
    sim.tick(0.2, BOUNDS);
    assert_eq!(sim.len(), 2);

    let report = sim
        .declare(
            EntityNode::emitter(1.0, vec![EntityNode::leaf().with_lifetime(0.5)]).with_spawn_cap(8),
        )
        .unwrap();
    assert_eq!(report.proxies_updated, 2);
    assert_eq!(report.emitters_updated, 1);

    let emitter = sim.proxies().find(|p| p.is_emitter()).unwrap();
    assert_eq!(emitter.emitter().unwrap().interval(), 1.0);

    // Existing child keeps its packed lifetime; a new child uses the new one.
    sim.tick(1.0, BOUNDS);
    let mut lifetimes: Vec<f32> = sim
        .proxies()
        .filter(|p| !p.is_emitter())
        .map(|p| p.physics().lifetime())
        .collect();
    lifetimes.sort_by(f32::total_cmp);
    assert_eq!(lifetimes, vec![0.5, 10.0]);
}

/// Test: a spawned inner emitter takes the new interval and cap in place.
#[test]
fn test_nested_emitter_follows_redeclaration() {
    let nested = |interval: f32, cap: u32| {
        EntityNode::emitter(
            1.0,
            vec![EntityNode::emitter(interval, vec![EntityNode::leaf()]).with_spawn_cap(cap)],
        )
        .with_spawn_cap(8)
    };
    let mut sim = Simulation::default();
    sim.declare(nested(0.1, 3)).unwrap();
    sim.tick(1.0, BOUNDS);

    let inner = sim
        .proxies()
        .find(|p| p.is_emitter() && p.parent().is_some())
        .unwrap();
    let id = inner.id();
    let birth_frame = inner.birth_frame();
    let physics = inner.physics().as_bytes().to_vec();
    assert_eq!(inner.emitter().unwrap().interval(), 0.1);
    assert_eq!(inner.emitter().unwrap().spawn_cap(), 3);

    let report = sim.declare(nested(0.5, 6)).unwrap();
    assert_eq!(report.proxies_updated, 2);
    assert_eq!(report.emitters_updated, 2);

    let inner = sim.proxy(id).unwrap();
    assert_eq!(inner.emitter().unwrap().interval(), 0.5);
    assert_eq!(inner.emitter().unwrap().spawn_cap(), 6);
    assert_eq!(inner.birth_frame(), birth_frame);
    assert_eq!(inner.physics().as_bytes(), &physics[..]);

    // The old 0.1 s interval would have spawned here.
    assert_eq!(sim.tick(0.4, BOUNDS).spawned, 0);
    assert_eq!(sim.tick(0.2, BOUNDS).spawned, 1);
}

/// Test: per-proxy edits survive until the next redeclaration.
#[test]
fn test_proxy_edits_replaced_on_redeclare() {
    let mut sim = Simulation::default();
    sim.declare(EntityNode::leaf()).unwrap();
    let id = sim.proxies().next().unwrap().id();

    sim.proxy_mut(id)
        .unwrap()
        .properties_mut()
        .velocity
        .set(Vec2::new(3.0, 0.0));
    sim.tick(0.1, BOUNDS);
    assert_eq!(sim.proxy(id).unwrap().physics().velocity(), Vec2::new(3.0, 0.0));

    sim.declare(EntityNode::leaf()).unwrap();
    assert_eq!(sim.proxy(id).unwrap().properties().velocity.value(), Vec2::ZERO);
}
