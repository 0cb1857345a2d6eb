//! # EMBER
//!
//! Declarative particle simulation. Hosts describe particles and emitters
//! as a tree of [`EntityNode`]s; the simulation turns the tree into live
//! proxies, advances them every frame and hands each one to a render
//! surface together with its [`RenderTag`].
//!
//! ## Architecture Rules
//!
//! 1. **Declarations are values** - rebuilding a tree has no side effects
//! 2. **Identity survives redeclaration** - only behaviors are swapped
//! 3. **Fixed phase order** - physics, render, frame, emission, draw, sweep
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember::{EntityNode, Simulation};
//! use glam::Vec2;
//!
//! let spark = EntityNode::leaf()
//!     .with_lifetime(1.5)
//!     .configure(|p| {
//!         p.velocity.set_initializer(|spawn| {
//!             Vec2::new(spawn.random_in(0, -2.0, 2.0), spawn.random_in(1, -4.0, -1.0))
//!         });
//!     });
//! let fountain = EntityNode::emitter(0.05, vec![spark]).starting_at_unit(Vec2::new(0.5, 1.0));
//!
//! let mut sim = Simulation::default();
//! sim.declare(fountain)?;
//! sim.tick(1.0 / 60.0, Vec2::new(800.0, 600.0));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod behavior;
pub mod config;
pub mod context;
pub mod emitter;
pub mod error;
pub mod node;
pub mod proxy;
pub mod reconcile;
pub mod render;
pub mod simulation;
mod tree;

pub use behavior::{Behavior, Configured, EntityContext, Initializer, PropertySet, SpawnContext};
pub use config::SimulationConfig;
pub use context::{ContextHandle, ContextSnapshot, SystemContext};
pub use emitter::{EmitterState, MIN_INTERVAL};
pub use error::{EmberError, EmberResult};
pub use node::{BirthHook, DeathHook, Declaration, EmitterSpec, EntityNode, NodeKind, StartPosition};
pub use proxy::RuntimeProxy;
pub use reconcile::ReconcileReport;
pub use render::{
    DrawFn, NullSurface, RenderItem, RenderState, RenderSurface, RenderTag, Transition,
    TransitionKind, TransitionPhase,
};
pub use simulation::{MemorySummary, Simulation, TickReport};

pub use ember_core::{Angle, PhysicsState, ProxyId};
pub use glam::Vec2;
