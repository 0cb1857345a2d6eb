//! # EMBER Core
//!
//! Data structures shared by the EMBER particle simulation:
//! - A packed, quantized physics state of 26 bytes per proxy
//! - A pre-allocated, generational proxy pool
//! - Proxy identifiers that double as weak parent links
//!
//! ## Architecture Rules
//!
//! 1. **Dense state** - per-proxy physics is plain old data
//! 2. **Lossy, never failing** - out-of-range writes clamp
//! 3. **Handles, not pointers** - parents are ids into the pool
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_core::{PhysicsState, ProxyPool};
//! use glam::Vec2;
//!
//! let mut pool: ProxyPool<PhysicsState> = ProxyPool::new(10_000);
//! let id = pool.insert(PhysicsState::new(0, [7; 4])).unwrap();
//! pool.get_mut(id).unwrap().set_velocity(Vec2::new(1.0, 0.0));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod id;
pub mod memory;
pub mod physics;

pub use glam::Vec2;
pub use id::ProxyId;
pub use memory::ProxyPool;
pub use physics::{quantize, Angle, PhysicsState, DEFAULT_LIFETIME};
