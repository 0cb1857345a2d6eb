//! # System Context
//!
//! Shared, read-mostly simulation values: frame counter, simulation time,
//! average frame rate, viewport bounds and the debug flag.
//!
//! The simulation owns the context behind an `Arc<RwLock<_>>` and is its only
//! writer. Outside readers hold a [`ContextHandle`], a weak link that stops
//! resolving once the simulation is dropped; quantities computed through a
//! lost context fall back to zero instead of failing.

use std::sync::{Arc, Weak};

use glam::Vec2;
use parking_lot::RwLock;

use crate::behavior::lifetime_progress;
use crate::config::SimulationConfig;
use crate::proxy::RuntimeProxy;

/// Upper bound for a single instantaneous frame-rate sample.
const MAX_FRAME_RATE_SAMPLE: f32 = 1000.0;

/// Shared simulation state, written once per tick.
#[derive(Debug)]
pub struct SystemContext {
    frame: u64,
    time: f64,
    average_frame_rate: f32,
    smoothing: f32,
    bounds: Vec2,
    debug: bool,
}

impl SystemContext {
    /// Creates a context at frame zero.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            frame: 0,
            time: 0.0,
            average_frame_rate: config.assumed_frame_rate,
            smoothing: config.frame_rate_smoothing,
            bounds: Vec2::ZERO,
            debug: config.debug,
        }
    }

    /// Frames advanced so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulation time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Smoothed frames per second.
    #[must_use]
    pub fn average_frame_rate(&self) -> f32 {
        self.average_frame_rate
    }

    /// Viewport size in pixels.
    #[must_use]
    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Whether debug output is enabled.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Resolves a unit-space point against the viewport.
    #[must_use]
    pub fn resolve_unit(&self, unit: Vec2) -> Vec2 {
        unit * self.bounds
    }

    /// Copies the current values.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            frame: self.frame,
            time: self.time,
            average_frame_rate: self.average_frame_rate,
            bounds: self.bounds,
            debug: self.debug,
        }
    }

    pub(crate) fn set_bounds(&mut self, bounds: Vec2) {
        if bounds.is_finite() {
            self.bounds = bounds.max(Vec2::ZERO);
        }
    }

    pub(crate) fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Moves to the next frame. Called exactly once per tick.
    pub(crate) fn advance(&mut self, elapsed: f32) {
        self.frame += 1;
        self.time += f64::from(elapsed);
        if elapsed > 0.0 {
            let sample = (1.0 / elapsed).min(MAX_FRAME_RATE_SAMPLE);
            self.average_frame_rate += self.smoothing * (sample - self.average_frame_rate);
        }
    }
}

/// A copy of the context taken at one point of a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextSnapshot {
    /// Frame number.
    pub frame: u64,
    /// Simulation time in seconds.
    pub time: f64,
    /// Smoothed frames per second.
    pub average_frame_rate: f32,
    /// Viewport size in pixels.
    pub bounds: Vec2,
    /// Debug flag.
    pub debug: bool,
}

impl ContextSnapshot {
    /// Resolves a unit-space point against the viewport.
    #[must_use]
    pub fn resolve_unit(&self, unit: Vec2) -> Vec2 {
        unit * self.bounds
    }
}

/// The owning side of a context.
pub(crate) type SharedContext = Arc<RwLock<SystemContext>>;

/// Weak, external view of a simulation's context.
#[derive(Clone, Debug)]
pub struct ContextHandle {
    inner: Weak<RwLock<SystemContext>>,
}

impl ContextHandle {
    pub(crate) fn new(shared: &SharedContext) -> Self {
        Self {
            inner: Arc::downgrade(shared),
        }
    }

    /// Returns true while the simulation is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Current values, or `None` once the context is gone.
    #[must_use]
    pub fn snapshot(&self) -> Option<ContextSnapshot> {
        self.inner.upgrade().map(|shared| shared.read().snapshot())
    }

    /// Seconds `proxy` has been alive, or `0.0` if the context is gone.
    #[must_use]
    pub fn time_alive(&self, proxy: &RuntimeProxy) -> f32 {
        self.snapshot()
            .map_or(0.0, |snapshot| proxy.time_alive(&snapshot))
    }

    /// Life progress of `proxy` in `[0, 1]`, or `0.0` if the context is gone.
    #[must_use]
    pub fn lifetime_progress(&self, proxy: &RuntimeProxy) -> f32 {
        match self.snapshot() {
            Some(snapshot) => {
                lifetime_progress(proxy.time_alive(&snapshot), proxy.physics().lifetime())
            }
            None => 0.0,
        }
    }
}
