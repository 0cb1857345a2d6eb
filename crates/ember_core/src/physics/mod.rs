//! # Physics Representation
//!
//! Packed per-proxy physics and the quantization rules behind it.
//!
//! ## Design Philosophy
//!
//! - Thousands of proxies are live at once, so state is dense and fixed-width
//! - Precision is traded for size; every encoder clamps instead of failing
//! - Angles always wrap modulo 360 degrees

mod angle;
pub mod quantize;
mod state;

pub use angle::Angle;
pub use state::{PhysicsState, DEFAULT_LIFETIME};
