//! # Memory Management
//!
//! Pre-allocated storage for live proxies.
//!
//! ## Design Philosophy
//!
//! The pool is sized once when the simulation is created. During a tick:
//! - No per-proxy heap allocation for slot bookkeeping
//! - Freed slots are recycled through a free list
//! - Stale handles are detected through generation counters

mod pool;

pub use pool::ProxyPool;
