//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`FifoReplacer`] - hot-store pages leave in arrival order

mod fifo;

pub use fifo::FifoReplacer;
