pub mod config;
pub mod domain;
pub mod frontier;
pub mod heuristic;
pub mod level;
pub mod map;
pub mod search;
pub mod stats;

pub use search::{Plan, SearchOutcome, Solver};
