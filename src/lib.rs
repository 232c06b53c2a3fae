//! Kestrel: a UCI chess engine built on magic bitboards and a
//! transposition-table driven alpha-beta search.

pub mod core;
pub mod engine;
pub mod error;
pub mod uci;

pub use crate::core::{Move, Position};
pub use engine::search::{SearchLimits, Searcher};
pub use uci::UCI;
