//! Chess engine components
//!
//! - Attack tables with magic bitboards
//! - Pseudo-legal and legal move generation, perft
//! - Transposition tables with three replacement policies
//! - Static evaluation
//! - Polyglot opening book
//! - Alpha-beta search on a worker thread

pub mod attacks;
pub mod book;
pub mod eval;
pub mod movegen;
pub mod search;
pub mod tt;

pub use attacks::AttackTables;
pub use book::PolyglotBook;
pub use eval::{Evaluator, MaterialEvaluator};
pub use movegen::{GenType, LegalMoveGenerator, MoveGenerator, PseudoLegalGenerator, legal_moves, perft};
pub use search::{SearchEngine, SearchLimits, SearchParams, Searcher};
pub use tt::{TableKind, TranspositionTable, new_table};
