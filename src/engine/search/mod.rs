//! Search: iterative deepening, alpha-beta, quiescence, and the worker thread.

mod alphabeta;
mod ordering;
pub mod params;
mod pv;
mod searcher;
mod thread;
pub mod types;

pub use params::SearchParams;
pub use pv::format_pv;
pub use searcher::Searcher;
pub use thread::{EngineState, SearchEngine};
pub use types::{
    NullObserver, Score, ScoreBound, SearchInfo, SearchLimits, SearchObserver, SearchResult, SearchStats,
};
