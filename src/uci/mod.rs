//! UCI (Universal Chess Interface) front-end and engine options

pub mod options;
pub mod protocol;

pub use options::{EngineOptions, OptionChange};
pub use protocol::UCI;
