//! Error types shared across the crate

use thiserror::Error;

/// Reasons a FEN string is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("expected at least 4 fields, found {0}")]
    FieldCount(usize),
    #[error("unknown piece character '{0}'")]
    Piece(char),
    #[error("piece placement does not describe 8 ranks of 8 squares")]
    Placement,
    #[error("invalid side to move '{0}'")]
    Side(String),
    #[error("invalid castling field '{0}'")]
    Castling(String),
    #[error("invalid en passant square '{0}'")]
    EnPassant(String),
    #[error("each side needs exactly one king")]
    KingCount,
    #[error("pawn on the first or eighth rank")]
    PawnOnBackRank,
    #[error("side not to move is in check")]
    OpponentInCheck,
    #[error("invalid move counter '{0}'")]
    Counter(String),
}

/// A UCI move string that cannot be applied
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("malformed move text '{0}'")]
    Syntax(String),
    #[error("move '{0}' is not legal in this position")]
    Illegal(String),
}

/// Polyglot book failures
#[derive(Debug, Error)]
pub enum BookError {
    #[error("cannot read book {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("book {0} contains no complete entries")]
    Empty(String),
}

/// Magic multiplier search gave up
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MagicError {
    #[error("no {piece} magic found for square {square} after {attempts} attempts")]
    Exhausted {
        piece: &'static str,
        square: u8,
        attempts: u64,
    },
}

/// A `setoption` that cannot be applied
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown option '{0}'")]
    Unknown(String),
    #[error("invalid value '{value}' for option {name}")]
    InvalidValue { name: &'static str, value: String },
}
