//! Search limits, reports, stats, and constants.

use crate::core::moves::Move;
use crate::core::board::Color;
use std::fmt;
use std::time::Duration;

pub const INFINITY: i32 = 30000;
pub const MATE_SCORE: i32 = 29000;
pub const MAX_DEPTH: i32 = 64;
/// Scores at or beyond this are mate-in-N
pub const VALUE_IS_MATE: i32 = MATE_SCORE - MAX_DEPTH;
/// Scores beyond this are decided positions that are not yet mates
pub const KNOWN_WIN: i32 = 20000;

/// One ply in the internal depth unit
pub const PLY: i32 = 2;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u32>,
    pub infinite: bool,
}

impl SearchLimits {
    pub fn depth(depth: i32) -> Self {
        SearchLimits {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        SearchLimits {
            movetime: Some(ms),
            ..Default::default()
        }
    }

    pub fn nodes(nodes: u64) -> Self {
        SearchLimits {
            nodes: Some(nodes),
            ..Default::default()
        }
    }

    /// True when the clock decides when to stop
    pub fn manages_time(&self) -> bool {
        !self.infinite && self.movetime.is_none() && (self.wtime.is_some() || self.btime.is_some())
    }

    /// Time budget for this move. `panic` doubles the clock share when the
    /// score has just collapsed; the result never exceeds half the clock.
    pub fn move_time(&self, side: Color, panic: bool) -> Option<Duration> {
        if self.infinite {
            return None;
        }
        if let Some(ms) = self.movetime {
            return Some(Duration::from_millis(ms));
        }
        let (time, inc) = match side {
            Color::White => (self.wtime?, self.winc.unwrap_or(0)),
            Color::Black => (self.btime?, self.binc.unwrap_or(0)),
        };
        let moves_to_go = self.movestogo.filter(|&m| m > 0).unwrap_or(30) as u64;
        let mut budget = time / moves_to_go + inc / 2;
        if panic {
            budget *= 2;
        }
        Some(Duration::from_millis(budget.min(time / 2)))
    }
}

/// Whether a reported score is exact or only a bound
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScoreBound {
    #[default]
    Exact,
    Lower,
    Upper,
}

/// A score as reported to the outside world
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Mate in N full moves; negative when being mated
    Mate(i32),
}

impl Score {
    pub fn from_value(score: i32) -> Self {
        if score >= VALUE_IS_MATE {
            Score::Mate((MATE_SCORE - score + 1) / 2)
        } else if score <= -VALUE_IS_MATE {
            Score::Mate(-(MATE_SCORE + score) / 2)
        } else {
            Score::Centipawns(score)
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "cp {cp}"),
            Score::Mate(n) => write!(f, "mate {n}"),
        }
    }
}

/// Progress report sent to the observer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchInfo {
    pub depth: i32,
    pub seldepth: i32,
    pub score: Score,
    pub bound: ScoreBound,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

/// Receives progress and the final move of a search
pub trait SearchObserver: Send {
    fn info(&mut self, info: &SearchInfo);

    /// `best` is `None` when the root has no legal move
    fn best_move(&mut self, best: Option<Move>, ponder: Option<Move>);
}

/// Observer that drops everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {
    fn info(&mut self, _info: &SearchInfo) {}

    fn best_move(&mut self, _best: Option<Move>, _ponder: Option<Move>) {}
}

/// Outcome of a finished search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder: Option<Move>,
    pub score: i32,
    /// Last fully completed iteration
    pub depth: i32,
    pub nodes: u64,
    /// Ended by the stop flag rather than a limit
    pub stopped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SearchStats {
    pub nodes: u64,
    pub pv_nodes: u64,
    pub qnodes: u64,
    pub pv_cut: u64,
    pub pv_all: u64,
    pub null_cut: u64,
    pub null_all: u64,
    pub tt_probes: u64,
    pub tt_exact_hits: u64,
    pub tt_lower_hits: u64,
    pub tt_upper_hits: u64,
    pub eval_probes: u64,
    pub eval_hits: u64,
    pub aspiration_probes: u64,
    pub aspiration_hits: u64,
    pub futility_hits: u64,
    pub aggressive_futility_hits: u64,
    pub razoring_probes: u64,
    pub razoring_hits: u64,
    pub null_move_probes: u64,
    pub null_move_hits: u64,
    pub singular_probes: u64,
    pub singular_hits: u64,
}

impl SearchStats {
    pub fn total_nodes(&self) -> u64 {
        self.nodes + self.pv_nodes + self.qnodes
    }
}

fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 { 0 } else { part * 100 / whole }
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_nodes();
        writeln!(f, "nodes pv {} ({}%)", self.pv_nodes, percent(self.pv_nodes, total))?;
        writeln!(f, "nodes qs {} ({}%)", self.qnodes, percent(self.qnodes, total))?;
        writeln!(f, "nodes null {} ({}%)", self.nodes, percent(self.nodes, total))?;
        writeln!(
            f,
            "pv cut {} ({}%) all {}",
            self.pv_cut,
            percent(self.pv_cut, self.pv_cut + self.pv_all),
            self.pv_all
        )?;
        writeln!(
            f,
            "null cut {} ({}%) all {}",
            self.null_cut,
            percent(self.null_cut, self.null_cut + self.null_all),
            self.null_all
        )?;
        writeln!(f, "aspiration hits {}%", percent(self.aspiration_hits, self.aspiration_probes))?;
        writeln!(f, "tt eval hits {} ({}%)", self.eval_hits, percent(self.eval_hits, self.eval_probes))?;
        writeln!(
            f,
            "tt hits exact {} lower {}% upper {}%",
            self.tt_exact_hits,
            percent(self.tt_lower_hits, self.tt_probes),
            percent(self.tt_upper_hits, self.tt_probes)
        )?;
        writeln!(f, "futility hits {} aggressive {}", self.futility_hits, self.aggressive_futility_hits)?;
        writeln!(
            f,
            "null move hits {} ({}%)",
            self.null_move_hits,
            percent(self.null_move_hits, self.null_move_probes)
        )?;
        writeln!(
            f,
            "razoring hits {} ({}%)",
            self.razoring_hits,
            percent(self.razoring_hits, self.razoring_probes)
        )?;
        write!(
            f,
            "singular extension hits {} ({}%)",
            self.singular_hits,
            percent(self.singular_hits, self.singular_probes)
        )
    }
}
