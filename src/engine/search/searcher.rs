//! Searcher: iterative deepening driver, time/node limits, and search entry point.

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::board::Color;
use crate::core::moves::Move;
use crate::core::position::Position;
use crate::engine::eval::{Evaluator, MaterialEvaluator};
use crate::engine::movegen::legal_moves;
use crate::engine::tt::{NodeType, TTEntry, TableKind, TranspositionTable, new_table};

use super::ordering::SortInfo;
use super::params::SearchParams;
use super::pv::{format_pv, principal_variation};
use super::types::{
    INFINITY, MATE_SCORE, MAX_DEPTH, NullObserver, PLY, Score, ScoreBound, SearchInfo, SearchLimits,
    SearchObserver, SearchResult, SearchStats, VALUE_IS_MATE,
};

/// The search was cut short by a stop request or an exhausted budget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct Aborted;

/// How a node sits in the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum NodeKind {
    Root = 0,
    Pv = 1,
    /// Zero-window node
    NonPv = 2,
}

impl NodeKind {
    pub(super) fn is_pv(self) -> bool {
        self != NodeKind::NonPv
    }
}

/// Time checks happen once per this many nodes
const TIME_CHECK_INTERVAL: u64 = 1024;

pub struct Searcher {
    pub(super) tt: Arc<dyn TranspositionTable>,
    pub(super) evaluator: Arc<dyn Evaluator>,
    pub(super) params: SearchParams,
    pub(super) sort: SortInfo,
    pub(super) stats: SearchStats,
    pub(super) stop: Arc<AtomicBool>,
    observer: Box<dyn SearchObserver>,
    pub(super) start_time: Instant,
    time_limit: Option<Duration>,
    node_limit: Option<u64>,
    /// Undo stack height at the root
    pub(super) initial_ply: usize,
    /// Current iteration, in plies
    pub(super) depth: i32,
    pub(super) sel_depth: i32,
    /// Limits are only enforced once one iteration has finished
    iteration_completed: bool,
    pub(super) root_best: Move,
    pub(super) root_best_score: i32,
    pv_reduction: Box<[[i32; 64]; 64]>,
    non_pv_reduction: Box<[[i32; 64]; 64]>,
}

impl Searcher {
    pub fn new(tt: Arc<dyn TranspositionTable>, evaluator: Arc<dyn Evaluator>, params: SearchParams) -> Self {
        let mut pv_reduction = Box::new([[0; 64]; 64]);
        let mut non_pv_reduction = Box::new([[0; 64]; 64]);
        for depth in 1..64 {
            for move_number in 1..64 {
                let base = (depth as f64).ln() * (move_number as f64).ln();
                let pv = 0.5 + base / 6.0;
                let non_pv = 0.5 + base / 3.0;
                pv_reduction[depth][move_number] = if pv >= 1.0 { (pv * PLY as f64).floor() as i32 } else { 0 };
                non_pv_reduction[depth][move_number] =
                    if non_pv >= 1.0 { (non_pv * PLY as f64).floor() as i32 } else { 0 };
            }
        }

        Searcher {
            tt,
            evaluator,
            params,
            sort: SortInfo::new(),
            stats: SearchStats::default(),
            stop: Arc::new(AtomicBool::new(false)),
            observer: Box::new(NullObserver),
            start_time: Instant::now(),
            time_limit: None,
            node_limit: None,
            initial_ply: 0,
            depth: 0,
            sel_depth: 0,
            iteration_completed: false,
            root_best: Move::NONE,
            root_best_score: -MATE_SCORE,
            pv_reduction,
            non_pv_reduction,
        }
    }

    /// Shared flag that aborts the running search when set. `search`
    /// consumes it on return, so the next search starts unstopped.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn set_observer(&mut self, observer: Box<dyn SearchObserver>) {
        self.observer = observer;
    }

    pub fn tt(&self) -> &Arc<dyn TranspositionTable> {
        &self.tt
    }

    pub fn set_tt(&mut self, tt: Arc<dyn TranspositionTable>) {
        self.tt = tt;
    }

    pub fn set_evaluator(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.evaluator = evaluator;
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SearchParams) {
        self.params = params;
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Forget everything learned: table, killers and history
    pub fn clear(&mut self) {
        self.tt.clear();
        self.sort.clear();
    }

    pub(super) fn ply(&self, position: &Position) -> usize {
        position.history_len() - self.initial_ply
    }

    pub(super) fn reduction(&self, kind: NodeKind, depth: i32, move_number: usize) -> i32 {
        let d = ((depth / PLY).clamp(0, 63)) as usize;
        let m = move_number.min(63);
        if kind.is_pv() {
            self.pv_reduction[d][m]
        } else {
            self.non_pv_reduction[d][m]
        }
    }

    /// Poll the stop flag and, after the first iteration, the budgets
    pub(super) fn check_limits(&self) -> Result<(), Aborted> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(Aborted);
        }
        if !self.iteration_completed {
            return Ok(());
        }
        let nodes = self.stats.total_nodes();
        if self.node_limit.is_some_and(|limit| nodes > limit) {
            return Err(Aborted);
        }
        if nodes % TIME_CHECK_INTERVAL == 0
            && self.time_limit.is_some_and(|limit| self.start_time.elapsed() > limit)
        {
            return Err(Aborted);
        }
        Ok(())
    }

    /// Draws count slightly against the root side to move
    pub(super) fn draw_score(&self, ply: usize) -> i32 {
        if ply % 2 == 0 {
            -self.params.contempt
        } else {
            self.params.contempt
        }
    }

    /// Score of a node without legal moves
    pub(super) fn endgame_score(&self, position: &Position, ply: usize) -> i32 {
        if position.in_check() {
            mated_in(ply)
        } else {
            self.draw_score(ply)
        }
    }

    /// Static evaluation, cached in the table as an eval-only entry
    pub(super) fn static_eval(&mut self, position: &Position, entry: Option<TTEntry>, ply: usize) -> i32 {
        self.stats.eval_probes += 1;
        if let Some(e) = entry {
            if e.node_type == NodeType::Eval {
                self.stats.eval_hits += 1;
                return e.score as i32;
            }
        }
        let eval = self.evaluator.evaluate(position);
        if entry.is_none() {
            self.tt.store(position.key(), position.hash().secondary, NodeType::Eval, Move::NONE, eval, 0, false, ply);
        }
        eval
    }

    /// Tighten the static eval with a compatible stored bound
    pub(super) fn refine_eval(entry: Option<TTEntry>, eval: i32) -> i32 {
        match entry {
            Some(e) => {
                let score = e.score as i32;
                match e.node_type {
                    NodeType::Exact => score,
                    NodeType::FailLow if score < eval => score,
                    NodeType::FailHigh if score > eval => score,
                    _ => eval,
                }
            }
            None => eval,
        }
    }

    /// A stored result deep enough and with a usable bound
    pub(super) fn can_use_tt(&mut self, entry: &TTEntry, depth: i32, alpha: i32, beta: i32) -> bool {
        if (entry.depth as i32) < depth || entry.generation != self.tt.generation() {
            return false;
        }
        let score = entry.score as i32;
        match entry.node_type {
            NodeType::Exact => {
                self.stats.tt_exact_hits += 1;
                true
            }
            NodeType::FailLow => {
                self.stats.tt_upper_hits += 1;
                score <= alpha
            }
            NodeType::FailHigh => {
                self.stats.tt_lower_hits += 1;
                score >= beta
            }
            NodeType::Eval => false,
        }
    }

    pub(super) fn notify(&mut self, position: &mut Position, best: Move, score: i32, alpha: i32, beta: i32) {
        if best.is_none() {
            return;
        }
        let pv = principal_variation(self.tt.as_ref(), position, best, MAX_DEPTH as usize);
        let info = self.make_info(score, alpha, beta, pv);
        self.observer.info(&info);
    }

    fn make_info(&self, score: i32, alpha: i32, beta: i32, pv: Vec<Move>) -> SearchInfo {
        let elapsed = self.start_time.elapsed().as_millis() as u64;
        let nodes = self.stats.total_nodes();
        let bound = if score <= alpha {
            ScoreBound::Upper
        } else if score >= beta {
            ScoreBound::Lower
        } else {
            ScoreBound::Exact
        };
        SearchInfo {
            depth: self.depth,
            seldepth: self.sel_depth,
            score: Score::from_value(score),
            bound,
            nodes,
            nps: nodes * 1000 / (elapsed + 1),
            time_ms: elapsed,
            hashfull: self.tt.hashfull(),
            pv,
        }
    }

    /// Run an iterative deepening search on `position` and report the
    /// result to the observer. The position is left as it was found.
    pub fn search(&mut self, position: &mut Position, limits: &SearchLimits) -> SearchResult {
        let mut result = self.iterate(position, limits);
        result.stopped = self.stop.swap(false, Ordering::Relaxed);
        result
    }

    fn iterate(&mut self, position: &mut Position, limits: &SearchLimits) -> SearchResult {
        self.start_time = Instant::now();
        self.stats = SearchStats::default();
        self.initial_ply = position.history_len();
        self.iteration_completed = false;
        self.sel_depth = 0;
        self.root_best = Move::NONE;
        self.root_best_score = -MATE_SCORE;

        let side: Color = position.side_to_move();
        self.time_limit = limits.move_time(side, false);
        self.node_limit = limits.nodes;
        let max_depth = limits.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH);

        debug!(target: "kestrel::search", "searching {}", position.to_fen());

        let root_moves = legal_moves(position);
        if root_moves.is_empty() {
            let score = self.endgame_score(position, 0);
            debug!(target: "kestrel::search", "no legal moves, score {}", score);
            self.observer.best_move(None, None);
            return SearchResult {
                best_move: None,
                ponder: None,
                score,
                depth: 0,
                nodes: 0,
                stopped: false,
            };
        }

        let root_entry = self.tt.probe(position.key(), position.hash().secondary, false, 0);
        let mut root_score = self.static_eval(position, root_entry, 0);
        self.tt.advance_generation();

        let mut completed: Option<(Move, i32, i32)> = None;
        let mut panic = false;

        for depth in 1..=max_depth {
            self.depth = depth;
            self.sel_depth = 0;
            let iteration_start = Instant::now();
            let previous_score = root_score;

            let (score, alpha, beta) = match self.aspiration(position, depth, root_score) {
                Ok(result) => result,
                Err(Aborted) => break,
            };
            root_score = score;
            if self.root_best.is_some() {
                completed = Some((self.root_best, score, depth));
            }
            self.iteration_completed = true;

            let best = self.root_best;
            self.notify(position, best, score, alpha, beta);

            if depth > 6 && !panic && score < previous_score - 100 {
                panic = true;
                self.time_limit = limits.move_time(side, true);
                debug!(target: "kestrel::search", "score dropped to {}, extending time", score);
            }

            let elapsed = self.start_time.elapsed();
            let out_of_time = self.time_limit.is_some_and(|limit| {
                score.abs() > VALUE_IS_MATE || elapsed + iteration_start.elapsed() * 2 > limit
            });
            if out_of_time || depth >= max_depth || score.abs() == MATE_SCORE {
                break;
            }
        }

        let (best, score, depth) = match completed {
            Some(found) => found,
            // Stopped inside the first iteration: fall back to what it had
            None if self.root_best.is_some() => (self.root_best, self.root_best_score, 0),
            None => (root_moves[0], root_score, 0),
        };

        let pv = principal_variation(self.tt.as_ref(), position, best, MAX_DEPTH as usize);
        let ponder = pv.get(1).copied();
        debug!(target: "kestrel::search", "bestmove {} pv {}", best, format_pv(&pv));
        debug!(target: "kestrel::search", "search statistics\n{}", self.stats);
        self.observer.best_move(Some(best), ponder);

        SearchResult {
            best_move: Some(best),
            ponder,
            score,
            depth,
            nodes: self.stats.total_nodes(),
            stopped: false,
        }
    }

    /// One iteration with widening aspiration windows around `initial`
    fn aspiration(&mut self, position: &mut Position, depth: i32, initial: i32) -> Result<(i32, i32, i32), Aborted> {
        let windows = self.params.aspiration_windows.clone();
        let widen_down = |count: usize| match windows.get(count) {
            Some(&w) if initial - w > -MATE_SCORE => initial - w,
            _ => -INFINITY,
        };
        let widen_up = |count: usize| match windows.get(count) {
            Some(&w) if initial + w < MATE_SCORE => initial + w,
            _ => INFINITY,
        };

        let mut fail_low = 0;
        let mut fail_high = 0;
        let mut alpha = widen_down(0);
        let mut beta = widen_up(0);

        loop {
            self.stats.aspiration_probes += 1;
            let score = self.search_node(position, NodeKind::Root, depth * PLY, alpha, beta, false, Move::NONE)?;
            if score <= alpha {
                fail_low += 1;
                alpha = widen_down(fail_low);
            } else if score >= beta {
                fail_high += 1;
                beta = widen_up(fail_high);
            } else {
                self.stats.aspiration_hits += 1;
                return Ok((score, alpha, beta));
            }
        }
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Searcher::new(
            new_table(TableKind::default(), 16),
            Arc::new(MaterialEvaluator),
            SearchParams::default(),
        )
    }
}

pub(super) fn mated_in(ply: usize) -> i32 {
    -MATE_SCORE + ply as i32
}

pub(super) fn mate_in(ply: usize) -> i32 {
    MATE_SCORE - ply as i32
}
