use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::board::{Board, ChessMove, GameOver};

use crate::evaluation::evaluate;
use crate::movegen::{order_captures, order_moves};
use crate::tt::{usable_score, TTFlag, TranspositionTable};
use crate::types::{Score, SearchResult, DEFAULT_HASH_MB, DRAW_VALUE, INF, MATE_VALUE};

const MAX_QDEPTH: u8 = 10;
const NODES_PER_TIME_POLL: u64 = 1024;

/// Mutable search state shared across one `search()` call's recursion.
pub struct SearchContext {
    pub nodes: u64,
    pub start_time: Instant,
    pub stop: Arc<AtomicBool>,
    pub time_limit_ms: u64,
    pub tt: TranspositionTable,
    pub root_best_move: Option<ChessMove>,
    pub position_history: Vec<u64>,
    /// Suppresses the per-depth `info` line; set by benches so timing isn't skewed by stdout I/O.
    pub silent: bool,
}

impl SearchContext {
    pub fn new() -> Self {
        Self {
            nodes: 0,
            start_time: Instant::now(),
            stop: Arc::new(AtomicBool::new(false)),
            time_limit_ms: 0,
            tt: TranspositionTable::new(DEFAULT_HASH_MB),
            root_best_move: None,
            position_history: Vec::new(),
            silent: false,
        }
    }

    pub fn reset(&mut self) {
        self.nodes = 0;
        self.stop.store(false, Ordering::SeqCst);
        self.start_time = Instant::now();
        self.root_best_move = None;
    }

    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    fn poll_time(&self) {
        if self.time_limit_ms > 0 {
            let elapsed = self.start_time.elapsed().as_millis() as u64;
            if elapsed >= self.time_limit_ms {
                self.stop.store(true, Ordering::Relaxed);
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Increment the node counter and poll wall-clock time every `NODES_PER_TIME_POLL` nodes.
    fn tick(&mut self) {
        self.nodes += 1;
        if self.nodes % NODES_PER_TIME_POLL == 0 {
            self.poll_time();
        }
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterative deepening driver. Always returns a legal move when one exists.
pub fn search(board: &Board, ctx: &mut SearchContext, max_depth: u8) -> SearchResult {
    ctx.nodes = 0;
    ctx.stop.store(false, Ordering::SeqCst);
    ctx.start_time = Instant::now();

    let mut best_move: Option<ChessMove> = None;
    let mut best_score: Score = -INF;

    for depth in 1..=max_depth {
        ctx.root_best_move = None;
        let score = negamax(board, ctx, depth, -INF, INF, true, true);

        if ctx.is_stopped() {
            break;
        }

        best_score = score;
        if let Some(mv) = ctx.tt.probe(board.get_hash()).and_then(|e| e.best_move) {
            best_move = Some(mv);
        } else if let Some(mv) = ctx.root_best_move {
            best_move = Some(mv);
        }

        if !ctx.silent {
            let elapsed_ms = ctx.start_time.elapsed().as_millis() as u64;
            let bestmove_str = best_move.map(|m| m.to_string()).unwrap_or_default();
            println!(
                "info depth {} score cp {} nodes {} time {} pv {}",
                depth, best_score, ctx.nodes, elapsed_ms, bestmove_str
            );
        }
    }

    if best_move.is_none_or(|mv| !board.legal(mv)) {
        best_move = crate::board::MoveGen::new_legal(board).next();
    }

    SearchResult {
        best_move,
        score: best_score,
        depth: max_depth,
        nodes: ctx.nodes,
    }
}

/// Fail-hard negamax with alpha-beta pruning, a transposition table, null-move pruning, and PVS.
/// `is_root` is set only on the single call made directly from `search()`; it gates writes to
/// `ctx.root_best_move`, which preserves this iteration's best move even if its own `tt.store`
/// later loses the root hash slot to a deeper entry from a different subtree.
fn negamax(
    board: &Board,
    ctx: &mut SearchContext,
    depth: u8,
    mut alpha: Score,
    beta: Score,
    null_allowed: bool,
    is_root: bool,
) -> Score {
    if ctx.is_stopped() {
        return alpha;
    }

    if depth == 0 {
        return quiescence(board, ctx, alpha, beta, 0);
    }

    ctx.tick();
    if ctx.is_stopped() {
        return alpha;
    }

    let hash = board.get_hash();

    let mut tt_move: Option<ChessMove> = None;
    if let Some(entry) = ctx.tt.probe(hash) {
        tt_move = entry.best_move;
        if entry.depth >= depth {
            if let Some(score) = usable_score(entry, alpha, beta) {
                return score;
            }
        }
    }

    if board.is_halfmove_draw() || ctx.position_history.contains(&hash) {
        return DRAW_VALUE;
    }

    match board.game_over() {
        GameOver::Checkmate => return -MATE_VALUE + ctx.nodes as Score,
        GameOver::Stalemate | GameOver::InsufficientMaterial | GameOver::FiftyMove => {
            return DRAW_VALUE;
        }
        GameOver::None => {}
    }

    let in_check = board.in_check();

    if null_allowed && depth >= 3 && !in_check && board.has_non_pawn_material(board.side_to_move()) {
        if let Some(null_board) = board.null_move() {
            let null_score = -negamax(&null_board, ctx, depth - 3, -beta, -beta + 1, false, false);
            if ctx.is_stopped() {
                return alpha;
            }
            if null_score >= beta {
                return beta;
            }
        }
    }

    let moves = order_moves(board, tt_move);

    if moves.is_empty() {
        return if in_check {
            -MATE_VALUE + ctx.nodes as Score
        } else {
            DRAW_VALUE
        };
    }

    ctx.position_history.push(hash);

    let mut best_score = -INF;
    let mut best_move: Option<ChessMove> = None;
    let original_alpha = alpha;

    for (i, scored_move) in moves.iter().enumerate() {
        let new_board = board.make_move_new(scored_move.mv);

        let score = if i == 0 {
            -negamax(&new_board, ctx, depth - 1, -beta, -alpha, true, false)
        } else {
            let null_window = -negamax(&new_board, ctx, depth - 1, -alpha - 1, -alpha, true, false);
            if null_window > alpha && null_window < beta {
                -negamax(&new_board, ctx, depth - 1, -beta, -alpha, true, false)
            } else {
                null_window
            }
        };

        if ctx.is_stopped() {
            ctx.position_history.pop();
            return alpha;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(scored_move.mv);
            if is_root {
                ctx.root_best_move = Some(scored_move.mv);
            }
        }

        if score >= beta {
            ctx.position_history.pop();
            ctx.tt.store(hash, depth, beta, TTFlag::LowerBound, best_move);
            return beta;
        }

        if score > alpha {
            alpha = score;
        }
    }

    ctx.position_history.pop();

    let flag = if best_score > original_alpha {
        TTFlag::Exact
    } else {
        TTFlag::UpperBound
    };
    ctx.tt.store(hash, depth, best_score, flag, best_move);

    best_score
}

/// Capture-only extension beyond the search horizon, bounded by `MAX_QDEPTH`.
fn quiescence(board: &Board, ctx: &mut SearchContext, mut alpha: Score, beta: Score, qdepth: u8) -> Score {
    if qdepth > MAX_QDEPTH {
        return evaluate(board);
    }

    ctx.tick();
    if ctx.is_stopped() {
        return alpha;
    }

    let stand_pat = evaluate(board);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let captures = order_captures(board);

    for scored_move in &captures {
        let new_board = board.make_move_new(scored_move.mv);
        let score = -quiescence(&new_board, ctx, -beta, -alpha, qdepth + 1);

        if ctx.is_stopped() {
            return alpha;
        }

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_search_finds_move() {
        let board = Board::default();
        let mut ctx = SearchContext::new();
        let result = search(&board, &mut ctx, 3);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_search_finds_mate_in_one() {
        let board = Board::from_str("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4")
            .unwrap();
        let mut ctx = SearchContext::new();
        let result = search(&board, &mut ctx, 2);
        let best = result.best_move.unwrap();
        assert_eq!(best.to_string(), "h5f7", "Expected Qxf7# but got {}", best);
    }

    #[test]
    fn test_checkmate_score_is_very_negative() {
        let board = Board::from_str("rnbqkbnr/pppp1ppp/4p3/8/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
        let mut ctx = SearchContext::new();
        let score = negamax(&board, &mut ctx, 1, -INF, INF, true, false);
        assert!(score < -MATE_VALUE + 1000, "Checkmate score should be very negative, got {}", score);
    }

    #[test]
    fn test_tt_reduces_or_matches_node_count() {
        let board = Board::default();
        let mut ctx = SearchContext::new();

        search(&board, &mut ctx, 4);
        let nodes_first = ctx.nodes;

        ctx.reset();
        search(&board, &mut ctx, 4);
        let nodes_second = ctx.nodes;

        assert!(
            nodes_second <= nodes_first,
            "Second search ({} nodes) should use <= first ({} nodes) due to TT",
            nodes_second,
            nodes_first
        );
    }

    #[test]
    fn test_draw_detection_repetition() {
        let board = Board::default();
        let mut ctx = SearchContext::new();
        ctx.position_history.push(board.get_hash());
        let score = negamax(&board, &mut ctx, 3, -INF, INF, true, false);
        assert_eq!(score, DRAW_VALUE, "Repeated position should return draw value, got {}", score);
    }

    #[test]
    fn test_quiescence_checkmate_returns_mate_score() {
        let board = Board::from_str("rnbqkbnr/pppp1ppp/4p3/8/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
            .unwrap();
        let mut ctx = SearchContext::new();
        let score = negamax(&board, &mut ctx, 1, -INF, INF, true, false);
        assert!(score < -MATE_VALUE + 1000);
    }

    #[test]
    fn test_root_best_move_set_even_if_tt_store_is_later_evicted() {
        let board = Board::default();
        let mut ctx = SearchContext::new();
        let score = negamax(&board, &mut ctx, 3, -INF, INF, true, true);
        assert!(score > -INF && score < INF);
        assert!(ctx.root_best_move.is_some(), "root_best_move should be populated by the root call");
    }

    #[test]
    fn test_stop_preserves_a_legal_move() {
        let board = Board::default();
        let mut ctx = SearchContext::new();
        ctx.time_limit_ms = 1;
        ctx.start_time = Instant::now();
        let result = search(&board, &mut ctx, 20);
        assert!(result.best_move.is_some(), "Should fall back to a legal move even when stopped early");
    }

    #[test]
    fn test_quiescence_stand_pat_beats_hanging_capture() {
        // White to move, up a queen; stand-pat should already be well above any reasonable beta.
        let board = Board::from_str("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        let mut ctx = SearchContext::new();
        let score = quiescence(&board, &mut ctx, -INF, INF, 0);
        assert!(score > 800);
    }
}
