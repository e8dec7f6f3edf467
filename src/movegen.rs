use arrayvec::ArrayVec;
use crate::board::{Board, ChessMove, MoveGen, Piece};

use crate::pst::MATERIAL;
use crate::types::Score;

pub struct ScoredMove {
    pub mv: ChessMove,
    pub score: Score,
}

fn piece_to_index(piece: Piece) -> usize {
    match piece {
        Piece::Pawn => 0,
        Piece::Knight => 1,
        Piece::Bishop => 2,
        Piece::Rook => 3,
        Piece::Queen => 4,
        Piece::King => 5,
    }
}

/// A move's destination square is occupied by the piece it captures, except en passant, where the
/// captured pawn sits beside the destination rather than on it.
fn is_en_passant(board: &Board, mv: ChessMove) -> bool {
    Some(mv.get_dest()) == board.en_passant() && board.piece_on(mv.get_source()) == Some(Piece::Pawn)
}

/// Scores one move per §4.3: tt_move beats everything, captures and promotions are biased above
/// quiet moves, and a move that gives check earns a flat bonus on top of whatever else it scored.
fn score_move(board: &Board, mv: ChessMove, tt_move: Option<ChessMove>) -> Score {
    let mut score: Score = if Some(mv) == tt_move {
        10_000
    } else if let Some(victim) = board.piece_on(mv.get_dest()) {
        let attacker = board.piece_on(mv.get_source()).unwrap();
        MATERIAL[piece_to_index(victim)] - MATERIAL[piece_to_index(attacker)] + 1000
    } else if is_en_passant(board, mv) {
        // pawn takes pawn: victim and attacker material cancel, leaving the flat MVV-LVA bonus.
        1000
    } else if let Some(promo) = mv.get_promotion() {
        MATERIAL[piece_to_index(promo)] + 500
    } else {
        0
    };

    if board.make_move_new(mv).checkers().popcnt() > 0 {
        score += 100;
    }

    score
}

/// Generates and orders all legal moves: hash move, then captures/promotions by §4.3's key, then
/// quiet moves, all stably sorted descending by score.
pub fn order_moves(board: &Board, tt_move: Option<ChessMove>) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in MoveGen::new_legal(board) {
        let score = score_move(board, mv, tt_move);
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Generates only capture moves (including en passant) for quiescence search, ordered per §4.3
/// with no hash move.
pub fn order_captures(board: &Board) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();
    let them = board.color_combined(!board.side_to_move());

    for mv in MoveGen::new_legal(board) {
        let is_capture = (them & crate::board::BitBoard::from_square(mv.get_dest())).popcnt() > 0
            || is_en_passant(board, mv);
        if !is_capture {
            continue;
        }
        let score = score_move(board, mv, None);
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
