use crate::board::{Board, Color, GameOver, MoveGen, Piece, Square, ALL_SQUARES};

use crate::pst;
use crate::types::{Score, DRAW_VALUE, MATE_VALUE};

/// Maps a Piece to its PST/material index (0-5, matching `board::Piece`'s own declaration order).
fn piece_index(piece: Piece) -> usize {
    match piece {
        Piece::Pawn => pst::PAWN,
        Piece::Knight => pst::KNIGHT,
        Piece::Bishop => pst::BISHOP,
        Piece::Rook => pst::ROOK,
        Piece::Queen => pst::QUEEN,
        Piece::King => pst::KING,
    }
}

/// Piece-square table to consult for this piece given the endgame flag. Pawn and king alone carry
/// a distinct endgame table; the rest use their single table in every phase.
fn pst_table(piece: Piece, endgame: bool) -> &'static [i32; 64] {
    match piece {
        Piece::Pawn if endgame => &pst::PAWN_EG,
        Piece::Pawn => &pst::PAWN_MG,
        Piece::Knight => &pst::KNIGHT_TABLE,
        Piece::Bishop => &pst::BISHOP_TABLE,
        Piece::Rook => &pst::ROOK_TABLE,
        Piece::Queen => &pst::QUEEN_TABLE,
        Piece::King if endgame => &pst::KING_EG,
        Piece::King => &pst::KING_MG,
    }
}

/// Index into a PST for a piece at `sq`: White reads the table directly, Black mirrors through
/// the board center (`63 - sq`).
fn pst_index(color: Color, sq: Square) -> usize {
    match color {
        Color::White => sq.to_index(),
        Color::Black => 63 - sq.to_index(),
    }
}

fn king_dist_from_center(sq: Square) -> i32 {
    let f = sq.file().to_index() as i32;
    let r = sq.rank().to_index() as i32;
    (3 - f).max(f - 4) + (3 - r).max(r - 4)
}

/// Evaluates a position, returning a centipawn score from the perspective of the side to move.
///
/// Computed entirely from White's perspective through the material/PST/mobility/king-distance
/// terms, then negated once at the very end if Black is to move — including the endgame
/// king-distance term, which is intentionally keyed off the side to move rather than mirrored
/// per-color (see DESIGN.md).
pub fn evaluate(board: &Board) -> Score {
    match board.game_over() {
        GameOver::Checkmate => return -MATE_VALUE,
        GameOver::Stalemate | GameOver::InsufficientMaterial | GameOver::FiftyMove => {
            return DRAW_VALUE;
        }
        GameOver::None => {}
    }

    let non_pk = board.pieces(Piece::Knight).popcnt()
        + board.pieces(Piece::Bishop).popcnt()
        + board.pieces(Piece::Rook).popcnt()
        + board.pieces(Piece::Queen).popcnt();
    let endgame = non_pk <= 6;

    let mut score: Score = 0;

    for sq in ALL_SQUARES {
        if let Some(piece) = board.piece_on(sq) {
            let color = board.color_on(sq).unwrap();
            let idx = piece_index(piece);
            let term = pst::MATERIAL[idx] + pst_table(piece, endgame)[pst_index(color, sq)];
            score += if color == Color::White { term } else { -term };
        }
    }

    let white_pawns = (board.pieces(Piece::Pawn) & board.color_combined(Color::White)).popcnt();
    let black_pawns = (board.pieces(Piece::Pawn) & board.color_combined(Color::Black)).popcnt();
    score += 10 * (white_pawns as Score - black_pawns as Score);

    // Mobility: only the side to move gets a legal move list out of the generator, so the other
    // bucket is always zero here — a known approximation, see DESIGN.md and §9 of the spec.
    let mut white_mobility: Score = 0;
    let mut black_mobility: Score = 0;
    for mv in MoveGen::new_legal(board) {
        match board.color_on(mv.get_source()) {
            Some(Color::White) => white_mobility += 1,
            Some(Color::Black) => black_mobility += 1,
            None => {}
        }
    }
    score += 5 * (white_mobility - black_mobility);

    if endgame {
        let us = board.side_to_move();
        let opp_king = board.king_square(!us);
        let us_king = board.king_square(us);
        let opp_king_dist_from_center = king_dist_from_center(opp_king);
        let king_manhattan = (us_king.file().to_index() as i32 - opp_king.file().to_index() as i32)
            .abs()
            + (us_king.rank().to_index() as i32 - opp_king.rank().to_index() as i32).abs();
        score += 10 * (opp_king_dist_from_center + (14 - king_manhattan));
    }

    if board.in_check() {
        score -= 20;
    }

    if board.side_to_move() == Color::White {
        score
    } else {
        -score
    }
}
