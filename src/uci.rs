use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::board::{Board, ChessMove, Color, File, Piece, Rank, Square};

use crate::search::{self, SearchContext};
use crate::types::{EngineConfig, DEFAULT_DEPTH, DEFAULT_MOVETIME_MS};

/// Line-oriented UCI command loop: owns the board, engine config, and search context across
/// commands, and hands the context to a worker thread for the duration of each `go`.
pub fn run() {
    let stdin = io::stdin();

    let mut board = Board::default();
    let mut config = EngineConfig::default();
    let mut ctx: Option<SearchContext> = Some(SearchContext::new());
    let mut stop_flag: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let mut search_thread: Option<thread::JoinHandle<SearchContext>> = None;
    let mut position_history: Vec<u64> = vec![board.get_hash()];

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            "uci" => {
                println!("id name Talon");
                println!("id author the Talon contributors");
                println!("option name Hash type spin default 16 min 1 max 4096");
                println!("uciok");
            }
            "isready" => {
                wait_for_search(&mut search_thread, &mut ctx);
                println!("readyok");
            }
            "ucinewgame" => {
                wait_for_search(&mut search_thread, &mut ctx);
                board = Board::default();
                position_history = vec![board.get_hash()];
                if let Some(ref mut c) = ctx {
                    c.tt.clear();
                }
            }
            "position" => {
                wait_for_search(&mut search_thread, &mut ctx);
                if let Err(msg) = parse_position(&tokens, &mut board, &mut position_history) {
                    eprintln!("info string {}", msg);
                }
            }
            "go" => {
                wait_for_search(&mut search_thread, &mut ctx);

                let go_params = parse_go(&tokens);
                let max_depth = go_params.depth.unwrap_or(DEFAULT_DEPTH);

                let mut c = ctx.take().expect("search context missing");
                c.reset();
                c.time_limit_ms = go_params.time_limit_ms(board.side_to_move());
                // Drop the position to be searched from its own history: it must only compare
                // against strictly earlier positions, or the very first probe would call itself
                // a repetition (see DESIGN.md).
                c.position_history = position_history[..position_history.len().saturating_sub(1)].to_vec();

                let flag = Arc::new(AtomicBool::new(false));
                stop_flag = flag.clone();
                c.stop = flag;

                let board_copy = board;

                search_thread = Some(thread::spawn(move || {
                    let result = search::search(&board_copy, &mut c, max_depth);
                    match result.best_move {
                        Some(mv) => println!("bestmove {}", mv),
                        None => println!("bestmove 0000"),
                    }
                    c
                }));
            }
            "stop" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut ctx);
            }
            "setoption" => {
                wait_for_search(&mut search_thread, &mut ctx);
                if let Some(ref mut c) = ctx {
                    parse_setoption(&tokens, &mut config, c);
                }
            }
            "quit" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut ctx);
                break;
            }
            "d" | "print" => {
                println!("{}", board);
            }
            other => {
                eprintln!("info string unrecognized command: {}", other);
            }
        }
    }
}

/// Join a running search thread, if any, recovering the `SearchContext` it carried.
fn wait_for_search(handle: &mut Option<thread::JoinHandle<SearchContext>>, ctx: &mut Option<SearchContext>) {
    if let Some(h) = handle.take() {
        match h.join() {
            Ok(c) => *ctx = Some(c),
            Err(_) => *ctx = Some(SearchContext::new()),
        }
    }
}

/// Parsed `go` command parameters (§6).
struct GoParams {
    depth: Option<u8>,
    movetime: Option<u64>,
    wtime: Option<u64>,
    btime: Option<u64>,
}

impl GoParams {
    fn new() -> Self {
        Self {
            depth: None,
            movetime: None,
            wtime: None,
            btime: None,
        }
    }

    /// `movetime` sets the limit directly; `wtime`/`btime` set it to `time/20`; otherwise the
    /// default movetime applies.
    fn time_limit_ms(&self, side: Color) -> u64 {
        if let Some(mt) = self.movetime {
            return mt;
        }

        let side_time = match side {
            Color::White => self.wtime,
            Color::Black => self.btime,
        };

        match side_time {
            Some(t) => t / 20,
            None => DEFAULT_MOVETIME_MS,
        }
    }
}

fn parse_go(tokens: &[&str]) -> GoParams {
    let mut params = GoParams::new();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                if i < tokens.len() {
                    params.depth = tokens[i].parse().ok();
                }
            }
            "movetime" => {
                i += 1;
                if i < tokens.len() {
                    params.movetime = tokens[i].parse().ok();
                }
            }
            "wtime" => {
                i += 1;
                if i < tokens.len() {
                    params.wtime = tokens[i].parse().ok();
                }
            }
            "btime" => {
                i += 1;
                if i < tokens.len() {
                    params.btime = tokens[i].parse().ok();
                }
            }
            _ => {}
        }
        i += 1;
    }

    params
}

/// `position startpos [moves ...]` or `position fen <fen> [moves ...]`. Rebuilds `history` as the
/// sequence of Zobrist hashes from the root position through the last applied move; illegal moves
/// are skipped with a diagnostic rather than aborting the rest of the command.
fn parse_position(tokens: &[&str], board: &mut Board, history: &mut Vec<u64>) -> Result<(), String> {
    if tokens.len() < 2 {
        return Err("position: missing startpos/fen".to_string());
    }

    let mut idx = 1;

    if tokens[idx] == "startpos" {
        *board = Board::default();
        idx += 1;
    } else if tokens[idx] == "fen" {
        idx += 1;
        let mut fen_parts: Vec<&str> = Vec::new();
        while idx < tokens.len() && tokens[idx] != "moves" && fen_parts.len() < 6 {
            fen_parts.push(tokens[idx]);
            idx += 1;
        }
        if fen_parts.len() < 4 {
            return Err(format!("position fen: expected at least 4 fields, got {}", fen_parts.len()));
        }
        let fen_str = fen_parts.join(" ");
        *board = Board::from_str(&fen_str).map_err(|e| format!("position fen: {}", e))?;
    } else {
        return Err(format!("position: expected startpos/fen, got {}", tokens[idx]));
    }

    history.clear();
    history.push(board.get_hash());

    if idx < tokens.len() && tokens[idx] == "moves" {
        idx += 1;
        for &move_str in &tokens[idx..] {
            match parse_uci_move(board, move_str) {
                Some(mv) => {
                    *board = board.make_move_new(mv);
                    history.push(board.get_hash());
                }
                None => eprintln!("info string illegal or unparsable move: {}", move_str),
            }
        }
    }

    Ok(())
}

/// Parses a UCI coordinate move (`e2e4`, `a7a8q`) against the current position and rejects it
/// unless it is legal there.
fn parse_uci_move(board: &Board, move_str: &str) -> Option<ChessMove> {
    if move_str.len() < 4 {
        return None;
    }
    let bytes = move_str.as_bytes();

    let src_file = bytes[0].wrapping_sub(b'a');
    let src_rank = bytes[1].wrapping_sub(b'1');
    let dst_file = bytes[2].wrapping_sub(b'a');
    let dst_rank = bytes[3].wrapping_sub(b'1');

    if src_file >= 8 || src_rank >= 8 || dst_file >= 8 || dst_rank >= 8 {
        return None;
    }

    let src = Square::make_square(Rank::from_index(src_rank as usize), File::from_index(src_file as usize));
    let dst = Square::make_square(Rank::from_index(dst_rank as usize), File::from_index(dst_file as usize));

    let promo = if move_str.len() >= 5 {
        match bytes[4] {
            b'q' => Some(Piece::Queen),
            b'r' => Some(Piece::Rook),
            b'b' => Some(Piece::Bishop),
            b'n' => Some(Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mv = ChessMove::new(src, dst, promo);
    if board.legal(mv) {
        Some(mv)
    } else {
        None
    }
}

fn parse_setoption(tokens: &[&str], config: &mut EngineConfig, ctx: &mut SearchContext) {
    let name_idx = tokens.iter().position(|&t| t == "name");
    let value_idx = tokens.iter().position(|&t| t == "value");

    if let (Some(ni), Some(vi)) = (name_idx, value_idx) {
        let name: String = tokens[ni + 1..vi].join(" ");
        let value: String = tokens[vi + 1..].join(" ");

        if name.eq_ignore_ascii_case("hash") {
            match value.parse::<usize>() {
                Ok(mb) => {
                    config.hash_mb = mb.clamp(1, 4096);
                    ctx.resize_tt(config.hash_mb);
                }
                Err(_) => eprintln!("info string setoption Hash: invalid value {}", value),
            }
        } else {
            eprintln!("info string unrecognized option: {}", name);
        }
    }
}
