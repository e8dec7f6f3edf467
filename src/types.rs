use crate::board::ChessMove;

pub type Score = i32;

pub const INF: Score = 32_000;
pub const MATE_VALUE: Score = 30_000;
pub const DRAW_VALUE: Score = 0;

pub const DEFAULT_DEPTH: u8 = 10;
pub const DEFAULT_MOVETIME_MS: u64 = 5000;
pub const DEFAULT_HASH_MB: usize = 16;

pub struct EngineConfig {
    pub hash_mb: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
        }
    }
}

pub struct SearchResult {
    pub best_move: Option<ChessMove>,
    pub score: Score,
    pub depth: u8,
    pub nodes: u64,
}
