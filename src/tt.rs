use crate::board::ChessMove;

use crate::types::Score;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound, // beta cutoff occurred (score >= beta); named TT_BETA in some sources
    UpperBound, // no move raised alpha (score <= alpha); named TT_ALPHA in some sources
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub key: u64, // zobrist hash; 0 marks an unused slot
    pub depth: u8,
    pub score: Score,
    pub flag: TTFlag,
    pub best_move: Option<ChessMove>,
}

impl Default for TTEntry {
    fn default() -> Self {
        Self {
            key: 0,
            depth: 0,
            score: 0,
            flag: TTFlag::Exact,
            best_move: None,
        }
    }
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    mask: usize, // entries.len() - 1; fixed for the life of this table
}

impl TranspositionTable {
    /// Build a table sized to the nearest power of two of entries that fit in `mb` megabytes.
    pub fn new(mb: usize) -> Self {
        let entry_size = std::mem::size_of::<TTEntry>();
        let num_entries = (mb * 1024 * 1024) / entry_size;
        let size = num_entries.next_power_of_two() / 2;
        let size = size.max(1024);

        Self {
            entries: vec![TTEntry::default(); size],
            mask: size - 1,
        }
    }

    /// Probe for `key`; collisions are not chained, so a mismatched key is a miss.
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        let entry = &self.entries[key as usize & self.mask];
        if entry.key == key { Some(entry) } else { None }
    }

    /// Depth-preferred replacement with always-replace on an exact key match.
    pub fn store(&mut self, key: u64, depth: u8, score: Score, flag: TTFlag, best_move: Option<ChessMove>) {
        let idx = key as usize & self.mask;
        let entry = &self.entries[idx];

        let should_replace = entry.key == 0 || entry.depth <= depth || entry.key == key;
        if !should_replace {
            return;
        }

        self.entries[idx] = TTEntry {
            key,
            depth,
            score,
            flag,
            best_move,
        };
    }

    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = TTEntry::default();
        }
    }
}

/// Interprets a probed entry against the caller's window: `EXACT` always resolves to the stored
/// score; `LOWER`/`UPPER` only resolve when the stored bound already proves a cutoff against the
/// current `alpha`/`beta`, and then resolve to `beta`/`alpha` themselves (fail-hard, §4.5 step 4) —
/// not to the stored score, which was only ever a bound under whatever window produced it and may
/// lie outside the caller's current, possibly narrower, window.
pub fn usable_score(entry: &TTEntry, alpha: Score, beta: Score) -> Option<Score> {
    match entry.flag {
        TTFlag::Exact => Some(entry.score),
        TTFlag::LowerBound if entry.score >= beta => Some(beta),
        TTFlag::UpperBound if entry.score <= alpha => Some(alpha),
        _ => None,
    }
}


// Replacement is depth-preferred (`entry.depth <= depth`), which can thrash between two equally
// deep positions that hash to the same slot -- faithful to how this policy is specified, not
// "fixed" with generation aging.
