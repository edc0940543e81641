//! Position timeline: every position reached, the moves between them, and a
//! cursor for scrubbing.
//!
//! `positions[0]` is the root and `moves[i]` leads from `positions[i]` to
//! `positions[i + 1]`, so `positions.len() == moves.len() + 1` always holds.

use serde::{Deserialize, Serialize};
use crate::board::Position;
use crate::error::{AnalysisError, Result};
use crate::pgn::{self, Headers};
use crate::san::{parse_san, san_for_move};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMove {
    pub uci: String,
    pub san: String,
}

/// What a user move did to the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Appended,
    /// The move matched the next recorded one; only the cursor moved.
    Followed,
    /// Moves after the cursor were dropped before appending.
    Branched { dropped: usize },
}

#[derive(Clone, Debug)]
pub struct MoveHistory {
    positions: Vec<String>,
    moves: Vec<HistoryMove>,
    cursor: usize,
}

impl Default for MoveHistory {
    fn default() -> Self { Self::new(&Position::startpos()) }
}

impl MoveHistory {
    pub fn new(root: &Position) -> Self {
        Self { positions: vec![root.fen()], moves: Vec::new(), cursor: 0 }
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        Ok(Self::new(&Position::from_fen(fen)?))
    }

    /// Replaces the timeline with `fen` as the new root.
    pub fn reset(&mut self, fen: &str) -> Result<()> {
        *self = Self::from_fen(fen)?;
        Ok(())
    }

    pub fn cursor(&self) -> usize { self.cursor }

    /// Number of positions, root included; never zero.
    pub fn position_count(&self) -> usize { self.positions.len() }

    pub fn has_moves(&self) -> bool { !self.moves.is_empty() }

    pub fn moves(&self) -> &[HistoryMove] { &self.moves }

    pub fn positions(&self) -> &[String] { &self.positions }

    pub fn fen_at(&self, index: usize) -> Option<&str> { self.positions.get(index).map(|s| s.as_str()) }

    pub fn current_fen(&self) -> &str { &self.positions[self.cursor] }

    pub fn current_position(&self) -> Result<Position> { Position::from_fen(self.current_fen()) }

    pub fn root_position(&self) -> Result<Position> { Position::from_fen(&self.positions[0]) }

    /// The move that led to the cursor position.
    pub fn last_move(&self) -> Option<&HistoryMove> {
        if self.cursor == 0 { None } else { self.moves.get(self.cursor - 1) }
    }

    pub fn at_end(&self) -> bool { self.cursor + 1 == self.positions.len() }

    /// Plays a move given as UCI text at the cursor.
    pub fn push_uci(&mut self, uci: &str) -> Result<MoveOutcome> {
        let pos = self.current_position()?;
        let mv = pos.parse_uci(uci)?;
        self.push(&pos, mv)
    }

    /// Plays a move given as SAN text at the cursor.
    pub fn push_san(&mut self, san: &str) -> Result<MoveOutcome> {
        let pos = self.current_position()?;
        let mv = parse_san(pos.board(), san)?;
        self.push(&pos, mv)
    }

    /// Accepts either notation; UCI is tried first.
    pub fn push_text(&mut self, text: &str) -> Result<MoveOutcome> {
        let pos = self.current_position()?;
        let mv = match pos.parse_uci(text) {
            Ok(mv) => mv,
            Err(_) => parse_san(pos.board(), text)?,
        };
        self.push(&pos, mv)
    }

    fn push(&mut self, pos: &Position, mv: cozy_chess::Move) -> Result<MoveOutcome> {
        let record = HistoryMove { uci: pos.move_to_uci(mv), san: san_for_move(pos.board(), mv) };
        if let Some(next) = self.moves.get(self.cursor) {
            if next.uci == record.uci {
                self.cursor += 1;
                return Ok(MoveOutcome::Followed);
            }
        }
        let next_fen = pos.after(mv)?.fen();
        let dropped = self.moves.len() - self.cursor;
        self.moves.truncate(self.cursor);
        self.positions.truncate(self.cursor + 1);
        self.moves.push(record);
        self.positions.push(next_fen);
        self.cursor += 1;
        Ok(if dropped == 0 { MoveOutcome::Appended } else { MoveOutcome::Branched { dropped } })
    }

    pub fn go_to(&mut self, index: usize) -> Result<()> {
        if index >= self.positions.len() {
            return Err(AnalysisError::HistoryRange { index, len: self.positions.len() });
        }
        self.cursor = index;
        Ok(())
    }

    /// Returns false when already at the root.
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 { return false; }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.at_end() { return false; }
        self.cursor += 1;
        true
    }

    pub fn first(&mut self) { self.cursor = 0; }

    pub fn last(&mut self) { self.cursor = self.positions.len() - 1; }

    /// Imports the mainline of a single PGN game; the cursor ends on the final position.
    pub fn from_pgn(text: &str) -> Result<Self> {
        let headers = pgn::parse_headers(text);
        let root = match (pgn::header(&headers, "SetUp"), pgn::header(&headers, "FEN")) {
            (Some("1"), Some(fen)) => Position::from_fen(fen)?,
            _ => Position::startpos(),
        };
        let mut history = Self::new(&root);
        for (i, tok) in pgn::movetext_tokens(text)?.iter().enumerate() {
            history.push_san(tok).map_err(|e| AnalysisError::Pgn(format!("ply {}: {}", i + 1, e)))?;
        }
        Ok(history)
    }

    pub fn to_pgn(&self, headers: &Headers, result: &str) -> Result<String> {
        let root = self.root_position()?;
        let mut headers = headers.clone();
        if root.fen() != Position::startpos().fen() && pgn::header(&headers, "FEN").is_none() {
            headers.push(("SetUp".to_string(), "1".to_string()));
            headers.push(("FEN".to_string(), root.fen()));
        }
        let sans: Vec<String> = self.moves.iter().map(|m| m.san.clone()).collect();
        let black_first = root.side_to_move() == cozy_chess::Color::Black;
        Ok(pgn::write_pgn(&headers, &sans, root.fullmove_number(), black_first, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(moves: &[&str]) -> MoveHistory {
        let mut h = MoveHistory::default();
        for m in moves { h.push_uci(m).unwrap(); }
        h
    }

    #[test]
    fn positions_track_moves() {
        let h = line(&["e2e4", "e7e5", "g1f3"]);
        assert_eq!(h.position_count(), 4);
        assert_eq!(h.cursor(), 3);
        assert_eq!(h.moves()[2].san, "Nf3");
        assert_eq!(h.last_move().map(|m| m.uci.as_str()), Some("g1f3"));
    }

    #[test]
    fn branching_truncates() {
        let mut h = line(&["e2e4", "e7e5", "g1f3", "b8c6"]);
        h.go_to(2).unwrap();
        let out = h.push_uci("f2f4").unwrap();
        assert_eq!(out, MoveOutcome::Branched { dropped: 2 });
        assert_eq!(h.position_count(), 4);
        assert!(h.at_end());
        assert_eq!(h.moves()[2].san, "f4");
    }

    #[test]
    fn replaying_recorded_move_keeps_line() {
        let mut h = line(&["e2e4", "e7e5", "g1f3"]);
        h.first();
        assert_eq!(h.push_san("e4").unwrap(), MoveOutcome::Followed);
        assert_eq!(h.position_count(), 4);
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn navigation_bounds() {
        let mut h = line(&["d2d4"]);
        assert!(!h.forward());
        assert!(h.back());
        assert!(!h.back());
        assert!(h.go_to(5).is_err());
        assert_eq!(h.cursor(), 0);
        h.last();
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn illegal_move_leaves_history_untouched() {
        let mut h = line(&["e2e4"]);
        assert!(h.push_uci("e2e4").is_err());
        assert_eq!(h.position_count(), 2);
    }

    #[test]
    fn pgn_with_setup_roundtrips_root() {
        let text = "[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/4P3/4K3 b - - 0 12\"]\n\n12... Kd7 13. e4 *";
        let h = MoveHistory::from_pgn(text).unwrap();
        assert_eq!(h.position_count(), 3);
        let out = h.to_pgn(&Vec::new(), "*").unwrap();
        assert!(out.contains("12... Kd7 13. e4 *"), "{out}");
        assert!(out.contains("[FEN \"4k3/8/8/8/8/8/4P3/4K3 b - - 0 12\"]"));
    }

    #[test]
    fn fen_tag_without_setup_is_ignored() {
        let text = "[FEN \"4k3/8/8/8/8/8/4P3/4K3 b - - 0 12\"]\n\n1. e4 *";
        let h = MoveHistory::from_pgn(text).unwrap();
        assert_eq!(h.fen_at(0), Some(Position::startpos().fen().as_str()));
        assert!(h.has_moves());
        assert_eq!(h.position_count(), 2);
    }
}
