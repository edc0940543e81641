use cozy_chess::{Board as CozyBoard, Color, File, Move, Piece, Square};
use crate::error::{AnalysisError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ongoing,
    /// The side to move has been mated.
    Checkmate,
    Stalemate,
    FiftyMoves,
    InsufficientMaterial,
}

impl Status {
    pub fn is_over(self) -> bool { self != Status::Ongoing }
}

#[derive(Clone, Debug)]
pub struct Position {
    board: CozyBoard,
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool { self.fen() == other.fen() }
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default() }
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        let fen = normalize_fen(fen);
        CozyBoard::from_fen(&fen, false)
            .map(|b| Self { board: b })
            .map_err(|e| AnalysisError::Fen(format!("{e:?} in `{fen}`")))
    }

    pub fn from_board(board: CozyBoard) -> Self { Self { board } }

    pub fn board(&self) -> &CozyBoard { &self.board }

    /// Canonical FEN; used as the cache key for the position.
    pub fn fen(&self) -> String { format!("{}", self.board) }

    pub fn side_to_move(&self) -> Color { self.board.side_to_move() }

    pub fn fullmove_number(&self) -> u16 { self.board.fullmove_number() }

    pub fn in_check(&self) -> bool { !self.board.checkers().is_empty() }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut v = Vec::new();
        self.board.generate_moves(|ml| { v.extend(ml); false });
        v
    }

    pub fn legal_moves_count(&self) -> usize {
        let mut ct = 0usize;
        self.board.generate_moves(|moves| { ct += moves.len(); false });
        ct
    }

    /// Standard UCI text for a legal move. Castling is written as the king's
    /// two-square step (`e1g1`), not the library's king-takes-rook form.
    pub fn move_to_uci(&self, mv: Move) -> String {
        if is_castle(&self.board, mv) {
            let file = if mv.to.file() > mv.from.file() { File::G } else { File::C };
            let to = Square::new(file, mv.from.rank());
            return format!("{}{}", mv.from, to);
        }
        format!("{}", mv)
    }

    /// Resolves UCI text against the legal moves; both castling encodings are accepted.
    pub fn parse_uci(&self, uci: &str) -> Result<Move> {
        let uci = uci.trim();
        let mut found = None;
        self.board.generate_moves(|moves| {
            for m in moves {
                if format!("{}", m) == uci || self.move_to_uci(m) == uci { found = Some(m); break; }
            }
            found.is_some()
        });
        found.ok_or_else(|| AnalysisError::IllegalMove { mv: uci.to_string(), fen: self.fen() })
    }

    pub fn play(&mut self, mv: Move) -> Result<()> {
        self.board.try_play(mv).map_err(|_| AnalysisError::IllegalMove { mv: format!("{}", mv), fen: self.fen() })
    }

    /// Parses and plays `uci`; the position is unchanged on error.
    pub fn play_uci(&mut self, uci: &str) -> Result<Move> {
        let mv = self.parse_uci(uci)?;
        self.board.play_unchecked(mv);
        Ok(mv)
    }

    pub fn after(&self, mv: Move) -> Result<Self> {
        let mut next = self.clone();
        next.play(mv)?;
        Ok(next)
    }

    pub fn status(&self) -> Status {
        let has_move = self.legal_moves_count() > 0;
        if !has_move {
            return if self.in_check() { Status::Checkmate } else { Status::Stalemate };
        }
        if self.board.halfmove_clock() >= 100 { return Status::FiftyMoves; }
        if insufficient_material(&self.board) { return Status::InsufficientMaterial; }
        Status::Ongoing
    }
}

pub(crate) fn is_castle(board: &CozyBoard, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King) && board.color_on(mv.to) == Some(board.side_to_move())
}

fn insufficient_material(board: &CozyBoard) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() { return false; }
    let minors = board.pieces(Piece::Knight) | board.pieces(Piece::Bishop);
    minors.len() <= 1
}

/// EPD-style strings (4 fields) get halfmove/fullmove counters appended.
fn normalize_fen(fen: &str) -> String {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    match parts.len() {
        4 => format!("{} 0 1", parts.join(" ")),
        5 => format!("{} 1", parts.join(" ")),
        _ => parts.join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn castling_uses_standard_uci() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = pos.parse_uci("e1g1").expect("short castle legal");
        assert_eq!(pos.move_to_uci(mv), "e1g1");
        let long = pos.parse_uci("e1a1").expect("library form accepted");
        assert_eq!(pos.move_to_uci(long), "e1c1");
    }

    #[test]
    fn epd_gets_counters() {
        let pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").unwrap();
        assert_eq!(pos.fen(), Position::startpos().fen());
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut pos = Position::startpos();
        for m in ["f2f3", "e7e5", "g2g4", "d8h4"] { pos.play_uci(m).unwrap(); }
        assert_eq!(pos.status(), Status::Checkmate);
    }

    #[test]
    fn bare_kings_are_drawn() {
        let pos = Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(pos.status(), Status::InsufficientMaterial);
    }
}
