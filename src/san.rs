use cozy_chess::{Board, Move, Piece};
use crate::board::cozy::is_castle;
use crate::error::{AnalysisError, Result};

fn piece_letter(p: Piece) -> Option<char> {
    match p {
        Piece::Knight => Some('N'),
        Piece::Bishop => Some('B'),
        Piece::Rook => Some('R'),
        Piece::Queen => Some('Q'),
        Piece::King => Some('K'),
        Piece::Pawn => None,
    }
}

fn is_capture_move(board: &Board, mv: Move) -> bool {
    let stm = board.side_to_move();
    if let Some(col) = board.color_on(mv.to) { return col != stm; }
    // En passant: diagonal pawn move onto an empty square
    board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file()
}

/// SAN for a legal move, including the check/mate suffix.
pub fn san_for_move(board: &Board, mv: Move) -> String {
    let moving_piece = board.piece_on(mv.from);

    let mut san = if is_castle(board, mv) {
        if mv.to.file() > mv.from.file() { "O-O".to_string() } else { "O-O-O".to_string() }
    } else {
        let capture = is_capture_move(board, mv);
        let mut s = String::new();
        match moving_piece.and_then(piece_letter) {
            Some(letter) => {
                s.push(letter);
                // Minimal disambiguation among same-type moves to the same square
                let mut others = Vec::new();
                board.generate_moves(|ml| {
                    for m in ml {
                        if m != mv && m.to == mv.to && board.piece_on(m.from) == moving_piece && !is_castle(board, m) {
                            others.push(m.from);
                        }
                    }
                    false
                });
                if !others.is_empty() {
                    let same_file = others.iter().any(|sq| sq.file() == mv.from.file());
                    let same_rank = others.iter().any(|sq| sq.rank() == mv.from.rank());
                    let from = format!("{}", mv.from);
                    if !same_file { s.push_str(&from[..1]); }
                    else if !same_rank { s.push_str(&from[1..]); }
                    else { s.push_str(&from); }
                }
            }
            None => {
                if capture { s.push_str(&format!("{}", mv.from)[..1]); }
            }
        }
        if capture { s.push('x'); }
        s.push_str(&format!("{}", mv.to));
        if let Some(promo) = mv.promotion {
            s.push('=');
            s.push(piece_letter(promo).unwrap_or('Q'));
        }
        s
    };

    let mut next = board.clone();
    next.play_unchecked(mv);
    if !next.checkers().is_empty() {
        let mut has_reply = false;
        next.generate_moves(|_| { has_reply = true; true });
        san.push(if has_reply { '+' } else { '#' });
    }
    san
}

/// Strips annotations so SAN from PGN files compares equal to generated SAN.
fn strip_san(text: &str) -> String {
    let t = text.trim().trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'));
    let t = t.replace("0-0-0", "O-O-O").replace("0-0", "O-O");
    // Some writers omit the '=' before the promotion piece (e8Q)
    let bytes = t.as_bytes();
    if bytes.len() >= 3 {
        let last = bytes[bytes.len() - 1] as char;
        let prev = bytes[bytes.len() - 2] as char;
        if "QRBN".contains(last) && prev.is_ascii_digit() {
            return format!("{}={}", &t[..t.len() - 1], last);
        }
    }
    t
}

/// Resolves SAN text against the legal moves of `board`.
pub fn parse_san(board: &Board, text: &str) -> Result<Move> {
    let wanted = strip_san(text);
    if wanted.is_empty() { return Err(AnalysisError::San(text.to_string())); }
    let mut matches = Vec::new();
    board.generate_moves(|ml| {
        for m in ml {
            if strip_san(&san_for_move(board, m)) == wanted { matches.push(m); }
        }
        false
    });
    match matches.len() {
        1 => Ok(matches[0]),
        0 => Err(AnalysisError::San(text.to_string())),
        _ => Err(AnalysisError::AmbiguousSan(text.to_string())),
    }
}

/// Renders a UCI move sequence as SAN from `board`, stopping at the first move
/// that does not apply.
pub fn line_to_san(board: &Board, uci_moves: &[String]) -> Vec<String> {
    let mut pos = crate::board::Position::from_board(board.clone());
    let mut out = Vec::with_capacity(uci_moves.len());
    for u in uci_moves {
        let before = pos.board().clone();
        let Ok(mv) = pos.play_uci(u) else { break };
        out.push(san_for_move(&before, mv));
    }
    out
}
