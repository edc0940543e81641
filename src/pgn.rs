//! PGN helpers: tag pairs, movetext tokens, bulk splitting and export.

use crate::error::{AnalysisError, Result};

pub type Headers = Vec<(String, String)>;

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

fn parse_header_line(line: &str) -> Option<(String, String)> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let (tag, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((tag.to_string(), value.replace("\\\"", "\"").replace("\\\\", "\\")))
}

/// Tag pairs in file order.
pub fn parse_headers(pgn: &str) -> Headers {
    pgn.lines()
        .skip_while(|l| l.trim().is_empty())
        .take_while(|l| l.trim_start().starts_with('['))
        .filter_map(parse_header_line)
        .collect()
}

pub fn header<'a>(headers: &'a Headers, tag: &str) -> Option<&'a str> {
    headers.iter().find(|(k, _)| k == tag).map(|(_, v)| v.as_str())
}

pub fn header_eco(pgn: &str) -> Option<String> {
    header(&parse_headers(pgn), "ECO").map(|s| s.to_string())
}

pub fn header_opening(pgn: &str) -> Option<String> {
    header(&parse_headers(pgn), "Opening").map(|s| s.to_string())
}

/// Everything after the tag section. Lines inside the movetext that start with
/// `[` (wrapped `[%clk ...]` comments) are kept.
fn movetext(pgn: &str) -> String {
    pgn.lines()
        .skip_while(|l| l.trim().is_empty() || l.trim_start().starts_with('['))
        .filter(|l| !l.starts_with('%'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mainline SAN tokens. Comments, variations, NAGs, move numbers and the
/// result token are dropped.
pub fn movetext_tokens(pgn: &str) -> Result<Vec<String>> {
    let text = movetext(pgn);
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut chars = text.chars();
    let flush = |cur: &mut String, out: &mut Vec<String>| {
        if cur.is_empty() { return; }
        let raw = std::mem::take(cur);
        if raw.starts_with('$') || RESULTS.contains(&raw.as_str()) { return; }
        if raw.starts_with("0-0") { out.push(raw); return; }
        // "12." / "12..." prefixes may be glued to the move: "12.e4"
        let rest = raw.trim_start_matches(|c: char| c.is_ascii_digit());
        let tok = if rest.len() < raw.len() { rest.trim_start_matches('.') } else { rest };
        if !tok.is_empty() { out.push(tok.to_string()); }
    };
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                flush(&mut cur, &mut out);
                let mut closed = false;
                for c2 in chars.by_ref() { if c2 == '}' { closed = true; break; } }
                if !closed { return Err(AnalysisError::Pgn("unterminated comment".into())); }
            }
            ';' => {
                flush(&mut cur, &mut out);
                for c2 in chars.by_ref() { if c2 == '\n' { break; } }
            }
            '(' => { flush(&mut cur, &mut out); depth += 1; }
            ')' => {
                flush(&mut cur, &mut out);
                if depth == 0 { return Err(AnalysisError::Pgn("unbalanced `)`".into())); }
                depth -= 1;
            }
            c if c.is_whitespace() => flush(&mut cur, &mut out),
            c => if depth == 0 { cur.push(c) },
        }
    }
    flush(&mut cur, &mut out);
    if depth != 0 { return Err(AnalysisError::Pgn("unterminated variation".into())); }
    Ok(out)
}

/// Result token at the end of the movetext, if any.
pub fn movetext_result(pgn: &str) -> Option<String> {
    movetext(pgn).split_whitespace().last().filter(|t| RESULTS.contains(t)).map(|s| s.to_string())
}

/// Splits a bulk PGN into single games at blank lines followed by a new `[Event "` tag.
pub fn split_games(blob: &str) -> Vec<String> {
    let text = blob.replace("\r\n", "\n").replace('\r', "\n");
    let mut games = Vec::new();
    let mut cur: Vec<&str> = Vec::new();
    let mut blank_run = 0usize;
    for line in text.trim().lines() {
        if line.trim().is_empty() { blank_run += 1; cur.push(line); continue; }
        if blank_run >= 1 && line.starts_with("[Event \"") && !cur.is_empty() {
            let g = cur.join("\n").trim().to_string();
            if !g.is_empty() { games.push(g); }
            cur.clear();
        }
        blank_run = 0;
        cur.push(line);
    }
    let g = cur.join("\n").trim().to_string();
    if !g.is_empty() { games.push(g); }
    games
}

/// Writes tags and numbered movetext. `first_move_number` and `black_first`
/// describe the root position.
pub fn write_pgn(headers: &Headers, sans: &[String], first_move_number: u16, black_first: bool, result: &str) -> String {
    let mut s = String::new();
    for (k, v) in headers {
        s.push_str(&format!("[{} \"{}\"]\n", k, v.replace('\\', "\\\\").replace('"', "\\\"")));
    }
    if !headers.is_empty() { s.push('\n'); }
    let mut body: Vec<String> = Vec::with_capacity(sans.len() * 2);
    let mut number = first_move_number;
    let mut white_to_move = !black_first;
    for (i, san) in sans.iter().enumerate() {
        if white_to_move {
            body.push(format!("{}.", number));
        } else if i == 0 {
            body.push(format!("{}...", number));
        }
        body.push(san.clone());
        if !white_to_move { number += 1; }
        white_to_move = !white_to_move;
    }
    body.push(result.to_string());
    // Wrap movetext at 80 columns
    let mut line_len = 0usize;
    for (i, tok) in body.iter().enumerate() {
        if i > 0 {
            if line_len + 1 + tok.len() > 80 { s.push('\n'); line_len = 0; } else { s.push(' '); line_len += 1; }
        }
        s.push_str(tok);
        line_len += tok.len();
    }
    s.push('\n');
    s
}
