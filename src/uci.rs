use std::fmt;
use crate::error::UciError;
use crate::score::Score;

/// Lines sent from the analysis board to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption { name: String, value: Option<String> },
    /// `position fen <fen> [moves ...]`; `None` means `startpos`.
    Position { fen: Option<String>, moves: Vec<String> },
    Go(GoParams),
    Stop,
    Quit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GoParams {
    pub depth: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub infinite: bool,
}

impl GoParams {
    pub fn depth(d: u32) -> Self { Self { depth: Some(d), ..Self::default() } }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Uci => write!(f, "uci"),
            EngineCommand::IsReady => write!(f, "isready"),
            EngineCommand::UciNewGame => write!(f, "ucinewgame"),
            EngineCommand::SetOption { name, value: Some(v) } => write!(f, "setoption name {} value {}", name, v),
            EngineCommand::SetOption { name, value: None } => write!(f, "setoption name {}", name),
            EngineCommand::Position { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => write!(f, "position startpos")?,
                }
                if !moves.is_empty() { write!(f, " moves {}", moves.join(" "))?; }
                Ok(())
            }
            EngineCommand::Go(p) => {
                write!(f, "go")?;
                if p.infinite { return write!(f, " infinite"); }
                if let Some(d) = p.depth { write!(f, " depth {}", d)?; }
                if let Some(t) = p.movetime_ms { write!(f, " movetime {}", t)?; }
                Ok(())
            }
            EngineCommand::Stop => write!(f, "stop"),
            EngineCommand::Quit => write!(f, "quit"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

/// Payload of an `info` line. Fields the engine did not send stay `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub bound: Bound,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time_ms: Option<u64>,
    pub hashfull: Option<u32>,
    pub currmove: Option<String>,
    pub pv: Vec<String>,
    pub string: Option<String>,
}

impl Default for InfoLine {
    fn default() -> Self {
        Self {
            depth: None, seldepth: None, multipv: None, score: None, bound: Bound::Exact,
            nodes: None, nps: None, time_ms: None, hashfull: None, currmove: None,
            pv: Vec::new(), string: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionInfo {
    pub name: String,
    pub kind: String,
    pub default: Option<String>,
}

/// Lines received from the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMessage {
    IdName(String),
    IdAuthor(String),
    Option(OptionInfo),
    UciOk,
    ReadyOk,
    Info(InfoLine),
    /// `None` when the engine has no move (`(none)` or `0000`).
    BestMove { mv: Option<String>, ponder: Option<String> },
    Unknown(String),
}

fn parse_num<T: std::str::FromStr>(key: &'static str, tok: Option<&str>) -> Result<T, UciError> {
    let v = tok.ok_or(UciError::MissingValue(key))?;
    v.parse::<T>().map_err(|_| UciError::BadNumber { key, value: v.to_string() })
}

pub fn parse_info(args: &str) -> Result<InfoLine, UciError> {
    let mut info = InfoLine::default();
    let mut tokens = args.split_whitespace().peekable();
    while let Some(tok) = tokens.next() {
        match tok {
            "depth" => info.depth = Some(parse_num("depth", tokens.next())?),
            "seldepth" => info.seldepth = Some(parse_num("seldepth", tokens.next())?),
            "multipv" => info.multipv = Some(parse_num("multipv", tokens.next())?),
            "nodes" => info.nodes = Some(parse_num("nodes", tokens.next())?),
            "nps" => info.nps = Some(parse_num("nps", tokens.next())?),
            "time" => info.time_ms = Some(parse_num("time", tokens.next())?),
            "hashfull" => info.hashfull = Some(parse_num("hashfull", tokens.next())?),
            "currmove" => info.currmove = Some(tokens.next().ok_or(UciError::MissingValue("currmove"))?.to_string()),
            "score" => {
                let kind = tokens.next().ok_or(UciError::MissingValue("score"))?;
                info.score = Some(match kind {
                    "cp" => Score::Centipawns(parse_num("cp", tokens.next())?),
                    "mate" => Score::Mate(parse_num("mate", tokens.next())?),
                    other => return Err(UciError::BadScore(other.to_string())),
                });
                match tokens.peek() {
                    Some(&"lowerbound") => { info.bound = Bound::Lower; tokens.next(); }
                    Some(&"upperbound") => { info.bound = Bound::Upper; tokens.next(); }
                    _ => {}
                }
            }
            "pv" => { info.pv = tokens.by_ref().map(|s| s.to_string()).collect(); }
            "string" => { info.string = Some(tokens.by_ref().collect::<Vec<_>>().join(" ")); }
            // Keys with one value we do not track
            "currmovenumber" | "tbhits" | "cpuload" | "sbhits" => { tokens.next(); }
            _ => {}
        }
    }
    Ok(info)
}

fn parse_option(args: &str) -> OptionInfo {
    // option name <words...> type <kind> [default <words...>] [min ..] [max ..] [var ..]
    let mut name = Vec::new();
    let mut kind = String::new();
    let mut default: Option<Vec<&str>> = None;
    let mut section = "";
    for tok in args.split_whitespace() {
        // Option names may contain spaces; only `type` ends the name
        if section == "name" {
            if tok == "type" { section = "type"; } else { name.push(tok); }
            continue;
        }
        if matches!(tok, "name" | "type" | "default" | "min" | "max" | "var") {
            section = tok;
            if tok == "default" { default = Some(Vec::new()); }
            continue;
        }
        match section {
            "type" => kind = tok.to_string(),
            "default" => if let Some(d) = default.as_mut() { d.push(tok) },
            _ => {}
        }
    }
    OptionInfo { name: name.join(" "), kind, default: default.map(|d| d.join(" ")) }
}

impl EngineMessage {
    pub fn parse(line: &str) -> Result<EngineMessage, UciError> {
        let line = line.trim();
        if line.is_empty() { return Err(UciError::Empty); }
        if line == "uciok" { return Ok(EngineMessage::UciOk); }
        if line == "readyok" { return Ok(EngineMessage::ReadyOk); }
        if let Some(rest) = line.strip_prefix("info ") { return parse_info(rest).map(EngineMessage::Info); }
        if line == "info" { return Ok(EngineMessage::Info(InfoLine::default())); }
        if line == "bestmove" { return Ok(EngineMessage::BestMove { mv: None, ponder: None }); }
        if let Some(rest) = line.strip_prefix("bestmove ") {
            let mut tokens = rest.split_whitespace();
            let mv = tokens.next().filter(|m| *m != "(none)" && *m != "0000").map(|s| s.to_string());
            let ponder = match tokens.next() {
                Some("ponder") => tokens.next().map(|s| s.to_string()),
                _ => None,
            };
            return Ok(EngineMessage::BestMove { mv, ponder });
        }
        if let Some(rest) = line.strip_prefix("id name ") { return Ok(EngineMessage::IdName(rest.trim().to_string())); }
        if let Some(rest) = line.strip_prefix("id author ") { return Ok(EngineMessage::IdAuthor(rest.trim().to_string())); }
        if let Some(rest) = line.strip_prefix("option ") { return Ok(EngineMessage::Option(parse_option(rest))); }
        Ok(EngineMessage::Unknown(line.to_string()))
    }
}
