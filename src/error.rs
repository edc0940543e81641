use thiserror::Error;

/// Protocol-level failures while decoding engine output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UciError {
    #[error("empty line")]
    Empty,
    #[error("missing value after `{0}`")]
    MissingValue(&'static str),
    #[error("invalid number `{value}` for `{key}`")]
    BadNumber { key: &'static str, value: String },
    #[error("unknown score kind `{0}`")]
    BadScore(String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("FEN error: {0}")]
    Fen(String),
    #[error("illegal move `{mv}` in {fen}")]
    IllegalMove { mv: String, fen: String },
    #[error("cannot read SAN `{0}`")]
    San(String),
    #[error("ambiguous SAN `{0}`")]
    AmbiguousSan(String),
    #[error("PGN error: {0}")]
    Pgn(String),
    #[error("history index {index} out of range (len {len})")]
    HistoryRange { index: usize, len: usize },
    #[error("UCI parse error: {0}")]
    Uci(#[from] UciError),
    #[error("engine error: {0}")]
    Engine(String),
    #[error("engine disconnected")]
    Disconnected,
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
