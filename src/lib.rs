// Analysis board core: position timeline, UCI engine link, evaluation cache
pub mod error;
pub mod board;
pub mod san;
pub mod pgn;
pub mod history;
pub mod score;
pub mod uci;
pub mod engine;
pub mod cache;
pub mod timing;
pub mod config;
pub mod session;
pub mod openings;
pub mod games;

pub use board::{Position, Status};
pub use cache::{CacheEntry, CacheKey, EvalCache};
pub use config::AnalysisConfig;
pub use engine::{EngineIo, EngineProcess, ScriptedEngine};
pub use error::{AnalysisError, Result};
pub use history::{MoveHistory, MoveOutcome};
pub use score::{CandidateLine, Score};
pub use session::{AnalysisSession, AnalysisView, SessionEvent, SessionSettings, ViewSource};
