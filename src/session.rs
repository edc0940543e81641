//! Keeps engine output in step with a user-editable position timeline.
//!
//! Every `go` sent to the engine gets a search id and waits in `in_flight`
//! until its `bestmove` arrives. UCI answers each `go` with exactly one
//! `bestmove`, in order, so `info` lines always belong to the oldest search in
//! the queue. Lines from a search that was stopped, or that was started for a
//! different (position, depth, lines) key than the one on screen, are stale.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use log::{debug, info, warn};
use crate::board::{Position, Status};
use crate::cache::{CacheEntry, CacheKey, EvalCache};
use crate::config::AnalysisConfig;
use crate::engine::EngineIo;
use crate::error::{AnalysisError, Result};
use crate::history::{MoveHistory, MoveOutcome};
use crate::san::line_to_san;
use crate::score::{CandidateLine, Score};
use crate::timing::Debouncer;
use crate::uci::{Bound, EngineCommand, EngineMessage, GoParams, InfoLine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub depth: u32,
    pub lines: u32,
    pub debounce: Duration,
    pub min_restart: Duration,
    /// Extra `setoption` pairs sent during the handshake (Threads, Hash, ...).
    pub options: Vec<(String, String)>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            depth: 18,
            lines: 3,
            debounce: Duration::from_millis(150),
            min_restart: Duration::from_millis(250),
            options: Vec::new(),
        }
    }
}

impl From<&AnalysisConfig> for SessionSettings {
    fn from(c: &AnalysisConfig) -> Self {
        Self {
            depth: c.depth,
            lines: c.lines,
            debounce: Duration::from_millis(c.debounce_ms),
            min_restart: Duration::from_millis(c.min_restart_ms),
            options: c.engine_options.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handshake {
    NotStarted,
    AwaitUciOk,
    AwaitReadyOk,
    Ready,
}

/// Where the lines on screen came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewSource {
    /// Nothing yet; a search is scheduled or running.
    Pending,
    Live,
    Cache,
    /// The position has no moves to analyse.
    Terminal(Status),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    EngineReady { name: Option<String> },
    CacheReplayed { fen: String },
    SearchStarted { id: u64, fen: String },
    ViewUpdated { rank: u32, depth: u32 },
    SearchFinished { fen: String, stored: bool },
    Stale { id: u64 },
    GameOver(Status),
}

#[derive(Clone, Debug)]
struct Search {
    id: u64,
    key: CacheKey,
    stopped: bool,
    stored: bool,
}

/// Snapshot for the front end.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisView {
    pub fen: String,
    pub cursor: usize,
    pub source: ViewSource,
    pub searching: bool,
    /// Ranked lines, scores relative to the side to move.
    pub lines: Vec<CandidateLine>,
    pub side_to_move: cozy_chess::Color,
}

impl AnalysisView {
    pub fn best(&self) -> Option<&CandidateLine> { self.lines.first() }

    /// Lowest depth across the shown lines.
    pub fn depth(&self) -> Option<u32> { self.lines.iter().map(|l| l.depth).min() }

    pub fn best_for_white(&self) -> Option<Score> { self.best().map(|l| l.score.for_white(self.side_to_move)) }

    /// Evaluation-bar fill for white.
    pub fn bar_fraction(&self) -> f32 { self.best_for_white().map(|s| s.bar_fraction()).unwrap_or(0.5) }
}

pub struct AnalysisSession<E: EngineIo> {
    engine: E,
    history: MoveHistory,
    cache: EvalCache,
    settings: SessionSettings,
    handshake: Handshake,
    engine_name: Option<String>,
    debouncer: Debouncer,
    in_flight: VecDeque<Search>,
    next_id: u64,
    target: Position,
    lines: BTreeMap<u32, CandidateLine>,
    source: ViewSource,
    /// `setoption`/`ucinewgame` must reach the engine (and be acknowledged) before the next `go`.
    resync: bool,
    new_game: bool,
    go_after_ready: bool,
    stale_dropped: u64,
}

impl<E: EngineIo> AnalysisSession<E> {
    pub fn new(engine: E, settings: SessionSettings) -> Self {
        let debouncer = Debouncer::new(settings.debounce, settings.min_restart);
        Self {
            engine,
            history: MoveHistory::default(),
            cache: EvalCache::new(),
            settings,
            handshake: Handshake::NotStarted,
            engine_name: None,
            debouncer,
            in_flight: VecDeque::new(),
            next_id: 1,
            target: Position::startpos(),
            lines: BTreeMap::new(),
            source: ViewSource::Pending,
            resync: false,
            new_game: false,
            go_after_ready: false,
            stale_dropped: 0,
        }
    }

    pub fn with_cache(mut self, cache: EvalCache) -> Self { self.cache = cache; self }

    pub fn engine(&self) -> &E { &self.engine }

    pub fn engine_mut(&mut self) -> &mut E { &mut self.engine }

    pub fn history(&self) -> &MoveHistory { &self.history }

    pub fn cache(&self) -> &EvalCache { &self.cache }

    pub fn settings(&self) -> &SessionSettings { &self.settings }

    pub fn handshake(&self) -> Handshake { self.handshake }

    pub fn engine_name(&self) -> Option<&str> { self.engine_name.as_deref() }

    pub fn stale_dropped(&self) -> u64 { self.stale_dropped }

    pub fn in_flight(&self) -> usize { self.in_flight.len() }

    pub fn target_key(&self) -> CacheKey {
        CacheKey::new(self.target.fen(), self.settings.depth, self.settings.lines)
    }

    /// Sends `uci`; the rest of the handshake is driven by incoming messages.
    pub fn start(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        self.engine.send(&EngineCommand::Uci)?;
        self.handshake = Handshake::AwaitUciOk;
        self.position_changed(now)
    }

    /// Blocks until the engine has answered `readyok`, processing messages as they come.
    pub fn wait_ready(&mut self, timeout: Duration) -> Result<Vec<SessionEvent>> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while self.handshake != Handshake::Ready {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(AnalysisError::Engine(format!("no readiness reply within {:?}", timeout)));
            }
            if let Some(msg) = self.engine.recv_timeout(left.min(Duration::from_millis(50)))? {
                events.extend(self.handle_message(msg, Instant::now())?);
            }
        }
        Ok(events)
    }

    /// Drains waiting engine output, then runs timers.
    pub fn poll(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        let mut events = Vec::new();
        while let Some(msg) = self.engine.try_recv()? {
            events.extend(self.handle_message(msg, now)?);
        }
        events.extend(self.tick(now)?);
        Ok(events)
    }

    pub fn view(&self) -> AnalysisView {
        AnalysisView {
            fen: self.target.fen(),
            cursor: self.history.cursor(),
            source: self.source,
            searching: self.in_flight.back().map(|s| !s.stopped && s.key == self.target_key()).unwrap_or(false),
            lines: self.lines.values().cloned().collect(),
            side_to_move: self.target.side_to_move(),
        }
    }

    // --- timeline edits ---

    pub fn play(&mut self, text: &str, now: Instant) -> Result<(MoveOutcome, Vec<SessionEvent>)> {
        let outcome = self.history.push_text(text)?;
        Ok((outcome, self.position_changed(now)?))
    }

    pub fn back(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        if !self.history.back() { return Ok(Vec::new()); }
        self.position_changed(now)
    }

    pub fn forward(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        if !self.history.forward() { return Ok(Vec::new()); }
        self.position_changed(now)
    }

    pub fn first(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        self.history.first();
        self.position_changed(now)
    }

    pub fn last(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        self.history.last();
        self.position_changed(now)
    }

    pub fn go_to(&mut self, index: usize, now: Instant) -> Result<Vec<SessionEvent>> {
        self.history.go_to(index)?;
        self.position_changed(now)
    }

    pub fn load_history(&mut self, history: MoveHistory, now: Instant) -> Result<Vec<SessionEvent>> {
        self.history = history;
        self.new_game = true;
        self.position_changed(now)
    }

    pub fn load_pgn(&mut self, text: &str, now: Instant) -> Result<Vec<SessionEvent>> {
        let history = MoveHistory::from_pgn(text)?;
        self.load_history(history, now)
    }

    pub fn set_fen(&mut self, fen: &str, now: Instant) -> Result<Vec<SessionEvent>> {
        let history = MoveHistory::from_fen(fen)?;
        self.load_history(history, now)
    }

    pub fn set_depth(&mut self, depth: u32, now: Instant) -> Result<Vec<SessionEvent>> {
        if depth == 0 { return Err(AnalysisError::Config("depth must be at least 1".into())); }
        if depth == self.settings.depth { return Ok(Vec::new()); }
        self.settings.depth = depth;
        self.position_changed(now)
    }

    pub fn set_lines(&mut self, lines: u32, now: Instant) -> Result<Vec<SessionEvent>> {
        if !(1..=crate::config::MAX_LINES).contains(&lines) {
            return Err(AnalysisError::Config(format!("lines must be within 1..={}", crate::config::MAX_LINES)));
        }
        if lines == self.settings.lines { return Ok(Vec::new()); }
        self.settings.lines = lines;
        self.resync = true;
        self.position_changed(now)
    }

    /// Re-targets analysis at the cursor position: replays a cached result or
    /// schedules an engine restart.
    fn position_changed(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        self.target = self.history.current_position()?;
        self.lines.clear();
        self.go_after_ready = false;
        let key = self.target_key();

        if let Some(entry) = self.cache.get(&key) {
            self.lines = entry.lines.iter().map(|l| (l.rank, l.clone())).collect();
            self.source = ViewSource::Cache;
            self.debouncer.cancel();
            self.stop_running()?;
            debug!("cache hit for {} (depth {}, lines {})", key.fen, key.depth, key.lines);
            return Ok(vec![SessionEvent::CacheReplayed { fen: key.fen }]);
        }

        let status = self.target.status();
        if status.is_over() {
            self.source = ViewSource::Terminal(status);
            self.debouncer.cancel();
            self.stop_running()?;
            return Ok(vec![SessionEvent::GameOver(status)]);
        }

        self.source = ViewSource::Pending;
        self.debouncer.request(now);
        Ok(Vec::new())
    }

    fn stop_running(&mut self) -> Result<()> {
        if let Some(search) = self.in_flight.back_mut() {
            if !search.stopped {
                search.stopped = true;
                debug!("stopping search {}", search.id);
                self.engine.send(&EngineCommand::Stop)?;
            }
        }
        Ok(())
    }

    /// Fires a debounced restart once the engine is ready.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<SessionEvent>> {
        if self.handshake != Handshake::Ready || !self.debouncer.ready(now) {
            return Ok(Vec::new());
        }
        self.stop_running()?;
        if self.resync || self.new_game {
            self.send_sync()?;
            self.go_after_ready = true;
            return Ok(Vec::new());
        }
        self.start_search()
    }

    fn send_sync(&mut self) -> Result<()> {
        if self.new_game { self.engine.send(&EngineCommand::UciNewGame)?; }
        if self.resync {
            self.engine.send(&EngineCommand::SetOption { name: "MultiPV".into(), value: Some(self.settings.lines.to_string()) })?;
        }
        self.engine.send(&EngineCommand::IsReady)?;
        self.new_game = false;
        self.resync = false;
        self.handshake = Handshake::AwaitReadyOk;
        Ok(())
    }

    fn start_search(&mut self) -> Result<Vec<SessionEvent>> {
        let key = self.target_key();
        // Another search may have filled the cache while this one waited
        if let Some(entry) = self.cache.get(&key) {
            self.lines = entry.lines.iter().map(|l| (l.rank, l.clone())).collect();
            self.source = ViewSource::Cache;
            return Ok(vec![SessionEvent::CacheReplayed { fen: key.fen }]);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.engine.send(&EngineCommand::Position { fen: Some(key.fen.clone()), moves: Vec::new() })?;
        self.engine.send(&EngineCommand::Go(GoParams::depth(key.depth)))?;
        info!("search {} started: depth {} lines {} fen {}", id, key.depth, key.lines, key.fen);
        let fen = key.fen.clone();
        self.in_flight.push_back(Search { id, key, stopped: false, stored: false });
        self.source = ViewSource::Pending;
        Ok(vec![SessionEvent::SearchStarted { id, fen }])
    }

    pub fn handle_message(&mut self, msg: EngineMessage, now: Instant) -> Result<Vec<SessionEvent>> {
        match msg {
            EngineMessage::IdName(name) => { self.engine_name = Some(name); Ok(Vec::new()) }
            EngineMessage::UciOk => {
                if self.handshake != Handshake::AwaitUciOk {
                    warn!("unexpected uciok");
                    return Ok(Vec::new());
                }
                let opts = self.settings.options.clone();
                for (name, value) in opts {
                    self.engine.send(&EngineCommand::SetOption { name, value: Some(value) })?;
                }
                self.resync = true;
                self.send_sync()?;
                Ok(Vec::new())
            }
            EngineMessage::ReadyOk => {
                if self.handshake != Handshake::AwaitReadyOk { return Ok(Vec::new()); }
                self.handshake = Handshake::Ready;
                let mut events = vec![SessionEvent::EngineReady { name: self.engine_name.clone() }];
                if self.go_after_ready {
                    self.go_after_ready = false;
                    events.extend(self.start_search()?);
                } else {
                    events.extend(self.tick(now)?);
                }
                Ok(events)
            }
            EngineMessage::Info(info) => Ok(self.on_info(info).into_iter().collect()),
            EngineMessage::BestMove { .. } => Ok(self.on_bestmove().into_iter().collect()),
            EngineMessage::IdAuthor(_) | EngineMessage::Option(_) => Ok(Vec::new()),
            EngineMessage::Unknown(line) => { debug!("ignoring engine line `{}`", line); Ok(Vec::new()) }
        }
    }

    fn on_info(&mut self, info: InfoLine) -> Option<SessionEvent> {
        let target = self.target_key();
        let (id, current) = self.in_flight.front().map(|s| (s.id, !s.stopped && s.key == target))?;
        if !current {
            self.stale_dropped += 1;
            return Some(SessionEvent::Stale { id });
        }
        let (score, depth) = match (info.score, info.depth) {
            (Some(s), Some(d)) if !info.pv.is_empty() => (s, d),
            _ => return None,
        };
        if info.bound != Bound::Exact { return None; }
        let rank = info.multipv.unwrap_or(1);
        if rank == 0 || rank > self.settings.lines { return None; }
        if self.target.parse_uci(&info.pv[0]).is_err() {
            warn!("search {}: pv {} does not fit the position", id, info.pv[0]);
            self.stale_dropped += 1;
            return Some(SessionEvent::Stale { id });
        }
        let san = line_to_san(self.target.board(), &info.pv);
        self.lines.insert(rank, CandidateLine { rank, score, depth, moves: info.pv, san });
        self.source = ViewSource::Live;
        if depth >= target.depth && self.lines_complete(target.depth) {
            self.store_front();
        }
        Some(SessionEvent::ViewUpdated { rank, depth })
    }

    fn expected_lines(&self) -> usize {
        (self.settings.lines as usize).min(self.target.legal_moves_count())
    }

    fn lines_complete(&self, depth: u32) -> bool {
        let want = self.expected_lines();
        want > 0 && (1..=want as u32).all(|r| self.lines.get(&r).map(|l| l.depth >= depth).unwrap_or(false))
    }

    fn store_front(&mut self) -> bool {
        let Some(search) = self.in_flight.front_mut() else { return false };
        if search.stored || self.lines.is_empty() { return search.stored; }
        search.stored = true;
        let key = search.key.clone();
        let entry = CacheEntry::new(self.lines.values().cloned().collect());
        debug!("caching {} lines for {}", entry.lines.len(), key.fen);
        self.cache.insert(key, entry);
        true
    }

    fn on_bestmove(&mut self) -> Option<SessionEvent> {
        let finished_current = match self.in_flight.front() {
            Some(s) => !s.stopped && s.key == self.target_key(),
            None => {
                warn!("bestmove with no search in flight");
                return None;
            }
        };
        let stored = finished_current && self.store_front();
        let search = self.in_flight.pop_front()?;
        if !finished_current {
            debug!("search {} finished after being superseded", search.id);
            return None;
        }
        Some(SessionEvent::SearchFinished { fen: search.key.fen, stored })
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.stop_running()?;
        self.engine.send(&EngineCommand::Quit)
    }
}
