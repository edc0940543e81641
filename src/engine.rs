use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, info, warn};
use crate::error::{AnalysisError, Result};
use crate::uci::{EngineCommand, EngineMessage};

/// Line-oriented link to a UCI engine.
pub trait EngineIo {
    fn send(&mut self, cmd: &EngineCommand) -> Result<()>;
    /// Next parsed message if one is waiting.
    fn try_recv(&mut self) -> Result<Option<EngineMessage>>;
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<EngineMessage>>;
}

/// Engine running as a child process; a reader thread parses its stdout into a channel.
pub struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    rx: Receiver<EngineMessage>,
    reader: Option<JoinHandle<()>>,
}

impl EngineProcess {
    pub fn spawn<P: AsRef<Path>>(path: P, args: &[String]) -> Result<Self> {
        let path = path.as_ref();
        info!("starting engine {}", path.display());
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AnalysisError::Engine(format!("cannot start {}: {}", path.display(), e)))?;
        let stdin = child.stdin.take().ok_or_else(|| AnalysisError::Engine("no stdin pipe".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| AnalysisError::Engine("no stdout pipe".into()))?;
        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("uci-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let line = match line { Ok(l) => l, Err(e) => { warn!("engine read failed: {e}"); break; } };
                    if line.trim().is_empty() { continue; }
                    debug!("<< {}", line);
                    match EngineMessage::parse(&line) {
                        Ok(msg) => { if tx.send(msg).is_err() { break; } }
                        Err(e) => warn!("unparseable engine line `{}`: {}", line, e),
                    }
                }
                debug!("engine stdout closed");
            })?;
        Ok(Self { child, stdin, rx, reader: Some(reader) })
    }

    pub fn id(&self) -> u32 { self.child.id() }
}

impl EngineIo for EngineProcess {
    fn send(&mut self, cmd: &EngineCommand) -> Result<()> {
        debug!(">> {}", cmd);
        writeln!(self.stdin, "{}", cmd).map_err(|_| AnalysisError::Disconnected)?;
        self.stdin.flush().map_err(|_| AnalysisError::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<EngineMessage>> {
        match self.rx.try_recv() {
            Ok(m) => Ok(Some(m)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AnalysisError::Disconnected),
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<EngineMessage>> {
        match self.rx.recv_timeout(timeout) {
            Ok(m) => Ok(Some(m)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(AnalysisError::Disconnected),
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.send(&EngineCommand::Quit);
        for _ in 0..50 {
            if let Ok(Some(_)) = self.child.try_wait() { break; }
            thread::sleep(Duration::from_millis(10));
        }
        if let Ok(None) = self.child.try_wait() {
            warn!("engine ignored quit; killing pid {}", self.child.id());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(h) = self.reader.take() { let _ = h.join(); }
        info!("engine stopped");
    }
}

/// In-process stand-in that records commands and replays queued lines.
/// With `auto_reply`, it answers the handshake and `stop` like a real engine.
#[derive(Default)]
pub struct ScriptedEngine {
    pub sent: Vec<String>,
    queue: VecDeque<EngineMessage>,
    auto_reply: bool,
    searching: usize,
    closed: bool,
}

impl ScriptedEngine {
    pub fn new() -> Self { Self::default() }

    pub fn with_auto_reply() -> Self { Self { auto_reply: true, ..Self::default() } }

    pub fn push_line(&mut self, line: &str) {
        match EngineMessage::parse(line) {
            Ok(msg) => {
                if matches!(msg, EngineMessage::BestMove { .. }) { self.searching = self.searching.saturating_sub(1); }
                self.queue.push_back(msg);
            }
            Err(e) => warn!("scripted line `{}` rejected: {}", line, e),
        }
    }

    /// Simulates the process exiting.
    pub fn close(&mut self) { self.closed = true; }

    pub fn sent_matching(&self, prefix: &str) -> Vec<&str> {
        self.sent.iter().filter(|s| s.starts_with(prefix)).map(|s| s.as_str()).collect()
    }

    pub fn searching(&self) -> usize { self.searching }
}

impl EngineIo for ScriptedEngine {
    fn send(&mut self, cmd: &EngineCommand) -> Result<()> {
        if self.closed { return Err(AnalysisError::Disconnected); }
        self.sent.push(cmd.to_string());
        if !self.auto_reply { return Ok(()); }
        match cmd {
            EngineCommand::Uci => {
                self.push_line("id name Scripted");
                self.push_line("option name MultiPV type spin default 1 min 1 max 500");
                self.push_line("uciok");
            }
            EngineCommand::IsReady => self.push_line("readyok"),
            EngineCommand::Go(_) => self.searching += 1,
            EngineCommand::Stop => {
                if self.searching > 0 { self.push_line("bestmove 0000"); }
            }
            _ => {}
        }
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<EngineMessage>> {
        match self.queue.pop_front() {
            Some(m) => Ok(Some(m)),
            None if self.closed => Err(AnalysisError::Disconnected),
            None => Ok(None),
        }
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Result<Option<EngineMessage>> { self.try_recv() }
}

impl<T: EngineIo + ?Sized> EngineIo for Box<T> {
    fn send(&mut self, cmd: &EngineCommand) -> Result<()> { (**self).send(cmd) }
    fn try_recv(&mut self) -> Result<Option<EngineMessage>> { (**self).try_recv() }
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<EngineMessage>> { (**self).recv_timeout(timeout) }
}
