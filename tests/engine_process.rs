use analysis_board::uci::{EngineCommand, EngineMessage, GoParams};
use analysis_board::{AnalysisSession, EngineIo, EngineProcess, SessionEvent, SessionSettings};
use std::time::{Duration, Instant};

#[test]
fn missing_binary_is_an_engine_error() {
    let err = EngineProcess::spawn("/nonexistent/engine-binary", &[]).err().expect("spawn must fail");
    assert!(err.to_string().contains("cannot start"), "{err}");
}

// Minimal UCI responder written in POSIX sh
#[cfg(unix)]
const SHELL_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "id name ShellFish"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1 seldepth 1 multipv 1 score cp 12 nodes 20 pv e2e4 e7e5"; echo "bestmove e2e4" ;;
    quit) exit 0 ;;
  esac
done
"#;

#[cfg(unix)]
fn shell_engine() -> EngineProcess {
    EngineProcess::spawn("sh", &["-c".to_string(), SHELL_ENGINE.to_string()]).expect("sh available")
}

#[cfg(unix)]
#[test]
fn process_round_trip() {
    let mut e = shell_engine();
    e.send(&EngineCommand::Uci).unwrap();
    let mut got = Vec::new();
    while got.last() != Some(&EngineMessage::UciOk) {
        match e.recv_timeout(Duration::from_secs(5)).unwrap() {
            Some(m) => got.push(m),
            None => panic!("engine timed out; got {got:?}"),
        }
    }
    assert_eq!(got[0], EngineMessage::IdName("ShellFish".into()));
    e.send(&EngineCommand::Go(GoParams::depth(1))).unwrap();
    let first = e.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(first, Some(EngineMessage::Info(_))), "{first:?}");
}

#[cfg(unix)]
#[test]
fn session_against_process_caches_result() {
    let settings = SessionSettings { depth: 1, lines: 1, debounce: Duration::ZERO, min_restart: Duration::ZERO, options: Vec::new() };
    let mut s = AnalysisSession::new(shell_engine(), settings);
    s.start(Instant::now()).unwrap();
    s.wait_ready(Duration::from_secs(5)).unwrap();
    assert_eq!(s.engine_name(), Some("ShellFish"));

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut finished = false;
    while !finished && Instant::now() < deadline {
        let events = s.poll(Instant::now()).unwrap();
        finished = events.iter().any(|e| matches!(e, SessionEvent::SearchFinished { stored: true, .. }));
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(finished, "search never finished");
    assert_eq!(s.cache().len(), 1);
    assert_eq!(s.view().lines[0].san, vec!["e4", "e5"]);
}
