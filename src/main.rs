use analysis_board::games::{GameCollection, GameFilter, Outcome};
use analysis_board::{
    AnalysisConfig, AnalysisSession, AnalysisView, EngineIo, EngineProcess, EvalCache, Position, SessionEvent,
    SessionSettings, ViewSource,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use cozy_chess::{Color, File, Piece, Rank, Square};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "analysis-board", version, about = "Step through a game with cached multi-line engine analysis")]
struct Args {
    /// UCI engine executable
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Search depth per position
    #[arg(long)]
    depth: Option<u32>,

    /// Number of candidate lines (MultiPV)
    #[arg(long)]
    lines: Option<u32>,

    /// Start from this FEN
    #[arg(long, conflicts_with = "pgn")]
    fen: Option<String>,

    /// Import a PGN file (may hold several games)
    #[arg(long)]
    pgn: Option<PathBuf>,

    /// Which game of the PGN file to load
    #[arg(long, default_value_t = 0)]
    game: usize,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluation cache snapshot, loaded at start and written on quit
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Delay before restarting the engine after the position changes
    #[arg(long)]
    debounce_ms: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
enum Cmd {
    Move(String),
    Back,
    Forward,
    First,
    Last,
    Goto(usize),
    Depth(u32),
    Lines(u32),
    Fen(String),
    Show,
    Pgn,
    Games(Option<String>),
    Load(usize),
    Help,
    Quit,
}

fn num<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse::<T>().ok().with_context(|| format!("{what} needs a number"))
}

fn parse_cmd(line: &str) -> Result<Cmd> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    Ok(match head {
        "move" | "m" if !rest.is_empty() => Cmd::Move(rest.to_string()),
        "back" | "b" | "<" => Cmd::Back,
        "fwd" | "f" | ">" => Cmd::Forward,
        "first" | "<<" => Cmd::First,
        "last" | ">>" => Cmd::Last,
        "goto" | "g" => Cmd::Goto(num(rest, "goto")?),
        "depth" => Cmd::Depth(num(rest, "depth")?),
        "lines" => Cmd::Lines(num(rest, "lines")?),
        "fen" if !rest.is_empty() => Cmd::Fen(rest.to_string()),
        "show" | "s" | "" => Cmd::Show,
        "pgn" => Cmd::Pgn,
        "games" => Cmd::Games(if rest.is_empty() { None } else { Some(rest.to_string()) }),
        "load" => Cmd::Load(num(rest, "load")?),
        "help" | "?" => Cmd::Help,
        "quit" | "q" | "exit" => Cmd::Quit,
        // Bare moves: "e4", "Nf3", "e2e4"
        other if rest.is_empty() => Cmd::Move(other.to_string()),
        other => bail!("unknown command `{}`", other),
    })
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut cfg = match &args.config {
        Some(p) => AnalysisConfig::load(p)?,
        None => AnalysisConfig::default(),
    };
    cfg.apply_env()?;
    if let Some(e) = &args.engine { cfg.engine_path = e.clone(); }
    if let Some(d) = args.depth { cfg.depth = d; }
    if let Some(l) = args.lines { cfg.lines = l; }
    if let Some(ms) = args.debounce_ms { cfg.debounce_ms = ms; }
    if let Some(c) = &args.cache { cfg.cache_file = Some(c.clone()); }
    cfg.validate()?;
    Ok(cfg)
}

fn piece_char(color: Color, piece: Piece) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    if color == Color::White { c.to_ascii_uppercase() } else { c }
}

fn render_board(pos: &Position) -> String {
    let b = pos.board();
    let mut s = String::new();
    for &rank in Rank::ALL.iter().rev() {
        s.push_str(&format!("{} ", rank as usize + 1));
        for &file in File::ALL.iter() {
            let sq = Square::new(file, rank);
            let c = match (b.color_on(sq), b.piece_on(sq)) {
                (Some(col), Some(p)) => piece_char(col, p),
                _ => '.',
            };
            s.push(c);
            s.push(' ');
        }
        s.push('\n');
    }
    s.push_str("  a b c d e f g h\n");
    s
}

fn render_bar(view: &AnalysisView) -> String {
    let width = 20usize;
    let filled = (view.bar_fraction() * width as f32).round() as usize;
    format!("[{}{}]", "#".repeat(filled.min(width)), "-".repeat(width - filled.min(width)))
}

fn render_view(view: &AnalysisView) -> String {
    let mut s = String::new();
    let source = match view.source {
        ViewSource::Pending => "waiting".to_string(),
        ViewSource::Live => "live".to_string(),
        ViewSource::Cache => "cached".to_string(),
        ViewSource::Terminal(st) => format!("{:?}", st),
    };
    let eval = view.best_for_white().map(|sc| sc.to_string()).unwrap_or_else(|| "  ?  ".into());
    s.push_str(&format!("{} {} ({}, depth {})\n", render_bar(view), eval, source, view.depth().map(|d| d.to_string()).unwrap_or_else(|| "-".into())));
    for line in &view.lines {
        let moves = if line.san.is_empty() { line.moves.join(" ") } else { line.san.join(" ") };
        s.push_str(&format!("  {}. {:>6}  d{:<3} {}\n", line.rank, line.score.for_white(view.side_to_move).to_string(), line.depth, moves));
    }
    s
}

fn print_position(session: &AnalysisSession<EngineProcess>) {
    let h = session.history();
    match h.current_position() {
        Ok(pos) => print!("\n{}", render_board(&pos)),
        Err(e) => warn!("cannot render position: {e}"),
    }
    let moves: Vec<String> = h.moves().iter().enumerate().map(|(i, m)| {
        if i + 1 == h.cursor() { format!("[{}]", m.san) } else { m.san.clone() }
    }).collect();
    println!("ply {}/{}  {}", h.cursor(), h.position_count() - 1, moves.join(" "));
    println!("fen {}", h.current_fen());
}

fn print_games(games: &GameCollection, filter: Option<&str>) -> Result<()> {
    if let Some(f) = filter.filter(|f| f.contains('=')) {
        for m in games.query(&GameFilter::parse(f)?, 50, 0) {
            let v = m.view;
            let side = match m.my_color { Some(Color::White) => "white", Some(Color::Black) => "black", None => "-" };
            let pov = m.pov_result.map(|o| format!("{o:?}").to_lowercase()).unwrap_or_else(|| "-".into());
            println!("{:>3}  {} - {}  {}  {} {}  [{} {}]", v.index,
                v.white.as_deref().unwrap_or("?"), v.black.as_deref().unwrap_or("?"),
                v.result.as_deref().unwrap_or("*"), v.eco.as_deref().unwrap_or("---"), v.family, side, pov);
        }
        return Ok(());
    }
    let views = match filter {
        None => games.list(50, 0),
        Some(f) => {
            let parts: Vec<&str> = f.split_whitespace().collect();
            match parts.as_slice() {
                ["eco", code] => games.by_eco(code, true),
                [user, outcome] if outcome.parse::<Outcome>().is_ok() => games.by_result(user, outcome.parse::<Outcome>()?),
                _ => games.by_family(f),
            }
        }
    };
    for v in views {
        println!("{:>3}  {} - {}  {}  {} {}", v.index,
            v.white.as_deref().unwrap_or("?"), v.black.as_deref().unwrap_or("?"),
            v.result.as_deref().unwrap_or("*"), v.eco.as_deref().unwrap_or("---"), v.family);
    }
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() { break; }
        }
    });
    rx
}

fn save_cache<E: EngineIo>(cfg: &AnalysisConfig, session: &AnalysisSession<E>) -> Result<()> {
    if let Some(p) = &cfg.cache_file {
        session.cache().save(p).with_context(|| format!("writing cache {}", p.display()))?;
        info!("saved {} evaluations to {}", session.cache().len(), p.display());
    }
    Ok(())
}

const HELP: &str = "commands: <move> | move <san|uci> | back | fwd | first | last | goto N | depth N | lines N | fen <fen> | show | pgn | games [eco CODE | USER win|loss|draw | FAMILY | user=U color=white|black result=win|loss|draw eco=P family=F opening=TEXT] | load N | quit";

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let cfg = load_config(&args)?;

    let cache = match &cfg.cache_file {
        Some(p) if p.exists() => {
            let c = EvalCache::load(p).with_context(|| format!("reading cache {}", p.display()))?;
            info!("loaded {} cached evaluations", c.len());
            c
        }
        _ => EvalCache::new(),
    };

    let engine = EngineProcess::spawn(&cfg.engine_path, &cfg.engine_args)?;
    let mut session = AnalysisSession::new(engine, SessionSettings::from(&cfg)).with_cache(cache);

    let mut games = GameCollection::default();
    let now = Instant::now();
    if let Some(path) = &args.pgn {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        games = GameCollection::from_pgn_text(&text);
        if games.is_empty() { bail!("no games in {}", path.display()); }
        session.load_history(games.load(args.game)?, now)?;
        println!("loaded game {} of {} from {}", args.game, games.len(), path.display());
    } else if let Some(fen) = &args.fen {
        session.set_fen(fen, now)?;
    }

    session.start(Instant::now())?;
    session.wait_ready(Duration::from_millis(cfg.ready_timeout_ms))?;
    println!("engine: {}", session.engine_name().unwrap_or("unknown"));
    println!("{HELP}");
    print_position(&session);

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") { spinner.set_style(style); }
    spinner.enable_steady_tick(Duration::from_millis(120));

    let input = spawn_stdin_reader();
    let mut last_render = Instant::now();
    let mut dirty = true;
    loop {
        match input.recv_timeout(Duration::from_millis(20)) {
            Ok(line) => {
                let now = Instant::now();
                let result = parse_cmd(&line).and_then(|cmd| -> Result<bool> {
                    match cmd {
                        Cmd::Quit => return Ok(false),
                        Cmd::Move(m) => { session.play(&m, now)?; }
                        Cmd::Back => { session.back(now)?; }
                        Cmd::Forward => { session.forward(now)?; }
                        Cmd::First => { session.first(now)?; }
                        Cmd::Last => { session.last(now)?; }
                        Cmd::Goto(n) => { session.go_to(n, now)?; }
                        Cmd::Depth(d) => { session.set_depth(d, now)?; }
                        Cmd::Lines(l) => { session.set_lines(l, now)?; }
                        Cmd::Fen(f) => { session.set_fen(&f, now)?; }
                        Cmd::Load(i) => { session.load_history(games.load(i)?, now)?; }
                        Cmd::Games(f) => { spinner.suspend(|| print_games(&games, f.as_deref()))?; return Ok(true); }
                        Cmd::Pgn => {
                            let text = session.history().to_pgn(&Vec::new(), "*")?;
                            spinner.suspend(|| println!("{text}"));
                            return Ok(true);
                        }
                        Cmd::Help => { spinner.suspend(|| println!("{HELP}")); return Ok(true); }
                        Cmd::Show => {}
                    }
                    spinner.suspend(|| print_position(&session));
                    Ok(true)
                });
                match result {
                    Ok(false) => break,
                    Ok(true) => dirty = true,
                    Err(e) => spinner.suspend(|| println!("error: {e:#}")),
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let events = match session.poll(Instant::now()) {
            Ok(events) => events,
            Err(e) => {
                spinner.finish_and_clear();
                save_cache(&cfg, &session)?;
                return Err(e).context("engine link lost");
            }
        };
        for ev in events {
            match ev {
                SessionEvent::ViewUpdated { .. } => dirty = true,
                SessionEvent::CacheReplayed { .. } | SessionEvent::SearchFinished { .. } | SessionEvent::GameOver(_) => {
                    let text = render_view(&session.view());
                    spinner.suspend(|| print!("{text}"));
                    dirty = false;
                    last_render = Instant::now();
                }
                SessionEvent::SearchStarted { id, .. } => info!("search {id} started"),
                SessionEvent::EngineReady { .. } | SessionEvent::Stale { .. } => {}
            }
        }

        let view = session.view();
        if view.searching {
            spinner.set_message(format!("depth {} / {}  {}", view.depth().unwrap_or(0), session.settings().depth,
                view.best_for_white().map(|s| s.to_string()).unwrap_or_default()));
        } else {
            spinner.set_message(String::new());
        }
        // Live lines are redrawn at most twice a second
        if dirty && view.source == ViewSource::Live && last_render.elapsed() >= Duration::from_millis(500) {
            let text = render_view(&view);
            spinner.suspend(|| print!("{text}"));
            dirty = false;
            last_render = Instant::now();
        }
    }
    spinner.finish_and_clear();

    save_cache(&cfg, &session)?;
    session.shutdown()?;
    Ok(())
}
