use analysis_board::games::{GameCollection, GameFilter, Outcome};
use cozy_chess::Color;
use analysis_board::{MoveHistory, Position};
use pretty_assertions::assert_eq;

const BULK: &str = r#"[Event "Live Chess"]
[Site "Chess.com"]
[White "WolfOnTheBoard"]
[Black "rival"]
[Result "1-0"]
[ECO "B90"]
[Opening "Sicilian Defense: Najdorf Variation"]

1. e4 c5 2. Nf3 d6 3. d4 cxd4 4. Nxd4 Nf6 5. Nc3 a6 {Najdorf} 1-0

[Event "Live Chess"]
[White "rival"]
[Black "wolfontheboard"]
[Result "1/2-1/2"]
[Opening "Caro-Kann Defense"]

1. e4 c6 2. d4 d5 3. e5 Bf5 1/2-1/2

[Event "Live Chess"]
[White "someone"]
[Black "WolfOnTheBoard"]
[Result "1-0"]
[ECO "C60"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 4. Ba4 Nf6 5. O-O Be7 1-0
"#;

#[test]
fn collection_queries() {
    let games = GameCollection::from_pgn_text(BULK);
    assert_eq!(games.len(), 3);
    let eco: Vec<usize> = games.by_eco("b9", true).iter().map(|v| v.index).collect();
    assert_eq!(eco, vec![0]);
    assert!(games.by_eco("B9", false).is_empty());
    let draws: Vec<usize> = games.by_result("WolfOnTheBoard", Outcome::Draw).iter().map(|v| v.index).collect();
    assert_eq!(draws, vec![1]);
    let losses: Vec<usize> = games.by_result("wolfontheboard", Outcome::Loss).iter().map(|v| v.index).collect();
    assert_eq!(losses, vec![2]);
    assert_eq!(games.list(10, 1).len(), 2);
    assert_eq!(games.by_family("caro").len(), 1);
    assert_eq!(games.list(10, 0)[2].family, "Ruy Lopez");
}

#[test]
fn loaded_game_is_navigable() {
    let games = GameCollection::from_pgn_text(BULK);
    let mut h = games.load(2).unwrap();
    assert_eq!(h.position_count(), 11);
    assert_eq!(h.moves()[8].uci, "e1g1");
    assert_eq!(h.moves()[8].san, "O-O");
    h.go_to(4).unwrap();
    assert_eq!(h.last_move().map(|m| m.san.as_str()), Some("Nc6"));
    assert!(games.load(7).is_err());
}

#[test]
fn export_then_import_keeps_the_line() {
    let mut h = MoveHistory::default();
    for m in ["e4", "c6", "d4", "d5", "Nc3", "dxe4", "Nxe4", "Bf5"] { h.push_san(m).unwrap(); }
    let text = h.to_pgn(&vec![("Event".to_string(), "Analysis".to_string())], "*").unwrap();
    assert_eq!(text, "[Event \"Analysis\"]\n\n1. e4 c6 2. d4 d5 3. Nc3 dxe4 4. Nxe4 Bf5 *\n");
    let back = MoveHistory::from_pgn(&text).unwrap();
    assert_eq!(back.positions(), h.positions());
}

#[test]
fn bad_movetext_reports_the_ply() {
    let err = MoveHistory::from_pgn("1. e4 e5 2. Ke3 *").unwrap_err();
    assert!(err.to_string().contains("ply 3"), "{err}");
    assert_eq!(MoveHistory::from_pgn("*").unwrap().current_fen(), Position::startpos().fen());
}

#[test]
fn combined_query_pages_after_filtering() {
    let games = GameCollection::from_pgn_text(BULK);
    let black = GameFilter { color: Some(Color::Black), ..GameFilter::for_user("WolfOnTheBoard") };
    let hits: Vec<usize> = games.query(&black, 10, 0).iter().map(|m| m.view.index).collect();
    assert_eq!(hits, vec![1, 2]);
    let page: Vec<usize> = games.query(&black, 1, 1).iter().map(|m| m.view.index).collect();
    assert_eq!(page, vec![2]);

    let ruy_losses = GameFilter { family: Some("ruy lopez".into()), result: Some(Outcome::Loss), ..black.clone() };
    let hit = games.query(&ruy_losses, 10, 0);
    assert_eq!(hit.len(), 1);
    assert_eq!(hit[0].my_color, Some(Color::Black));
    assert_eq!(hit[0].pov_result, Some(Outcome::Loss));

    let najdorf = GameFilter { opening_like: Some("NAJDORF".into()), eco_prefix: Some("b9".into()), ..GameFilter::for_user("wolfontheboard") };
    let hit = games.query(&najdorf, 10, 0);
    assert_eq!(hit.len(), 1);
    assert_eq!((hit[0].view.index, hit[0].my_color, hit[0].pov_result), (0, Some(Color::White), Some(Outcome::Win)));
}

#[test]
fn side_filters_need_a_user() {
    let games = GameCollection::from_pgn_text(BULK);
    let anyone_white = GameFilter { color: Some(Color::White), ..GameFilter::default() };
    assert!(games.query(&anyone_white, 10, 0).is_empty());
    assert_eq!(games.query(&GameFilter::default(), 10, 0).len(), 3);
    assert!(games.query(&GameFilter::default(), 10, 0).iter().all(|m| m.my_color.is_none()));
}

#[test]
fn filter_text_parses() {
    let games = GameCollection::from_pgn_text(BULK);
    let f = GameFilter::parse("user=wolfontheboard color=black result=draw").unwrap();
    let hits: Vec<usize> = games.query(&f, 10, 0).iter().map(|m| m.view.index).collect();
    assert_eq!(hits, vec![1]);
    let f = GameFilter::parse("family=Caro-Kann_Defense").unwrap();
    assert_eq!(f.family.as_deref(), Some("Caro-Kann Defense"));
    assert!(GameFilter::parse("color=green").is_err());
    assert!(GameFilter::parse("colour").is_err());
}

#[test]
fn headerless_games_are_bucketed_by_moves() {
    let games = GameCollection::from_pgn_text("[Event \"Casual\"]\n\n1. d4 f5 2. c4 Nf6 *\n");
    assert_eq!(games.list(1, 0)[0].family, "Dutch Defense");
}

#[test]
fn wrapped_clock_comment_imports() {
    let h = MoveHistory::from_pgn("[Event \"x\"]\n\n1. e4 { a long comment that wraps onto the next line\n[%clk 0:05:00] } 1... e5 2. Nf3 *").unwrap();
    assert_eq!(h.position_count(), 4);
    assert_eq!(h.moves()[2].san, "Nf3");
}
