use cozy_chess::Color;
use serde::Serialize;
use crate::error::{AnalysisError, Result};
use crate::history::MoveHistory;
use crate::openings::{family_from_eco_or_name, family_from_moves, FALLBACK_FAMILY};
use crate::pgn::{header, parse_headers, split_games};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl std::str::FromStr for Outcome {
    type Err = AnalysisError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "win" | "won" => Ok(Outcome::Win),
            "loss" | "lost" => Ok(Outcome::Loss),
            "draw" | "drawn" => Ok(Outcome::Draw),
            _ => Err(AnalysisError::Config(format!("outcome must be win|loss|draw, got `{s}`"))),
        }
    }
}

/// Header summary of one game in a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub index: usize,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub date: Option<String>,
    pub eco: Option<String>,
    pub opening: Option<String>,
    pub family: &'static str,
}

impl GameView {
    fn from_pgn(index: usize, pgn: &str) -> Self {
        let h = parse_headers(pgn);
        let get = |tag: &str| header(&h, tag).filter(|v| !v.is_empty() && *v != "?").map(|v| v.to_string());
        let eco = get("ECO");
        let opening = get("Opening");
        let family = match (&eco, &opening) {
            // Headerless exports: bucket by the moves themselves
            (None, None) => MoveHistory::from_pgn(pgn).ok()
                .and_then(|hist| {
                    let uci: Vec<String> = hist.moves().iter().map(|m| m.uci.clone()).collect();
                    family_from_moves(&uci)
                })
                .unwrap_or(FALLBACK_FAMILY),
            _ => family_from_eco_or_name(eco.as_deref(), opening.as_deref()),
        };
        Self {
            index,
            white: get("White"),
            black: get("Black"),
            result: get("Result"),
            date: get("Date").or_else(|| get("UTCDate")),
            eco,
            opening,
            family,
        }
    }

    /// Side `username` played; `None` if they are not in the game.
    pub fn color_of(&self, username: &str) -> Option<Color> {
        let is = |p: &Option<String>| p.as_deref().map(|n| n.eq_ignore_ascii_case(username)).unwrap_or(false);
        if is(&self.white) { Some(Color::White) } else if is(&self.black) { Some(Color::Black) } else { None }
    }

    /// Result from `username`'s side; `None` if they did not play or the game is unfinished.
    pub fn outcome_for(&self, username: &str) -> Option<Outcome> {
        let mine = self.color_of(username)?;
        match self.result.as_deref()? {
            "1/2-1/2" => Some(Outcome::Draw),
            "1-0" => Some(if mine == Color::White { Outcome::Win } else { Outcome::Loss }),
            "0-1" => Some(if mine == Color::Black { Outcome::Win } else { Outcome::Loss }),
            _ => None,
        }
    }
}

/// Combined filter for [`GameCollection::query`]. Unset fields match everything.
/// `color` and `result` are from `username`'s side and need it set.
#[derive(Clone, Debug, Default)]
pub struct GameFilter {
    pub username: Option<String>,
    /// Case-insensitive substring of the `Opening` tag.
    pub opening_like: Option<String>,
    pub eco_prefix: Option<String>,
    /// Family name, compared case-insensitively.
    pub family: Option<String>,
    pub color: Option<Color>,
    pub result: Option<Outcome>,
}

impl GameFilter {
    pub fn for_user(username: &str) -> Self {
        Self { username: Some(username.to_string()), ..Self::default() }
    }

    /// Parses `key=value` words: `user=`, `opening=`, `eco=`, `family=`,
    /// `color=white|black`, `result=win|loss|draw`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut f = Self::default();
        for word in text.split_whitespace() {
            let (key, value) = word.split_once('=')
                .ok_or_else(|| AnalysisError::Config(format!("expected key=value, got `{word}`")))?;
            let value = value.replace('_', " ");
            match key {
                "user" => f.username = Some(value),
                "opening" => f.opening_like = Some(value),
                "eco" => f.eco_prefix = Some(value),
                "family" => f.family = Some(value),
                "color" => f.color = Some(match value.to_ascii_lowercase().as_str() {
                    "white" | "w" => Color::White,
                    "black" | "b" => Color::Black,
                    _ => return Err(AnalysisError::Config(format!("color must be white|black, got `{value}`"))),
                }),
                "result" => f.result = Some(value.parse()?),
                _ => return Err(AnalysisError::Config(format!("unknown filter `{key}`"))),
            }
        }
        Ok(f)
    }

    fn matches(&self, v: &GameView) -> bool {
        let user = self.username.as_deref();
        if let Some(u) = user {
            if v.color_of(u).is_none() { return false; }
        }
        if let Some(want) = &self.opening_like {
            let want = want.to_lowercase();
            if !v.opening.as_deref().map(|o| o.to_lowercase().contains(&want)).unwrap_or(false) { return false; }
        }
        if let Some(prefix) = &self.eco_prefix {
            let prefix = prefix.to_ascii_uppercase();
            if !v.eco.as_deref().map(|e| e.to_ascii_uppercase().starts_with(&prefix)).unwrap_or(false) { return false; }
        }
        if let Some(fam) = &self.family {
            if !v.family.eq_ignore_ascii_case(fam) { return false; }
        }
        if let Some(c) = self.color {
            if user.and_then(|u| v.color_of(u)) != Some(c) { return false; }
        }
        if let Some(r) = self.result {
            if user.and_then(|u| v.outcome_for(u)) != Some(r) { return false; }
        }
        true
    }
}

/// One query hit, annotated from the filter user's side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameMatch<'a> {
    pub view: &'a GameView,
    pub my_color: Option<Color>,
    pub pov_result: Option<Outcome>,
}

/// Games split out of one bulk PGN file.
#[derive(Clone, Debug, Default)]
pub struct GameCollection {
    games: Vec<String>,
    views: Vec<GameView>,
}

impl GameCollection {
    pub fn from_pgn_text(blob: &str) -> Self {
        let games = split_games(blob);
        let views = games.iter().enumerate().map(|(i, g)| GameView::from_pgn(i, g)).collect();
        Self { games, views }
    }

    pub fn len(&self) -> usize { self.games.len() }

    pub fn is_empty(&self) -> bool { self.games.is_empty() }

    pub fn list(&self, limit: usize, offset: usize) -> Vec<&GameView> {
        self.views.iter().skip(offset).take(limit).collect()
    }

    /// ECO match by exact code or by prefix ("B9" finds B90..B99), case-insensitive.
    pub fn by_eco(&self, eco: &str, prefix: bool) -> Vec<&GameView> {
        let want = eco.to_ascii_uppercase();
        self.views.iter()
            .filter(|v| v.eco.as_deref().map(|e| {
                let e = e.to_ascii_uppercase();
                if prefix { e.starts_with(&want) } else { e == want }
            }).unwrap_or(false))
            .collect()
    }

    /// Case-insensitive substring match on the family name ("sicilian").
    pub fn by_family(&self, family: &str) -> Vec<&GameView> {
        let want = family.to_lowercase();
        self.views.iter().filter(|v| v.family.to_lowercase().contains(&want)).collect()
    }

    pub fn by_result(&self, username: &str, outcome: Outcome) -> Vec<&GameView> {
        self.views.iter().filter(|v| v.outcome_for(username) == Some(outcome)).collect()
    }

    /// Applies every filter, then pages through the matches in file order.
    pub fn query(&self, filter: &GameFilter, limit: usize, offset: usize) -> Vec<GameMatch<'_>> {
        let user = filter.username.as_deref();
        self.views.iter()
            .filter(|v| filter.matches(v))
            .skip(offset)
            .take(limit)
            .map(|view| GameMatch {
                view,
                my_color: user.and_then(|u| view.color_of(u)),
                pov_result: user.and_then(|u| view.outcome_for(u)),
            })
            .collect()
    }

    pub fn pgn(&self, index: usize) -> Option<&str> { self.games.get(index).map(|s| s.as_str()) }

    /// Parses game `index` into a timeline ready for analysis.
    pub fn load(&self, index: usize) -> Result<MoveHistory> {
        let pgn = self.pgn(index)
            .ok_or_else(|| AnalysisError::Pgn(format!("no game {} (collection has {})", index, self.games.len())))?;
        MoveHistory::from_pgn(pgn)
    }
}
