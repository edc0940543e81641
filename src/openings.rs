//! Opening family buckets, by ECO range, by opening name, or by the moves played.

// Inclusive ECO ranges; narrower ranges come before the broad ones they sit in.
const ECO_RANGES: &[(&str, &str, &str)] = &[
    ("Scandinavian Defense", "B01", "B01"),
    ("Alekhine Defense", "B02", "B05"),
    ("Pirc/Modern", "B06", "B09"),
    ("Caro-Kann Defense", "B10", "B19"),
    ("Sicilian Defense", "B20", "B99"),
    ("French Defense", "C00", "C19"),
    ("Vienna Game", "C25", "C29"),
    ("King's Gambit", "C30", "C39"),
    ("Philidor Defense", "C41", "C41"),
    ("Petrov Defense", "C40", "C42"),
    ("Scotch Game", "C44", "C45"),
    ("Italian Game", "C50", "C59"),
    ("Ruy Lopez", "C60", "C99"),
    ("Slav/Semi-Slav", "D10", "D19"),
    ("Queen's Gambit", "D06", "D69"),
    ("Grünfeld", "D70", "D99"),
    ("Catalan", "E01", "E09"),
    ("Queen's Indian", "E12", "E19"),
    ("Nimzo-Indian", "E20", "E59"),
    ("King's Indian", "E60", "E99"),
    ("English Opening", "A10", "A39"),
    ("London/Trompowsky/Jobava", "A45", "A46"),
    ("Benoni/Benko", "A56", "A79"),
    ("Dutch Defense", "A80", "A99"),
    ("Other/Irregular", "A00", "A09"),
];

// Lowercase keywords; the first hit wins, so specific names precede generic ones.
const NAME_RULES: &[(&[&str], &str)] = &[
    (&["sicilian"], "Sicilian Defense"),
    (&["french"], "French Defense"),
    (&["caro-kann", "caro kann", "carokann"], "Caro-Kann Defense"),
    (&["italian", "giuoco", "two knights"], "Italian Game"),
    (&["ruy", "spanish"], "Ruy Lopez"),
    (&["scotch"], "Scotch Game"),
    (&["petrov", "petroff", "russian"], "Petrov Defense"),
    (&["philidor"], "Philidor Defense"),
    (&["queen's gambit", "queens gambit"], "Queen's Gambit"),
    (&["slav"], "Slav/Semi-Slav"),
    (&["catalan"], "Catalan"),
    (&["nimzo"], "Nimzo-Indian"),
    (&["queen's indian", "queens indian"], "Queen's Indian"),
    (&["king's indian", "kings indian"], "King's Indian"),
    (&["grünfeld", "grunfeld", "gruenfeld"], "Grünfeld"),
    (&["benoni", "benko"], "Benoni/Benko"),
    (&["dutch"], "Dutch Defense"),
    (&["english"], "English Opening"),
    (&["vienna"], "Vienna Game"),
    (&["king's gambit", "kings gambit"], "King's Gambit"),
    (&["pirc", "modern"], "Pirc/Modern"),
    (&["london", "tromp", "jobava"], "London/Trompowsky/Jobava"),
    (&["scandinavian", "center counter"], "Scandinavian Defense"),
    (&["alekhine"], "Alekhine Defense"),
];

pub const FALLBACK_FAMILY: &str = "Other/Irregular";

/// Characteristic move prefixes (UCI) for recognising a family without headers.
const MOVE_PREFIXES: &[(&str, &[&str])] = &[
    ("Italian Game", &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"]),
    ("Ruy Lopez", &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]),
    ("Scotch Game", &["e2e4", "e7e5", "g1f3", "b8c6", "d2d4"]),
    ("Petrov Defense", &["e2e4", "e7e5", "g1f3", "g8f6"]),
    ("Philidor Defense", &["e2e4", "e7e5", "g1f3", "d7d6"]),
    ("Vienna Game", &["e2e4", "e7e5", "b1c3"]),
    ("King's Gambit", &["e2e4", "e7e5", "f2f4"]),
    ("Sicilian Defense", &["e2e4", "c7c5"]),
    ("French Defense", &["e2e4", "e7e6"]),
    ("Caro-Kann Defense", &["e2e4", "c7c6"]),
    ("Scandinavian Defense", &["e2e4", "d7d5"]),
    ("Alekhine Defense", &["e2e4", "g8f6"]),
    ("Pirc/Modern", &["e2e4", "d7d6"]),
    ("Pirc/Modern", &["e2e4", "g7g6"]),
    ("Slav/Semi-Slav", &["d2d4", "d7d5", "c2c4", "c7c6"]),
    ("Queen's Gambit", &["d2d4", "d7d5", "c2c4"]),
    ("London/Trompowsky/Jobava", &["d2d4", "d7d5", "g1f3", "g8f6", "c1f4"]),
    ("London/Trompowsky/Jobava", &["d2d4", "d7d5", "c1f4"]),
    ("London/Trompowsky/Jobava", &["d2d4", "g8f6", "c1g5"]),
    ("Nimzo-Indian", &["d2d4", "g8f6", "c2c4", "e7e6", "b1c3", "f8b4"]),
    ("Queen's Indian", &["d2d4", "g8f6", "c2c4", "e7e6", "g1f3", "b7b6"]),
    ("Catalan", &["d2d4", "g8f6", "c2c4", "e7e6", "g2g3"]),
    ("Grünfeld", &["d2d4", "g8f6", "c2c4", "g7g6", "b1c3", "d7d5"]),
    ("King's Indian", &["d2d4", "g8f6", "c2c4", "g7g6"]),
    ("Benoni/Benko", &["d2d4", "g8f6", "c2c4", "c7c5"]),
    ("Dutch Defense", &["d2d4", "f7f5"]),
    ("English Opening", &["c2c4"]),
];

/// "B90" -> 2090; letters A..E weigh 1..5 thousands.
pub fn eco_to_num(eco: &str) -> Option<u32> {
    let b = eco.trim().as_bytes();
    if b.len() != 3 { return None; }
    let letter = (b[0] as char).to_ascii_uppercase();
    let base = "ABCDE".find(letter)? as u32 + 1;
    if !b[1].is_ascii_digit() || !b[2].is_ascii_digit() { return None; }
    Some(base * 1000 + ((b[1] - b'0') as u32) * 10 + (b[2] - b'0') as u32)
}

pub fn family_from_eco(eco: &str) -> Option<&'static str> {
    let n = eco_to_num(eco)?;
    ECO_RANGES.iter()
        .find(|(_, lo, hi)| matches!((eco_to_num(lo), eco_to_num(hi)), (Some(a), Some(b)) if a <= n && n <= b))
        .map(|(fam, _, _)| *fam)
}

pub fn family_from_name(opening: &str) -> Option<&'static str> {
    let lower = opening.to_lowercase();
    NAME_RULES.iter()
        .find(|(keys, _)| keys.iter().any(|k| lower.contains(k)))
        .map(|(_, fam)| *fam)
}

pub fn family_from_eco_or_name(eco: Option<&str>, opening: Option<&str>) -> &'static str {
    eco.and_then(family_from_eco)
        .or_else(|| opening.and_then(family_from_name))
        .unwrap_or(FALLBACK_FAMILY)
}

/// Longest matching characteristic prefix of `moves`.
pub fn family_from_moves(moves: &[String]) -> Option<&'static str> {
    MOVE_PREFIXES.iter()
        .filter(|(_, prefix)| prefix.len() <= moves.len() && prefix.iter().zip(moves).all(|(a, b)| *a == b.as_str()))
        .max_by_key(|(_, prefix)| prefix.len())
        .map(|(fam, _)| *fam)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eco_numbers() {
        assert_eq!(eco_to_num("B90"), Some(2090));
        assert_eq!(eco_to_num("e99"), Some(5099));
        assert_eq!(eco_to_num("F10"), None);
        assert_eq!(eco_to_num("B9"), None);
    }

    #[test]
    fn eco_ranges_pick_narrow_buckets() {
        assert_eq!(family_from_eco("B90"), Some("Sicilian Defense"));
        assert_eq!(family_from_eco("D15"), Some("Slav/Semi-Slav"));
        assert_eq!(family_from_eco("D37"), Some("Queen's Gambit"));
        assert_eq!(family_from_eco("C41"), Some("Philidor Defense"));
        assert_eq!(family_from_eco("A50"), None);
    }

    #[test]
    fn name_fallback_and_default() {
        assert_eq!(family_from_eco_or_name(None, Some("Caro-Kann Defense: Advance")), "Caro-Kann Defense");
        assert_eq!(family_from_eco_or_name(Some("zzz"), Some("Giuoco Piano")), "Italian Game");
        assert_eq!(family_from_eco_or_name(None, Some("Bongcloud Attack")), FALLBACK_FAMILY);
    }

    #[test]
    fn moves_use_longest_prefix() {
        let mv = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(family_from_moves(&mv(&["d2d4", "d7d5", "c2c4", "c7c6", "g1f3"])), Some("Slav/Semi-Slav"));
        assert_eq!(family_from_moves(&mv(&["d2d4", "d7d5", "c2c4", "e7e6"])), Some("Queen's Gambit"));
        assert_eq!(family_from_moves(&mv(&["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6"])), Some("Ruy Lopez"));
        assert_eq!(family_from_moves(&mv(&["g1f3"])), None);
    }
}
