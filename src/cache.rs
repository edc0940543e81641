use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::score::{CandidateLine, Score};

/// Evaluations are only reused for the exact search settings they were computed with.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fen: String,
    pub depth: u32,
    pub lines: u32,
}

impl CacheKey {
    pub fn new(fen: impl Into<String>, depth: u32, lines: u32) -> Self {
        Self { fen: fen.into(), depth, lines }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Score of the top line, relative to the side to move.
    pub score: Option<Score>,
    pub lines: Vec<CandidateLine>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl CacheEntry {
    pub fn new(mut lines: Vec<CandidateLine>) -> Self {
        lines.sort_by_key(|l| l.rank);
        let score = lines.first().map(|l| l.score);
        Self { score, lines, timestamp_ms: now_ms() }
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[derive(Serialize, Deserialize)]
struct Record {
    key: CacheKey,
    entry: CacheEntry,
}

/// In-memory evaluation store. Entries are never evicted; a different depth or
/// line count simply misses.
#[derive(Default, Debug)]
pub struct EvalCache {
    entries: HashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl EvalCache {
    pub fn new() -> Self { Self::default() }

    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        let found = self.entries.get(key);
        if found.is_some() { self.hits += 1; } else { self.misses += 1; }
        found
    }

    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> { self.entries.get(key) }

    pub fn contains(&self, key: &CacheKey) -> bool { self.entries.contains_key(key) }

    /// Same key overwrites.
    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn clear(&mut self) { self.entries.clear(); }

    pub fn stats(&self) -> (u64, u64) { (self.hits, self.misses) }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut records: Vec<Record> = self.entries.iter()
            .map(|(k, e)| Record { key: k.clone(), entry: e.clone() })
            .collect();
        records.sort_by(|a, b| (&a.key.fen, a.key.depth, a.key.lines).cmp(&(&b.key.fen, b.key.depth, b.key.lines)));
        let w = BufWriter::new(File::create(path)?);
        serde_json::to_writer(w, &records)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let r = BufReader::new(File::open(path)?);
        let records: Vec<Record> = serde_json::from_reader(r)?;
        let mut cache = Self::new();
        for rec in records { cache.insert(rec.key, rec.entry); }
        Ok(cache)
    }
}
