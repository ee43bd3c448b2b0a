use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ScanError;

pub const DEFAULT_ROSTER_FILE: &str = "nicknames.txt";

// key is the nickname lowercased with all whitespace stripped, so display
// variants like "Hide on bush" and "HideOnBush" collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPlayer {
    pub nickname: String,
    pub key: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<TrackedPlayer>,
    by_key: HashMap<String, usize>,
}

impl Roster {
    pub fn players(&self) -> &[TrackedPlayer] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TrackedPlayer> {
        self.by_key.get(key).map(|idx| &self.players[*idx])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn weight_of(&self, key: &str) -> u32 {
        self.get(key).map(|p| p.weight).unwrap_or(1)
    }
}

pub fn normalized_key(nickname: &str) -> String {
    nickname
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

// One `nickname` or `nickname,weight` per line. Duplicate normalized keys
// keep the first occurrence; a weight that does not parse falls back to 1
// since roster files are hand-maintained.
pub fn parse_roster(raw: &str) -> Result<Roster, ScanError> {
    let mut roster = Roster::default();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, weight) = match line.split_once(',') {
            Some((name, w)) => (name.trim(), w.trim().parse::<u32>().unwrap_or(1)),
            None => (line, 1),
        };
        if name.is_empty() {
            continue;
        }
        let key = normalized_key(name);
        if roster.by_key.contains_key(&key) {
            continue;
        }
        roster.by_key.insert(key.clone(), roster.players.len());
        roster.players.push(TrackedPlayer {
            nickname: name.to_string(),
            key,
            weight,
        });
    }
    if roster.players.len() < 2 {
        return Err(ScanError::InsufficientRoster {
            count: roster.players.len(),
        });
    }
    Ok(roster)
}

pub fn load_roster(path: &Path) -> Result<Roster, ScanError> {
    let raw = fs::read_to_string(path)?;
    parse_roster(&raw)
}
