use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScanError;

const CACHE_DIR: &str = "duoscan";

/// Flat file-per-key store. Entries are written once and never expired:
/// match documents are immutable upstream and identity lookups are stable
/// enough that staleness is accepted.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    // SCAN_CACHE_DIR, then the user cache dir, then ./cache
    pub fn open_default() -> Self {
        if let Ok(dir) = std::env::var("SCAN_CACHE_DIR") {
            if !dir.trim().is_empty() {
                return Self::new(dir);
            }
        }
        match user_cache_dir() {
            Some(dir) => Self::new(dir),
            None => Self::new("cache"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Absent when missing, unreadable, or empty; callers treat absence
    // exactly like a fetch miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = fs::read_to_string(self.dir.join(key)).ok()?;
        if raw.trim().is_empty() {
            return None;
        }
        Some(raw)
    }

    // overwrite through a temp file so a reader never sees a partial entry
    pub fn set(&self, key: &str, value: &str) -> Result<(), ScanError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(key);
        let tmp = self.dir.join(format!("{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

pub fn account_key(nickname: &str) -> String {
    format!("accountid_{nickname}")
}

pub fn summoner_key(nickname: &str) -> String {
    format!("summonerInfo_{nickname}")
}

pub fn match_key(match_id: u64) -> String {
    format!("gameid_{match_id}")
}

fn user_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duoscan_{}_{}", name, std::process::id()))
    }

    #[test]
    fn round_trips_across_instances() {
        let dir = scratch("roundtrip");
        let store = CacheStore::new(&dir);
        store.set(&account_key("Faker"), "12345").unwrap();
        let again = CacheStore::new(&dir);
        assert_eq!(again.get(&account_key("Faker")).as_deref(), Some("12345"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_and_empty_entries_are_absent() {
        let dir = scratch("absent");
        let store = CacheStore::new(&dir);
        assert!(store.get(&match_key(1)).is_none());
        store.set(&match_key(1), "").unwrap();
        assert!(store.get(&match_key(1)).is_none());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn set_overwrites_existing_value() {
        let dir = scratch("overwrite");
        let store = CacheStore::new(&dir);
        store.set("k", "old").unwrap();
        store.set("k", "new").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("new"));
        fs::remove_dir_all(&dir).ok();
    }
}
