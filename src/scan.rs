use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveTime};

use crate::acs_fetch::AcsSource;
use crate::cache_store::CacheStore;
use crate::error::ScanError;
use crate::pairing::{self, PairingBook, Traversal, TraverseOptions};
use crate::riot_fetch::RiotSource;
use crate::roster::Roster;
use crate::source::{MatchSource, PlayerIdentity};

pub const MAX_CUTOFF_AGE_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Acs,
    MatchV4,
}

impl ApiKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "acs" | "legacy" => Some(Self::Acs),
            "matchv4" | "v4" | "riot" => Some(Self::MatchV4),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("SCAN_API")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Self::Acs)
    }
}

// What to do when a roster nickname has no account upstream. Fail aborts
// the run (a typo silently shrinking the roster corrupts the result); Skip
// records the player as skipped and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownPolicy {
    Fail,
    Skip,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub traverse: TraverseOptions,
    pub on_unknown: UnknownPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            traverse: TraverseOptions::default(),
            on_unknown: UnknownPolicy::Fail,
        }
    }
}

impl ScanOptions {
    pub fn from_env() -> Self {
        let defaults = TraverseOptions::default();
        let page_budget = env_usize("SCAN_PAGE_BUDGET", defaults.page_budget).clamp(1, 1000);
        let pause_secs =
            env_u64("SCAN_RATE_LIMIT_PAUSE_SECS", defaults.rate_limit_pause.as_secs()).min(300);
        let retries = env_usize("SCAN_RATE_LIMIT_RETRIES", defaults.rate_limit_retries).clamp(1, 50);
        let on_unknown = match std::env::var("SCAN_ON_UNKNOWN")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "skip" => UnknownPolicy::Skip,
            _ => UnknownPolicy::Fail,
        };
        Self {
            traverse: TraverseOptions {
                page_budget,
                rate_limit_pause: Duration::from_secs(pause_secs),
                rate_limit_retries: retries,
            },
            on_unknown,
        }
    }
}

pub struct ScanProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum PlayerScanResult {
    Traversed(Traversal),
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct PlayerScan {
    pub nickname: String,
    pub key: String,
    pub result: PlayerScanResult,
}

#[derive(Debug)]
pub struct ScanSummary {
    pub cutoff_ms: i64,
    pub rows: Vec<PlayerScan>,
    pub book: PairingBook,
}

// Midnight UTC of the given date, epoch millis; gameCreation stamps are UTC.
pub fn cutoff_epoch_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

// Future dates and dates past the window are both rejected; the upstream
// archive is only dependable inside it.
pub fn validate_cutoff(date: NaiveDate) -> Result<i64, ScanError> {
    let today = Local::now().date_naive();
    let age = today.signed_duration_since(date).num_days();
    if !(0..=MAX_CUTOFF_AGE_DAYS).contains(&age) {
        return Err(ScanError::InvalidCutoff {
            date: date.format("%Y-%m-%d").to_string(),
            max_days: MAX_CUTOFF_AGE_DAYS,
        });
    }
    Ok(cutoff_epoch_ms(date))
}

pub fn build_source(kind: ApiKind, cache: CacheStore) -> Result<Box<dyn MatchSource>> {
    Ok(match kind {
        ApiKind::Acs => Box::new(AcsSource::from_env(cache)?),
        ApiKind::MatchV4 => Box::new(RiotSource::from_env(cache)?),
    })
}

enum Resolution {
    Resolved(PlayerIdentity),
    Skipped,
    Failed(String),
}

/// Runs the whole roster: validation, an up-front identity pass, then one
/// history walk per player into a shared pairing book. A player's failure,
/// resolving or traversing, becomes that player's diagnostic row; the rest
/// of the roster still runs. Only an unknown nickname under the strict
/// policy aborts the run.
pub fn run_scan(
    source: &mut dyn MatchSource,
    roster: &Roster,
    cutoff: NaiveDate,
    opts: &ScanOptions,
    mut on_progress: impl FnMut(ScanProgress),
) -> Result<ScanSummary, ScanError> {
    // both checks come before the source is touched
    if roster.len() < 2 {
        return Err(ScanError::InsufficientRoster {
            count: roster.len(),
        });
    }
    let cutoff_ms = validate_cutoff(cutoff)?;

    let total = roster.len();
    let mut resolutions: Vec<Resolution> = Vec::with_capacity(total);
    for (idx, player) in roster.players().iter().enumerate() {
        match source.resolve(&player.nickname) {
            Ok(identity) => {
                on_progress(ScanProgress {
                    current: idx + 1,
                    total,
                    message: format!("resolved {}", player.nickname),
                });
                resolutions.push(Resolution::Resolved(identity));
            }
            // an unresolvable nickname follows the configured policy
            Err(ScanError::UnknownPlayer { nickname })
                if opts.on_unknown == UnknownPolicy::Skip =>
            {
                on_progress(ScanProgress {
                    current: idx + 1,
                    total,
                    message: format!("no account for {nickname}, skipping"),
                });
                resolutions.push(Resolution::Skipped);
            }
            Err(err @ ScanError::UnknownPlayer { .. }) => return Err(err),
            // anything else costs only this player's row; the rest of the
            // roster still runs
            Err(err) => {
                on_progress(ScanProgress {
                    current: idx + 1,
                    total,
                    message: format!("{} failed to resolve: {err}", player.nickname),
                });
                resolutions.push(Resolution::Failed(err.to_string()));
            }
        }
    }

    let mut book = PairingBook::default();
    let mut rows = Vec::with_capacity(total);
    for (idx, player) in roster.players().iter().enumerate() {
        let result = match &resolutions[idx] {
            Resolution::Skipped => PlayerScanResult::Skipped("no account found".to_string()),
            Resolution::Failed(reason) => PlayerScanResult::Failed(reason.clone()),
            Resolution::Resolved(identity) => {
                match pairing::traverse(
                    source,
                    roster,
                    player,
                    identity,
                    cutoff_ms,
                    &opts.traverse,
                    &mut book,
                ) {
                    Ok(traversal) => {
                        on_progress(ScanProgress {
                            current: idx + 1,
                            total,
                            message: format!(
                                "{}: {} after {} pages, {} matches",
                                player.nickname,
                                traversal.stop.label(),
                                traversal.pages,
                                traversal.inspected
                            ),
                        });
                        PlayerScanResult::Traversed(traversal)
                    }
                    Err(err) => {
                        on_progress(ScanProgress {
                            current: idx + 1,
                            total,
                            message: format!("{} failed: {err}", player.nickname),
                        });
                        PlayerScanResult::Failed(err.to_string())
                    }
                }
            }
        };
        rows.push(PlayerScan {
            nickname: player.nickname.clone(),
            key: player.key.clone(),
            result,
        });
    }

    Ok(ScanSummary {
        cutoff_ms,
        rows,
        book,
    })
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
