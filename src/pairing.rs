use std::collections::{BTreeMap, HashMap};
use std::thread;
use std::time::Duration;

use crate::error::ScanError;
use crate::roster::{Roster, TrackedPlayer};
use crate::source::{MatchDetail, MatchSource, PlayerIdentity};

#[derive(Debug, Clone)]
pub struct TraverseOptions {
    pub page_budget: usize,
    pub rate_limit_pause: Duration,
    // throttle pauses allowed per match before giving up on the player
    pub rate_limit_retries: usize,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            page_budget: 30,
            rate_limit_pause: Duration::from_secs(15),
            rate_limit_retries: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CutoffReached,
    HistoryExhausted,
    // page budget spent, or the match data stopped being trustworthy
    BudgetExceeded,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::CutoffReached => "cutoff reached",
            StopReason::HistoryExhausted => "history exhausted",
            StopReason::BudgetExceeded => "budget exceeded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Traversal {
    pub stop: StopReason,
    pub pages: usize,
    pub inspected: usize,
    pub skipped_custom: usize,
    // co-occurrences recorded by this walk; symmetric records from other
    // players' walks are not counted here
    pub paired: usize,
    pub note: Option<String>,
}

/// Pairing evidence for the whole run. Keys are normalized roster keys;
/// partners map raw nickname -> creation time of the most recent shared
/// match (walks run newest-first, so the first insertion wins).
#[derive(Debug, Clone, Default)]
pub struct PairingBook {
    entries: HashMap<String, BTreeMap<String, i64>>,
}

impl PairingBook {
    // both directions in one step so the book never holds a one-sided pair
    pub fn record(&mut self, a: &TrackedPlayer, b: &TrackedPlayer, seen_ms: i64) {
        self.entries
            .entry(a.key.clone())
            .or_default()
            .entry(b.nickname.clone())
            .or_insert(seen_ms);
        self.entries
            .entry(b.key.clone())
            .or_default()
            .entry(a.nickname.clone())
            .or_insert(seen_ms);
    }

    pub fn partners(&self, key: &str) -> Option<&BTreeMap<String, i64>> {
        self.entries.get(key)
    }

    pub fn has_pairings(&self, key: &str) -> bool {
        self.partners(key).map(|p| !p.is_empty()).unwrap_or(false)
    }
}

/// Walks one player's history newest-first, recording same-team
/// co-occurrences with other roster members into `book`.
pub fn traverse(
    source: &mut dyn MatchSource,
    roster: &Roster,
    subject: &TrackedPlayer,
    identity: &PlayerIdentity,
    cutoff_ms: i64,
    opts: &TraverseOptions,
    book: &mut PairingBook,
) -> Result<Traversal, ScanError> {
    let page_size = source.page_size().max(1);
    let mut out = Traversal {
        stop: StopReason::BudgetExceeded,
        pages: 0,
        inspected: 0,
        skipped_custom: 0,
        paired: 0,
        note: None,
    };

    let mut begin = 0usize;
    loop {
        if out.pages >= opts.page_budget {
            out.note = Some(format!("page budget of {} spent", opts.page_budget));
            return Ok(out);
        }
        let ids = fetch_with_throttle(opts, &format!("history page starting {begin}"), || {
            source.match_page(identity, begin, begin + page_size)
        })?;
        out.pages += 1;
        if ids.is_empty() {
            out.stop = StopReason::HistoryExhausted;
            return Ok(out);
        }

        for match_id in ids {
            let detail = fetch_with_throttle(opts, &format!("match {match_id}"), || {
                source.match_detail(match_id)
            })?;
            // Pages are newest-first: the first match past the cutoff ends
            // the whole walk, not just this entry.
            if detail.creation_ms < cutoff_ms {
                out.stop = StopReason::CutoffReached;
                return Ok(out);
            }
            if detail.is_custom() {
                out.skipped_custom += 1;
                continue;
            }
            out.inspected += 1;
            match scan_match(roster, subject, identity, &detail, book) {
                MatchScan::Paired(count) => out.paired += count,
                MatchScan::Clean => {}
                MatchScan::Unreliable => {
                    out.note = Some(format!(
                        "match {} carries tracked players without a team id",
                        detail.match_id
                    ));
                    return Ok(out);
                }
            }
        }

        begin += page_size;
    }
}

// Absorbs upstream throttling with a long pause, repeating the same fetch
// a bounded number of times. Page and detail fetches both go through here.
fn fetch_with_throttle<T>(
    opts: &TraverseOptions,
    subject: &str,
    mut fetch: impl FnMut() -> Result<T, ScanError>,
) -> Result<T, ScanError> {
    let mut pauses = 0usize;
    loop {
        match fetch() {
            Ok(value) => return Ok(value),
            Err(ScanError::RateLimited) => {
                if pauses >= opts.rate_limit_retries {
                    return Err(ScanError::RateLimitExceeded {
                        subject: subject.to_string(),
                        attempts: pauses,
                    });
                }
                pauses += 1;
                if !opts.rate_limit_pause.is_zero() {
                    thread::sleep(opts.rate_limit_pause);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum MatchScan {
    Paired(usize),
    Clean,
    Unreliable,
}

// Everyone outside the roster is ignored; when a tracked participant's
// team is unknown the document cannot be trusted at all.
fn scan_match(
    roster: &Roster,
    subject: &TrackedPlayer,
    identity: &PlayerIdentity,
    detail: &MatchDetail,
    book: &mut PairingBook,
) -> MatchScan {
    let Some(me) = detail.find_participant(&identity.account_id, &subject.key) else {
        // a renamed subject can drift out of its own document; nothing to
        // pair against
        return MatchScan::Clean;
    };
    let Some(my_team) = me.team_id else {
        return MatchScan::Unreliable;
    };

    let mut recorded = 0usize;
    for participant in &detail.participants {
        if participant.account_id.as_deref() == Some(identity.account_id.as_str()) {
            continue;
        }
        let key = participant.key();
        if key == subject.key {
            continue;
        }
        let Some(partner) = roster.get(&key) else {
            continue;
        };
        let Some(team) = participant.team_id else {
            return MatchScan::Unreliable;
        };
        if team == my_team {
            book.record(subject, partner, detail.creation_ms);
            recorded += 1;
        }
    }
    if recorded > 0 {
        MatchScan::Paired(recorded)
    } else {
        MatchScan::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::parse_roster;
    use crate::source::Participant;

    fn player<'a>(roster: &'a Roster, key: &str) -> &'a TrackedPlayer {
        roster.get(key).unwrap()
    }

    fn detail(id: u64, parts: &[(&str, Option<u32>)]) -> MatchDetail {
        MatchDetail {
            match_id: id,
            creation_ms: 1_000,
            game_type: "MATCHED_GAME".to_string(),
            participants: parts
                .iter()
                .map(|(name, team)| Participant {
                    summoner_name: name.to_string(),
                    account_id: None,
                    team_id: *team,
                })
                .collect(),
        }
    }

    #[test]
    fn book_records_both_directions_at_once() {
        let roster = parse_roster("Alice,3\nBob").unwrap();
        let mut book = PairingBook::default();
        book.record(player(&roster, "alice"), player(&roster, "bob"), 5);
        assert!(book.has_pairings("alice"));
        assert!(book.has_pairings("bob"));
        assert_eq!(book.partners("alice").unwrap().get("Bob"), Some(&5));
        assert_eq!(book.partners("bob").unwrap().get("Alice"), Some(&5));
    }

    #[test]
    fn book_keeps_the_first_seen_timestamp() {
        let roster = parse_roster("Alice\nBob").unwrap();
        let mut book = PairingBook::default();
        book.record(player(&roster, "alice"), player(&roster, "bob"), 9);
        book.record(player(&roster, "bob"), player(&roster, "alice"), 4);
        assert_eq!(book.partners("alice").unwrap().get("Bob"), Some(&9));
        assert_eq!(book.partners("bob").unwrap().get("Alice"), Some(&9));
    }

    #[test]
    fn same_team_tracked_players_pair_up() {
        let roster = parse_roster("Alice\nBob\nCarol").unwrap();
        let mut book = PairingBook::default();
        let identity = PlayerIdentity {
            account_id: "acct-alice".to_string(),
        };
        let doc = detail(
            1,
            &[
                ("Alice", Some(100)),
                ("Bob", Some(100)),
                ("Carol", Some(200)),
                ("Stranger", Some(100)),
            ],
        );
        let scan = scan_match(&roster, player(&roster, "alice"), &identity, &doc, &mut book);
        assert_eq!(scan, MatchScan::Paired(1));
        assert!(book.has_pairings("bob"));
        assert!(!book.has_pairings("carol"));
        assert!(!book.has_pairings("stranger"));
    }

    #[test]
    fn opposite_teams_do_not_pair() {
        let roster = parse_roster("Alice\nBob").unwrap();
        let mut book = PairingBook::default();
        let identity = PlayerIdentity {
            account_id: "acct-alice".to_string(),
        };
        let doc = detail(2, &[("Alice", Some(100)), ("Bob", Some(200))]);
        let scan = scan_match(&roster, player(&roster, "alice"), &identity, &doc, &mut book);
        assert_eq!(scan, MatchScan::Clean);
        assert!(!book.has_pairings("alice"));
        assert!(!book.has_pairings("bob"));
    }

    #[test]
    fn missing_team_on_a_tracked_partner_is_unreliable() {
        let roster = parse_roster("Alice\nBob").unwrap();
        let mut book = PairingBook::default();
        let identity = PlayerIdentity {
            account_id: "acct-alice".to_string(),
        };
        let doc = detail(3, &[("Alice", Some(100)), ("Bob", None)]);
        let scan = scan_match(&roster, player(&roster, "alice"), &identity, &doc, &mut book);
        assert_eq!(scan, MatchScan::Unreliable);

        let doc = detail(4, &[("Alice", None), ("Bob", Some(100))]);
        let scan = scan_match(&roster, player(&roster, "alice"), &identity, &doc, &mut book);
        assert_eq!(scan, MatchScan::Unreliable);
    }

    #[test]
    fn a_subject_missing_from_its_own_document_pairs_nothing() {
        let roster = parse_roster("Alice\nBob").unwrap();
        let mut book = PairingBook::default();
        let identity = PlayerIdentity {
            account_id: "acct-alice".to_string(),
        };
        let doc = detail(5, &[("Bob", Some(100)), ("Stranger", None)]);
        let scan = scan_match(&roster, player(&roster, "alice"), &identity, &doc, &mut book);
        assert_eq!(scan, MatchScan::Clean);
        assert!(!book.has_pairings("alice"));
    }
}
