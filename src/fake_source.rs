use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::error::ScanError;
use crate::roster::{Roster, TrackedPlayer, normalized_key};
use crate::source::{CUSTOM_GAME, MatchDetail, MatchSource, Participant, PlayerIdentity};

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub resolves: usize,
    pub pages: usize,
    pub details: usize,
}

/// In-memory stand-in for the upstream APIs; drives `--offline` runs, the
/// engine tests, and the bench.
pub struct FakeSource {
    page_size: usize,
    identities: HashMap<String, PlayerIdentity>,
    histories: HashMap<String, Vec<u64>>,
    matches: HashMap<u64, MatchDetail>,
    throttle: HashMap<u64, usize>,
    page_throttle: usize,
    broken: HashSet<u64>,
    broken_resolves: HashSet<String>,
    pub calls: CallCounts,
}

impl FakeSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            identities: HashMap::new(),
            histories: HashMap::new(),
            matches: HashMap::new(),
            throttle: HashMap::new(),
            page_throttle: 0,
            broken: HashSet::new(),
            broken_resolves: HashSet::new(),
            calls: CallCounts::default(),
        }
    }

    pub fn add_player(&mut self, nickname: &str, account_id: &str) {
        self.identities.insert(
            normalized_key(nickname),
            PlayerIdentity {
                account_id: account_id.to_string(),
            },
        );
        self.histories.entry(account_id.to_string()).or_default();
    }

    // pages are served newest-first regardless of insertion order
    pub fn insert_match(&mut self, detail: MatchDetail) {
        for participant in &detail.participants {
            if let Some(account) = &participant.account_id {
                if let Some(history) = self.histories.get_mut(account) {
                    history.push(detail.match_id);
                }
            }
        }
        self.matches.insert(detail.match_id, detail);
    }

    // next `times` detail fetches of this match come back throttled
    pub fn throttle_match(&mut self, match_id: u64, times: usize) {
        self.throttle.insert(match_id, times);
    }

    // next `times` page fetches come back throttled, whoever asks
    pub fn throttle_pages(&mut self, times: usize) {
        self.page_throttle = times;
    }

    pub fn break_match(&mut self, match_id: u64) {
        self.broken.insert(match_id);
    }

    // resolving this nickname fails as a network error, not an unknown player
    pub fn break_resolve(&mut self, nickname: &str) {
        self.broken_resolves.insert(normalized_key(nickname));
    }

    /// Randomized plausible histories for a roster: some shared recent
    /// games, a few customs, and a pre-cutoff tail so walks end on the
    /// cutoff.
    pub fn seeded(roster: &Roster, cutoff_ms: i64) -> Self {
        let mut rng = rand::thread_rng();
        let mut source = Self::new(10);
        let players = roster.players();
        for (idx, player) in players.iter().enumerate() {
            source.add_player(&player.nickname, &format!("fake-acct-{idx}"));
        }

        let mut next_id = 4_000_000_000u64;
        for (idx, player) in players.iter().enumerate() {
            let games = rng.gen_range(4..9);
            for _ in 0..games {
                let creation =
                    cutoff_ms + rng.gen_range(1..6) * DAY_MS + rng.gen_range(0..DAY_MS);
                let mut blue = vec![tracked(player, &format!("fake-acct-{idx}"), 100)];
                let mut red = Vec::new();
                if players.len() > 1 && rng.gen_bool(0.35) {
                    let mut other = rng.gen_range(0..players.len());
                    if other == idx {
                        other = (other + 1) % players.len();
                    }
                    let partner = tracked(
                        &players[other],
                        &format!("fake-acct-{other}"),
                        if rng.gen_bool(0.7) { 100 } else { 200 },
                    );
                    if partner.team_id == Some(100) {
                        blue.push(partner);
                    } else {
                        red.push(partner);
                    }
                }
                fill_team(&mut blue, 100, next_id);
                fill_team(&mut red, 200, next_id);
                blue.append(&mut red);
                let game_type = if rng.gen_bool(0.15) {
                    CUSTOM_GAME
                } else {
                    "MATCHED_GAME"
                };
                source.insert_match(MatchDetail {
                    match_id: next_id,
                    creation_ms: creation,
                    game_type: game_type.to_string(),
                    participants: blue,
                });
                next_id += 1;
            }

            let mut old = vec![tracked(player, &format!("fake-acct-{idx}"), 100)];
            fill_team(&mut old, 100, next_id);
            source.insert_match(MatchDetail {
                match_id: next_id,
                creation_ms: cutoff_ms - rng.gen_range(1..20) * DAY_MS,
                game_type: "MATCHED_GAME".to_string(),
                participants: old,
            });
            next_id += 1;
        }
        source
    }
}

impl MatchSource for FakeSource {
    fn label(&self) -> &'static str {
        "fake"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn resolve(&mut self, nickname: &str) -> Result<PlayerIdentity, ScanError> {
        self.calls.resolves += 1;
        if self.broken_resolves.contains(&normalized_key(nickname)) {
            return Err(ScanError::TransientNetwork("scripted failure".to_string()));
        }
        self.identities
            .get(&normalized_key(nickname))
            .cloned()
            .ok_or_else(|| ScanError::UnknownPlayer {
                nickname: nickname.to_string(),
            })
    }

    fn match_page(
        &mut self,
        identity: &PlayerIdentity,
        begin: usize,
        end: usize,
    ) -> Result<Vec<u64>, ScanError> {
        self.calls.pages += 1;
        if self.page_throttle > 0 {
            self.page_throttle -= 1;
            return Err(ScanError::RateLimited);
        }
        let mut ids = self
            .histories
            .get(&identity.account_id)
            .cloned()
            .unwrap_or_default();
        ids.sort_by_key(|id| {
            std::cmp::Reverse(self.matches.get(id).map(|m| m.creation_ms).unwrap_or(0))
        });
        Ok(ids
            .into_iter()
            .skip(begin)
            .take(end.saturating_sub(begin))
            .collect())
    }

    fn match_detail(&mut self, match_id: u64) -> Result<MatchDetail, ScanError> {
        self.calls.details += 1;
        if let Some(remaining) = self.throttle.get_mut(&match_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScanError::RateLimited);
            }
        }
        if self.broken.contains(&match_id) {
            return Err(ScanError::MalformedMatch {
                match_id,
                reason: "scripted failure".to_string(),
            });
        }
        self.matches
            .get(&match_id)
            .cloned()
            .ok_or_else(|| ScanError::MalformedMatch {
                match_id,
                reason: "not found".to_string(),
            })
    }
}

fn tracked(player: &TrackedPlayer, account: &str, team: u32) -> Participant {
    Participant {
        summoner_name: player.nickname.clone(),
        account_id: Some(account.to_string()),
        team_id: Some(team),
    }
}

fn fill_team(side: &mut Vec<Participant>, team: u32, salt: u64) {
    while side.len() < 5 {
        side.push(Participant {
            summoner_name: format!("Filler {team} {salt} {}", side.len()),
            account_id: None,
            team_id: Some(team),
        });
    }
}
