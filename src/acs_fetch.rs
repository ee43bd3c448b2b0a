use std::thread;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::api_client::{Auth, call_delay_from_env, get_json, http_client};
use crate::cache_store::{self, CacheStore};
use crate::error::ScanError;
use crate::match_doc::{as_u64_any, id_string, parse_match_json};
use crate::source::{MatchDetail, MatchSource, PlayerIdentity};

const ACS_BASE_URL: &str = "https://acs.leagueoflegends.com/v1";
const ACS_PAGE_SIZE: usize = 10;

/// Legacy match-history generation: id_token cookie auth, ten games per
/// page, pages arriving ascending by creation so each is reversed before
/// the traversal sees it.
pub struct AcsSource {
    auth: Auth,
    region: String,
    cache: CacheStore,
    pace: Duration,
}

impl AcsSource {
    pub fn new(id_token: String, region: String, cache: CacheStore, pace: Duration) -> Self {
        Self {
            auth: Auth::Cookie(id_token),
            region,
            cache,
            pace,
        }
    }

    pub fn from_env(cache: CacheStore) -> Result<Self> {
        let token = env_str("ACS_ID_TOKEN");
        if token.is_empty() {
            anyhow::bail!("ACS_ID_TOKEN is not set (the id_token cookie value)");
        }
        let region = match env_str("REGION") {
            r if r.is_empty() => "KR".to_string(),
            r => r.to_uppercase(),
        };
        Ok(Self::new(token, region, cache, call_delay_from_env()))
    }

    fn pace(&self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }
}

impl MatchSource for AcsSource {
    fn label(&self) -> &'static str {
        "acs"
    }

    fn page_size(&self) -> usize {
        ACS_PAGE_SIZE
    }

    fn resolve(&mut self, nickname: &str) -> Result<PlayerIdentity, ScanError> {
        let key = cache_store::account_key(nickname);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(PlayerIdentity {
                account_id: cached.trim().to_string(),
            });
        }

        let client = http_client()?;
        let url = format!("{ACS_BASE_URL}/players/");
        let query = [
            ("name", nickname.to_string()),
            ("region", self.region.clone()),
        ];
        let body = get_json(client, &url, &query, &self.auth)?;
        self.pace();
        let Some(body) = body else {
            return Err(ScanError::UnknownPlayer {
                nickname: nickname.to_string(),
            });
        };
        let account_id =
            parse_account_id_json(&body).ok_or_else(|| ScanError::UnknownPlayer {
                nickname: nickname.to_string(),
            })?;
        self.cache.set(&key, &account_id)?;
        Ok(PlayerIdentity { account_id })
    }

    fn match_page(
        &mut self,
        identity: &PlayerIdentity,
        begin: usize,
        end: usize,
    ) -> Result<Vec<u64>, ScanError> {
        let client = http_client()?;
        let url = format!(
            "{ACS_BASE_URL}/stats/player_history/{}/{}",
            self.region, identity.account_id
        );
        let query = [
            ("begIndex", begin.to_string()),
            ("endIndex", end.to_string()),
        ];
        let body = get_json(client, &url, &query, &self.auth)?;
        self.pace();
        match body {
            Some(body) => Ok(parse_history_page_json(&body)),
            None => Ok(Vec::new()),
        }
    }

    fn match_detail(&mut self, match_id: u64) -> Result<MatchDetail, ScanError> {
        let key = cache_store::match_key(match_id);
        if let Some(cached) = self.cache.get(&key) {
            if let Ok(detail) = parse_match_json(match_id, &cached) {
                return Ok(detail);
            }
            // an unreadable entry counts as a miss and gets refetched
        }

        let client = http_client()?;
        let url = format!("{ACS_BASE_URL}/stats/game/{}/{match_id}", self.region);
        let body = get_json(client, &url, &[], &self.auth)?;
        self.pace();
        let Some(body) = body else {
            return Err(ScanError::MalformedMatch {
                match_id,
                reason: "not found".to_string(),
            });
        };
        self.cache.set(&key, &body)?;
        parse_match_json(match_id, &body)
    }
}

pub fn parse_account_id_json(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    value.get("accountId").and_then(id_string)
}

// The wire order within a page is oldest-first; flip to most-recent-first.
pub fn parse_history_page_json(raw: &str) -> Vec<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Vec::new();
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Vec::new();
    };
    let Some(games) = value
        .get("games")
        .and_then(|v| v.get("games"))
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };
    let mut ids: Vec<u64> = games
        .iter()
        .filter_map(|g| g.get("gameId").and_then(as_u64_any))
        .collect();
    ids.reverse();
    ids
}

fn env_str(name: &str) -> String {
    std::env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}
