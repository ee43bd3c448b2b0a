use std::thread;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::api_client::{Auth, call_delay_from_env, get_json, http_client};
use crate::cache_store::{self, CacheStore};
use crate::error::ScanError;
use crate::match_doc::{as_u64_any, id_string, parse_match_json};
use crate::source::{MatchDetail, MatchSource, PlayerIdentity};

const RIOT_PAGE_SIZE: usize = 100;

/// Modern match-v4 generation: X-Riot-Token auth, a hundred ids per page,
/// wire order already most-recent-first.
pub struct RiotSource {
    auth: Auth,
    host: String,
    cache: CacheStore,
    pace: Duration,
}

impl RiotSource {
    pub fn new(api_key: String, platform: String, cache: CacheStore, pace: Duration) -> Self {
        Self {
            auth: Auth::ApiKey(api_key),
            host: format!("https://{platform}.api.riotgames.com"),
            cache,
            pace,
        }
    }

    pub fn from_env(cache: CacheStore) -> Result<Self> {
        let key = env_str("RIOT_API_KEY");
        if key.is_empty() {
            anyhow::bail!("RIOT_API_KEY is not set");
        }
        let platform = match env_str("RIOT_PLATFORM") {
            p if p.is_empty() => "kr".to_string(),
            p => p.to_lowercase(),
        };
        Ok(Self::new(key, platform, cache, call_delay_from_env()))
    }

    fn pace(&self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }

    // Summoner names go into a path segment and may carry spaces or
    // non-ASCII, so the path is percent-encoded through the url parser.
    fn summoner_url(&self, nickname: &str) -> Result<String, ScanError> {
        let mut url = reqwest::Url::parse(&self.host)
            .map_err(|err| ScanError::TransientNetwork(format!("bad api host: {err}")))?;
        url.set_path(&format!("/lol/summoner/v4/summoners/by-name/{nickname}"));
        Ok(url.to_string())
    }
}

impl MatchSource for RiotSource {
    fn label(&self) -> &'static str {
        "matchv4"
    }

    fn page_size(&self) -> usize {
        RIOT_PAGE_SIZE
    }

    fn resolve(&mut self, nickname: &str) -> Result<PlayerIdentity, ScanError> {
        let key = cache_store::summoner_key(nickname);
        if let Some(cached) = self.cache.get(&key) {
            if let Some(account_id) = parse_summoner_json(&cached) {
                return Ok(PlayerIdentity { account_id });
            }
        }

        let client = http_client()?;
        let url = self.summoner_url(nickname)?;
        let body = get_json(client, &url, &[], &self.auth)?;
        self.pace();
        let Some(body) = body else {
            return Err(ScanError::UnknownPlayer {
                nickname: nickname.to_string(),
            });
        };
        let account_id = parse_summoner_json(&body).ok_or_else(|| ScanError::UnknownPlayer {
            nickname: nickname.to_string(),
        })?;
        self.cache.set(&key, &body)?;
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
            "{}/lol/match/v4/matchlists/by-account/{}",
            self.host, identity.account_id
        );
        let query = [
            ("beginIndex", begin.to_string()),
            ("endIndex", end.to_string()),
        ];
        let body = get_json(client, &url, &query, &self.auth)?;
        self.pace();
        // 404 past the end of history is a normal empty page
        match body {
            Some(body) => Ok(parse_matchlist_json(&body)),
            None => Ok(Vec::new()),
        }
    }

    fn match_detail(&mut self, match_id: u64) -> Result<MatchDetail, ScanError> {
        let key = cache_store::match_key(match_id);
        if let Some(cached) = self.cache.get(&key) {
            if let Ok(detail) = parse_match_json(match_id, &cached) {
                return Ok(detail);
            }
        }

        let client = http_client()?;
        let url = format!("{}/lol/match/v4/matches/{match_id}", self.host);
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

pub fn parse_summoner_json(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    value.get("accountId").and_then(id_string)
}

pub fn parse_matchlist_json(raw: &str) -> Vec<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Vec::new();
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Vec::new();
    };
    let Some(matches) = value.get("matches").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    matches
        .iter()
        .filter_map(|m| m.get("gameId").and_then(as_u64_any))
        .collect()
}

fn env_str(name: &str) -> String {
    std::env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}
