use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ScanError;
use crate::source::{MatchDetail, Participant};

// Classic match document, shared by both API generations. Only the fields
// the pairing walk needs; everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
struct MatchDoc {
    #[serde(rename = "gameId", default)]
    game_id: u64,
    #[serde(rename = "gameCreation", default)]
    game_creation: i64,
    #[serde(rename = "gameType", default)]
    game_type: String,
    #[serde(default)]
    participants: Vec<DocParticipant>,
    #[serde(rename = "participantIdentities", default)]
    participant_identities: Vec<DocIdentity>,
}

#[derive(Debug, Deserialize)]
struct DocParticipant {
    #[serde(rename = "participantId", default)]
    participant_id: u32,
    #[serde(rename = "teamId")]
    team_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DocIdentity {
    #[serde(rename = "participantId", default)]
    participant_id: u32,
    #[serde(default)]
    player: DocPlayer,
}

#[derive(Debug, Deserialize, Default)]
struct DocPlayer {
    #[serde(rename = "summonerName", default)]
    summoner_name: String,
    #[serde(rename = "accountId", default)]
    account_id: Option<Value>,
    #[serde(rename = "currentAccountId", default)]
    current_account_id: Option<Value>,
}

pub fn parse_match_json(match_id: u64, raw: &str) -> Result<MatchDetail, ScanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(malformed(match_id, "empty document"));
    }
    let doc: MatchDoc = serde_json::from_str(trimmed)
        .map_err(|err| malformed(match_id, &format!("invalid json: {err}")))?;
    if doc.game_creation <= 0 {
        return Err(malformed(match_id, "missing gameCreation"));
    }
    if doc.participant_identities.is_empty() {
        return Err(malformed(match_id, "missing participantIdentities"));
    }

    // Team membership lives on the participant list; identities carry the
    // names. Join the two on participant id.
    let teams: HashMap<u32, Option<u32>> = doc
        .participants
        .iter()
        .map(|p| (p.participant_id, p.team_id))
        .collect();
    let participants = doc
        .participant_identities
        .iter()
        .map(|ident| Participant {
            summoner_name: ident.player.summoner_name.trim().to_string(),
            account_id: ident
                .player
                .account_id
                .as_ref()
                .and_then(id_string)
                .or_else(|| ident.player.current_account_id.as_ref().and_then(id_string)),
            team_id: teams.get(&ident.participant_id).copied().flatten(),
        })
        .collect();

    Ok(MatchDetail {
        match_id: if doc.game_id != 0 { doc.game_id } else { match_id },
        creation_ms: doc.game_creation,
        game_type: doc.game_type,
        participants,
    })
}

// Account ids are numbers on the legacy API and opaque strings on the
// modern one.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn as_u64_any(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn malformed(match_id: u64, reason: &str) -> ScanError {
    ScanError::MalformedMatch {
        match_id,
        reason: reason.to_string(),
    }
}
