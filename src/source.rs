use crate::error::ScanError;
use crate::roster::normalized_key;

pub const CUSTOM_GAME: &str = "CUSTOM_GAME";

// Stable opaque identifier a player's match history is keyed on. Both API
// generations expose one, under different field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub summoner_name: String,
    pub account_id: Option<String>,
    // None when the document does not let the team join complete
    pub team_id: Option<u32>,
}

impl Participant {
    pub fn key(&self) -> String {
        normalized_key(&self.summoner_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDetail {
    pub match_id: u64,
    // epoch milliseconds UTC
    pub creation_ms: i64,
    pub game_type: String,
    pub participants: Vec<Participant>,
}

impl MatchDetail {
    pub fn is_custom(&self) -> bool {
        self.game_type == CUSTOM_GAME
    }

    // account id match first, then normalized name
    pub fn find_participant(&self, account_id: &str, key: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.account_id.as_deref() == Some(account_id))
            .or_else(|| self.participants.iter().find(|p| p.key() == key))
    }
}

/// Upstream seam; one implementation per API generation plus an in-memory
/// fake. `match_page` must hand back ids most-recent-first within the page,
/// pages advancing toward older games as `begin` grows; the traversal's
/// cutoff early-exit depends on that ordering.
pub trait MatchSource {
    fn label(&self) -> &'static str;

    fn page_size(&self) -> usize;

    fn resolve(&mut self, nickname: &str) -> Result<PlayerIdentity, ScanError>;

    fn match_page(
        &mut self,
        identity: &PlayerIdentity,
        begin: usize,
        end: usize,
    ) -> Result<Vec<u64>, ScanError>;

    fn match_detail(&mut self, match_id: u64) -> Result<MatchDetail, ScanError>;
}
