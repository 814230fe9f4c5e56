use roster::RawPlayer;
use serde::Deserialize;

/// One entry of the `/players/{sport}` response.
///
/// The endpoint returns an object keyed by player id; only the fields the
/// roster needs are decoded and the rest are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleeperPlayer {
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub gsis_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl SleeperPlayer {
    /// Convert to a feed record, using `key` when the body has no id.
    pub fn into_raw(self, key: &str) -> RawPlayer {
        let external_id = self
            .player_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| Some(key.to_owned()));

        RawPlayer {
            external_id,
            secondary_id: self.gsis_id,
            full_name: self.full_name,
            first_name: self.first_name,
            last_name: self.last_name,
            position: self.position,
            team: self.team,
            active: self.active,
            decode_error: None,
        }
    }
}
