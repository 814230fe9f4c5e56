use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier assigned to a player by the upstream provider.
/// Never changes once assigned; storage is keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical roster entry as persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub external_id: PlayerId,
    /// Alternate identifier from a different data source (e.g. GSIS).
    pub secondary_id: Option<String>,
    pub full_name: String,
    pub position: Option<String>,
    pub team: Option<String>,
    /// Tri-state: `None` means the provider did not say.
    pub active: Option<bool>,
}

/// A player record as handed over by a feed, before validation.
///
/// Every field is optional; `normalize` decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPlayer {
    pub external_id: Option<String>,
    pub secondary_id: Option<String>,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub active: Option<bool>,
    /// Set when the feed could not decode this entry at all.
    pub decode_error: Option<String>,
}

/// A single record could not be mapped to a `Player`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("record has no external identifier")]
    MissingId,

    #[error("record could not be decoded: {0}")]
    Malformed(String),
}

impl RawPlayer {
    /// A placeholder for an entry the feed failed to decode.
    ///
    /// It always fails `normalize`, so the batch keeps going and the entry
    /// is counted as skipped.
    pub fn undecodable(external_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            external_id,
            decode_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Map the raw record to the canonical shape.
    ///
    /// Strings are trimmed and blanks dropped, position and team codes are
    /// upper-cased, and the full name falls back to first + last name.
    pub fn normalize(self) -> Result<Player, ValidationError> {
        if let Some(reason) = self.decode_error {
            return Err(ValidationError::Malformed(reason));
        }
        let external_id = clean(self.external_id).ok_or(ValidationError::MissingId)?;

        let full_name = match clean(self.full_name) {
            Some(name) => name,
            None => [clean(self.first_name), clean(self.last_name)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        };

        Ok(Player {
            external_id: PlayerId::new(external_id),
            secondary_id: clean(self.secondary_id),
            full_name,
            position: clean(self.position).map(|p| p.to_uppercase()),
            team: clean(self.team).map(|t| t.to_uppercase()),
            active: self.active,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
