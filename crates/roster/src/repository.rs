use std::sync::Arc;

use crate::player::{Player, PlayerId};

/// Errors surfaced by a player repository.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("player not found: {0}")]
    NotFound(PlayerId),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),
}

/// Persistence for player records, keyed by external id.
///
/// `save` is an upsert: it inserts a missing row and overwrites an existing
/// one, so at most one row exists per id.
#[async_trait::async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn save(&self, player: &Player) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &PlayerId) -> Result<Player, StorageError>;

    /// All stored players, ordered by external id.
    async fn find_all(&self) -> Result<Vec<Player>, StorageError>;
}

#[async_trait::async_trait]
impl<T: PlayerRepository + ?Sized> PlayerRepository for Arc<T> {
    async fn save(&self, player: &Player) -> Result<(), StorageError> {
        (**self).save(player).await
    }

    async fn find_by_id(&self, id: &PlayerId) -> Result<Player, StorageError> {
        (**self).find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Player>, StorageError> {
        (**self).find_all().await
    }
}
