use anyhow::{Result, bail};
use roster::{PlayerId, PlayerRepository, StorageError};

use super::format;

pub async fn run(repo: &dyn PlayerRepository, id: &str) -> Result<()> {
    let player = match repo.find_by_id(&PlayerId::new(id.trim())).await {
        Ok(player) => player,
        Err(StorageError::NotFound(_)) => bail!("Player not found: {id}"),
        Err(e) => return Err(e.into()),
    };

    println!("ID:        {}", player.external_id);
    println!("Name:      {}", player.full_name);
    println!("Position:  {}", player.position.as_deref().unwrap_or("-"));
    println!("Team:      {}", player.team.as_deref().unwrap_or("FA"));
    println!("Active:    {}", format::active_label(player.active));
    if let Some(gsis) = &player.secondary_id {
        println!("GSIS ID:   {gsis}");
    }

    Ok(())
}
