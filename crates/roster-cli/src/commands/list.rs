use anyhow::Result;
use roster::{Player, PlayerRepository};

use super::format;

pub async fn run(
    repo: &dyn PlayerRepository,
    team: Option<&str>,
    position: Option<&str>,
) -> Result<()> {
    let players = repo.find_all().await?;
    let matching = filter_players(players, team, position);

    format::print_player_table(&matching);

    Ok(())
}

/// Keep players whose team and position match, ignoring case.
fn filter_players(players: Vec<Player>, team: Option<&str>, position: Option<&str>) -> Vec<Player> {
    players
        .into_iter()
        .filter(|p| matches_field(p.team.as_deref(), team))
        .filter(|p| matches_field(p.position.as_deref(), position))
        .collect()
}

fn matches_field(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => value.is_some_and(|v| v.eq_ignore_ascii_case(wanted.trim())),
    }
}

#[cfg(test)]
mod tests {
    use roster::PlayerId;

    use super::*;

    fn player(id: &str, team: Option<&str>, position: &str) -> Player {
        Player {
            external_id: PlayerId::new(id),
            secondary_id: None,
            full_name: format!("Player {id}"),
            position: Some(position.into()),
            team: team.map(Into::into),
            active: Some(true),
        }
    }

    #[test]
    fn no_filters_keeps_everyone() {
        let players = vec![player("1", Some("KC"), "QB"), player("2", None, "WR")];
        assert_eq!(filter_players(players, None, None).len(), 2);
    }

    #[test]
    fn team_filter_ignores_case() {
        let players = vec![player("1", Some("KC"), "QB"), player("2", Some("DET"), "WR")];
        let kept = filter_players(players, Some("kc"), None);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].external_id.as_str(), "1");
    }

    #[test]
    fn free_agents_never_match_a_team() {
        let players = vec![player("1", None, "QB")];
        assert!(filter_players(players, Some("KC"), None).is_empty());
    }

    #[test]
    fn filters_combine() {
        let players = vec![
            player("1", Some("KC"), "QB"),
            player("2", Some("KC"), "TE"),
            player("3", Some("BUF"), "QB"),
        ];
        let kept = filter_players(players, Some("KC"), Some("qb"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].external_id.as_str(), "1");
    }
}
