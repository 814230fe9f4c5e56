use chrono::{DateTime, Local, TimeDelta, Utc};
use roster::{Player, RunReport};

const MAX_NAME_WIDTH: usize = 28;
const ID_WIDTH: usize = 8;

/// Print players grouped by team, free agents last.
pub fn print_player_table(players: &[Player]) {
    if players.is_empty() {
        println!("No players stored. Run `roster-ingestor ingest` first.");
        return;
    }

    let groups = group_by_team(players);
    let name_width = players
        .iter()
        .map(|p| p.full_name.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_NAME_WIDTH);

    let mut first = true;
    for (team, entries) in &groups {
        if !first {
            println!();
        }
        first = false;

        println!("{} ({})", team.unwrap_or("Free agents"), entries.len());

        for player in entries {
            println!(
                "  {:<id_width$}  {:<name_width$}  {:<4}  {}",
                truncate(player.external_id.as_str(), ID_WIDTH),
                truncate(&player.full_name, name_width),
                player.position.as_deref().unwrap_or("-"),
                active_label(player.active),
                id_width = ID_WIDTH,
                name_width = name_width,
            );
        }
    }

    println!("\n{} players", players.len());
}

pub fn report_line(report: &RunReport) -> String {
    format!(
        "Ingested {} players ({} fetched, {} skipped) in {}.",
        report.stored,
        report.fetched,
        report.skipped_count(),
        duration(report.finished_at - report.started_at)
    )
}

pub fn active_label(active: Option<bool>) -> &'static str {
    match active {
        Some(true) => "active",
        Some(false) => "inactive",
        None => "unknown",
    }
}

pub fn timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

pub fn duration(delta: TimeDelta) -> String {
    let millis = delta.num_milliseconds().max(0);
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}

fn group_by_team(players: &[Player]) -> Vec<(Option<&str>, Vec<&Player>)> {
    let mut groups: Vec<(Option<&str>, Vec<&Player>)> = Vec::new();

    for player in players {
        let team = player.team.as_deref();
        if let Some(group) = groups.iter_mut().find(|(t, _)| *t == team) {
            group.1.push(player);
        } else {
            groups.push((team, vec![player]));
        }
    }

    // Free agents last.
    groups.sort_by_key(|(t, _)| (t.is_none(), *t));
    groups
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use roster::{PlayerId, TriggerReason};

    use super::*;

    fn player(id: &str, team: Option<&str>) -> Player {
        Player {
            external_id: PlayerId::new(id),
            secondary_id: None,
            full_name: format!("Player {id}"),
            position: Some("RB".into()),
            team: team.map(Into::into),
            active: None,
        }
    }

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("Amon-Ra St. Brown", 28), "Amon-Ra St. Brown");
    }

    #[test]
    fn truncate_long_name_adds_ellipsis() {
        assert_eq!(truncate("Christian McCaffrey", 10), "Christian…");
    }

    #[test]
    fn active_labels_cover_unknown() {
        assert_eq!(active_label(Some(true)), "active");
        assert_eq!(active_label(Some(false)), "inactive");
        assert_eq!(active_label(None), "unknown");
    }

    #[test]
    fn teams_sorted_with_free_agents_last() {
        let players = vec![
            player("1", None),
            player("2", Some("KC")),
            player("3", Some("BUF")),
            player("4", Some("KC")),
        ];

        let groups = group_by_team(&players);
        let teams: Vec<_> = groups.iter().map(|(t, _)| *t).collect();
        assert_eq!(teams, vec![Some("BUF"), Some("KC"), None]);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn durations_switch_to_seconds() {
        assert_eq!(duration(TimeDelta::milliseconds(250)), "250ms");
        assert_eq!(duration(TimeDelta::milliseconds(2500)), "2.5s");
        assert_eq!(duration(TimeDelta::milliseconds(-5)), "0ms");
    }

    #[test]
    fn report_line_summarizes_counts() {
        let started = Utc::now();
        let report = RunReport {
            reason: TriggerReason::Manual,
            started_at: started,
            finished_at: started + TimeDelta::milliseconds(40),
            fetched: 3,
            stored: 3,
            skipped: Vec::new(),
        };
        assert_eq!(
            report_line(&report),
            "Ingested 3 players (3 fetched, 0 skipped) in 40ms."
        );
    }
}
