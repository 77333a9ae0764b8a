//! Elapsed time and leaderboard ordering.

use std::{cmp::Ordering, time::Duration, time::SystemTime};

use crate::state::hunt::Team;

/// Time a team has been racing. Late joiners start their clock at registration.
pub fn elapsed(team: &Team, global_start: Option<SystemTime>, now: SystemTime) -> Duration {
    let Some(start) = global_start else {
        return Duration::ZERO;
    };
    let personal_start = start.max(team.created_at);
    let end = team.finished_at.unwrap_or(now);
    end.duration_since(personal_start).unwrap_or(Duration::ZERO)
}

/// `HH:MM:SS`, hours are not wrapped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// One ranked row.
#[derive(Debug, Clone)]
pub struct RankedTeam<'a> {
    /// 1-based position.
    pub rank: usize,
    pub team: &'a Team,
    pub elapsed: Duration,
}

fn compare(a: &RankedTeam<'_>, b: &RankedTeam<'_>) -> Ordering {
    b.team
        .current_stage
        .cmp(&a.team.current_stage)
        .then_with(|| b.team.score.cmp(&a.team.score))
        .then_with(|| a.elapsed.cmp(&b.elapsed))
        .then_with(|| a.team.name.cmp(&b.team.name))
        .then_with(|| a.team.id.cmp(&b.team.id))
}

/// Rank teams by stage desc, score desc, elapsed asc; name and id make the order total.
pub fn rank(teams: &[Team], global_start: Option<SystemTime>, now: SystemTime) -> Vec<RankedTeam<'_>> {
    let mut rows: Vec<RankedTeam<'_>> = teams
        .iter()
        .map(|team| RankedTeam {
            rank: 0,
            team,
            elapsed: elapsed(team, global_start, now),
        })
        .collect();
    rows.sort_by(compare);
    for (idx, row) in rows.iter_mut().enumerate() {
        row.rank = idx + 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn team(name: &str, stage: u32, score: i32, created: u64) -> Team {
        let mut team = Team::register(
            Uuid::new_v4(),
            name.into(),
            "leader".into(),
            "pw".into(),
            None,
            "Gryffindor".into(),
            "alpha".into(),
            at(created),
        );
        team.current_stage = stage;
        team.score = score;
        team
    }

    #[test]
    fn late_joiner_clock_starts_at_registration() {
        let early = team("Early", 0, 0, 0);
        let late = team("Late", 0, 0, 500);
        assert_eq!(elapsed(&early, Some(at(100)), at(1000)), Duration::from_secs(900));
        assert_eq!(elapsed(&late, Some(at(100)), at(1000)), Duration::from_secs(500));
    }

    #[test]
    fn finished_teams_stop_the_clock() {
        let mut team = team("Done", 5, 100, 0);
        team.finished_at = Some(at(400));
        assert_eq!(elapsed(&team, Some(at(100)), at(9000)), Duration::from_secs(300));
    }

    #[test]
    fn no_start_means_zero() {
        let team = team("Idle", 0, 0, 0);
        assert_eq!(elapsed(&team, None, at(9000)), Duration::ZERO);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let team = team("Future", 0, 0, 2000);
        assert_eq!(elapsed(&team, Some(at(100)), at(1000)), Duration::ZERO);
    }

    #[test]
    fn ranking_uses_stage_then_score_then_time() {
        let teams = vec![
            team("Slow", 3, 60, 0),
            team("Fast", 3, 60, 200),
            team("Leader", 4, 40, 0),
            team("Rich", 3, 80, 0),
        ];
        let ranked = rank(&teams, Some(at(0)), at(1000));
        let names: Vec<&str> = ranked.iter().map(|row| row.team.name.as_str()).collect();
        assert_eq!(names, ["Leader", "Rich", "Fast", "Slow"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn full_ties_fall_back_to_name() {
        let teams = vec![team("Beta", 1, 20, 0), team("Alpha", 1, 20, 0)];
        let ranked = rank(&teams, None, at(10));
        assert_eq!(ranked[0].team.name, "Alpha");
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "01:02:03");
        assert_eq!(format_elapsed(Duration::from_secs(100 * 3600)), "100:00:00");
    }
}
