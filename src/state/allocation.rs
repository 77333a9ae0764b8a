//! Least-used bucket assignment of houses and paths.

use indexmap::IndexMap;
use rand::{Rng, seq::IndexedRandom};

use crate::state::hunt::Team;

/// House and path picked for a new team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub house: String,
    pub path: String,
}

/// Pick uniformly among the configured buckets with the lowest usage.
///
/// Values in `used` that are not configured anymore are ignored. Returns `None` when
/// no bucket is configured.
pub fn least_used<'a, 'b, R, I>(
    buckets: I,
    used: impl Iterator<Item = &'b str>,
    rng: &mut R,
) -> Option<String>
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: IndexMap<&str, usize> = buckets.into_iter().map(|bucket| (bucket, 0)).collect();
    for value in used {
        if let Some(count) = counts.get_mut(value) {
            *count += 1;
        }
    }

    let min = counts.values().copied().min()?;
    let candidates: Vec<&str> = counts
        .iter()
        .filter(|&(_, count)| *count == min)
        .map(|(bucket, _)| *bucket)
        .collect();
    candidates.choose(rng).map(|bucket| bucket.to_string())
}

/// Choose house and path independently for a team joining `existing`.
pub fn allocate<'a, R>(
    houses: impl IntoIterator<Item = &'a str>,
    paths: impl IntoIterator<Item = &'a str>,
    existing: &[Team],
    rng: &mut R,
) -> Option<Allocation>
where
    R: Rng + ?Sized,
{
    let house = least_used(houses, existing.iter().map(|team| team.house.as_str()), rng)?;
    let path = least_used(paths, existing.iter().map(|team| team.path.as_str()), rng)?;
    Some(Allocation { house, path })
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use rand::{SeedableRng, rngs::StdRng};
    use uuid::Uuid;

    use super::*;

    const HOUSES: [&str; 4] = ["Gryffindor", "Slytherin", "Hufflepuff", "Ravenclaw"];
    const PATHS: [&str; 3] = ["alpha", "beta", "gamma"];

    fn team(house: &str, path: &str) -> Team {
        Team::register(
            Uuid::new_v4(),
            "t".into(),
            "l".into(),
            "p".into(),
            None,
            house.into(),
            path.into(),
            SystemTime::now(),
        )
    }

    #[test]
    fn picks_only_minimum_buckets() {
        let mut rng = StdRng::seed_from_u64(7);
        let existing = vec![
            team("Gryffindor", "alpha"),
            team("Slytherin", "beta"),
            team("Hufflepuff", "alpha"),
        ];
        for _ in 0..32 {
            let allocation = allocate(HOUSES, PATHS, &existing, &mut rng).unwrap();
            assert_eq!(allocation.house, "Ravenclaw");
            assert_eq!(allocation.path, "gamma");
        }
    }

    #[test]
    fn sequential_registrations_stay_balanced() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut teams = Vec::new();
        for _ in 0..12 {
            let allocation = allocate(HOUSES, PATHS, &teams, &mut rng).unwrap();
            teams.push(team(&allocation.house, &allocation.path));
        }

        for house in HOUSES {
            assert_eq!(teams.iter().filter(|t| t.house == house).count(), 3);
        }
        for path in PATHS {
            assert_eq!(teams.iter().filter(|t| t.path == path).count(), 4);
        }
    }

    #[test]
    fn unknown_values_are_ignored() {
        let mut rng = StdRng::seed_from_u64(1);
        let existing = vec![team("Durmstrang", "omega")];
        let picked = least_used(["alpha"], existing.iter().map(|t| t.path.as_str()), &mut rng);
        assert_eq!(picked.as_deref(), Some("alpha"));
    }

    #[test]
    fn nothing_configured_yields_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(least_used(std::iter::empty(), std::iter::empty(), &mut rng).is_none());
    }
}
