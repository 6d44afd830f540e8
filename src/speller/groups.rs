use rand::Rng;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Flash groups of a speller: group index -> symbol indices.
///
/// Built once per speller and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    groups: Vec<Vec<usize>>,
}

/// A partial assignment reached a symbol with fewer than two groups left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Infeasible;

impl GroupAssignment {
    /// Wraps a hand-made layout. No balancing rule is enforced here; use
    /// [`GroupAssignment::is_balanced`] to check one.
    pub fn from_groups(groups: Vec<Vec<usize>>) -> Self {
        Self { groups }
    }

    /// Largest group allowed when `symbols` are spread over `groups`, each
    /// symbol appearing twice.
    pub fn max_size(symbols: usize, groups: usize) -> usize {
        if groups == 0 {
            return 0;
        }
        (2 * symbols + groups - 1) / groups
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, group: usize) -> &[usize] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, group: usize, symbol: usize) -> bool {
        self.group(group).contains(&symbol)
    }

    /// Groups the symbol belongs to, in group order.
    pub fn memberships(&self, symbol: usize) -> Vec<usize> {
        (0..self.groups.len())
            .filter(|&group| self.contains(group, symbol))
            .collect()
    }

    /// Every symbol sits in exactly two distinct groups and no group exceeds
    /// `max_size`.
    pub fn is_balanced(&self, symbols: usize) -> bool {
        let max_size = Self::max_size(symbols, self.groups.len());
        if self.groups.iter().any(|group| group.len() > max_size) {
            return false;
        }
        let mut counts = vec![0usize; symbols];
        for group in &self.groups {
            let mut seen = std::collections::HashSet::new();
            for &symbol in group {
                if symbol >= symbols || !seen.insert(symbol) {
                    return false;
                }
                counts[symbol] += 1;
            }
        }
        counts.iter().all(|&count| count == 2)
    }
}

// PARTITIONER -----------------------------------------------------------------

/// Randomly assigns every symbol to two distinct groups, keeping each group
/// at most `ceil(2 * symbols / groups)` long.
///
/// Symbols are placed in order. When a symbol finds fewer than two groups with
/// room left, the whole assignment is thrown away and started again, up to
/// `max_attempts` times.
pub fn partition<R: Rng + ?Sized>(
    rng: &mut R,
    symbols: usize,
    groups: usize,
    max_attempts: usize,
) -> Result<GroupAssignment> {
    if groups < 2 {
        return Err(EngineError::InfeasiblePartition {
            symbols,
            groups,
            attempts: 0,
        });
    }

    for attempt in 1..=max_attempts {
        match try_partition(rng, symbols, groups) {
            Ok(assignment) => {
                debug!(attempt, symbols, groups, "Symbols partitioned into flash groups");
                return Ok(assignment);
            }
            Err(Infeasible) => warn!(attempt, max_attempts, "Partition reached a dead end, restarting"),
        }
    }

    warn!(symbols, groups, max_attempts, "Giving up on group partition");
    Err(EngineError::InfeasiblePartition {
        symbols,
        groups,
        attempts: max_attempts,
    })
}

fn try_partition<R: Rng + ?Sized>(
    rng: &mut R,
    symbols: usize,
    groups: usize,
) -> std::result::Result<GroupAssignment, Infeasible> {
    let max_size = GroupAssignment::max_size(symbols, groups);
    let mut assignment: Vec<Vec<usize>> = vec![Vec::new(); groups];

    for symbol in 0..symbols {
        let open = assignment.iter().filter(|g| g.len() < max_size).count();
        if open < 2 {
            return Err(Infeasible);
        }

        // Two draws, each restricted to non-full groups, until they differ.
        let (first, second) = loop {
            let first = draw_open_group(rng, &assignment, max_size);
            let second = draw_open_group(rng, &assignment, max_size);
            if first != second {
                break (first, second);
            }
        };
        assignment[first].push(symbol);
        assignment[second].push(symbol);
    }

    Ok(GroupAssignment::from_groups(assignment))
}

fn draw_open_group<R: Rng + ?Sized>(rng: &mut R, assignment: &[Vec<usize>], max_size: usize) -> usize {
    loop {
        let group = rng.gen_range(0..assignment.len());
        if assignment[group].len() < max_size {
            return group;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn max_size_rounds_up() {
        assert_eq!(GroupAssignment::max_size(36, 12), 6);
        assert_eq!(GroupAssignment::max_size(5, 3), 4);
        assert_eq!(GroupAssignment::max_size(1, 4), 1);
        assert_eq!(GroupAssignment::max_size(3, 0), 0);
    }

    #[test]
    fn default_layout_is_balanced() {
        let mut rng = StdRng::seed_from_u64(1);
        let assignment = partition(&mut rng, 36, 12, 1000).unwrap();
        assert_eq!(assignment.len(), 12);
        assert!(assignment.is_balanced(36));
        for symbol in 0..36 {
            assert_eq!(assignment.memberships(symbol).len(), 2);
        }
    }

    #[test]
    fn balanced_for_many_feasible_shapes() {
        let mut rng = StdRng::seed_from_u64(2024);
        for symbols in 1..=40 {
            for groups in 2..=14 {
                let assignment = partition(&mut rng, symbols, groups, 10_000).unwrap();
                assert!(
                    assignment.is_balanced(symbols),
                    "unbalanced for {} symbols in {} groups: {:?}",
                    symbols,
                    groups,
                    assignment.groups()
                );
            }
        }
    }

    #[test]
    fn fewer_than_two_groups_fails_fast() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = partition(&mut rng, 2, 1, 1000).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InfeasiblePartition { symbols: 2, groups: 1, attempts: 0 }
        ));
    }

    /// Seed whose first partition attempt of 36 symbols into 12 groups
    /// dead-ends.
    fn dead_end_seed() -> u64 {
        (0..2000)
            .find(|&seed| partition(&mut StdRng::seed_from_u64(seed), 36, 12, 1).is_err())
            .expect("no dead end in 2000 seeds")
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let seed = dead_end_seed();
        let err = partition(&mut StdRng::seed_from_u64(seed), 36, 12, 1).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InfeasiblePartition { symbols: 36, groups: 12, attempts: 1 }
        ));
    }

    #[test]
    fn dead_end_restarts_from_scratch() {
        let seed = dead_end_seed();
        let assignment = partition(&mut StdRng::seed_from_u64(seed), 36, 12, 1000).unwrap();
        assert_eq!(assignment.len(), 12);
        assert!(assignment.is_balanced(36));
    }

    #[test]
    fn single_attempts_either_fail_cleanly_or_balance() {
        let (mut failed, mut balanced) = (0, 0);
        for seed in 0..200 {
            match partition(&mut StdRng::seed_from_u64(seed), 36, 12, 1) {
                Ok(assignment) => {
                    assert!(assignment.is_balanced(36));
                    balanced += 1;
                }
                Err(EngineError::InfeasiblePartition { attempts: 1, .. }) => failed += 1,
                Err(other) => panic!("unexpected error {}", other),
            }
        }
        assert!(failed > 0 && balanced > 0);
    }

    #[test]
    fn same_seed_same_groups() {
        let a = partition(&mut StdRng::seed_from_u64(77), 26, 8, 100).unwrap();
        let b = partition(&mut StdRng::seed_from_u64(77), 26, 8, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn balance_check_catches_violations() {
        // Symbol 1 only appears once.
        let layout = GroupAssignment::from_groups(vec![vec![0, 1], vec![0]]);
        assert!(!layout.is_balanced(2));
        // Same symbol twice in one group.
        let layout = GroupAssignment::from_groups(vec![vec![0, 0], vec![1, 1]]);
        assert!(!layout.is_balanced(2));
        let layout = GroupAssignment::from_groups(vec![vec![0, 1], vec![0, 1]]);
        assert!(layout.is_balanced(2));
    }

    #[test]
    fn out_of_range_group_is_empty() {
        let layout = GroupAssignment::from_groups(vec![vec![0, 1]]);
        assert!(layout.group(4).is_empty());
        assert!(!layout.contains(4, 0));
    }
}
