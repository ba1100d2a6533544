//! Epsilon-greedy frontier selection.

use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::store::ScoreStore;
use crate::types::account::AccountId;
use crate::types::config::CrawlConfig;

/// Accounts chosen for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Frontier {
    /// Drawn uniformly from the whole store.
    pub explored: Vec<AccountId>,
    /// Highest-scoring accounts not already explored.
    pub exploited: Vec<AccountId>,
}

impl Frontier {
    /// Exploration picks first, then exploitation picks.
    pub fn ids(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.explored.iter().chain(self.exploited.iter()).copied()
    }

    /// Total number of selected accounts.
    pub fn len(&self) -> usize {
        self.explored.len() + self.exploited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Epsilon-greedy selector over a [`ScoreStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrontierSelector {
    epsilon: f64,
    frontier_size: usize,
}

impl FrontierSelector {
    /// Create a selector.
    ///
    /// # Arguments
    /// * `epsilon` - Share of the frontier drawn uniformly at random, in `[0, 1]`
    /// * `frontier_size` - Maximum number of accounts per cycle
    pub fn new(epsilon: f64, frontier_size: usize) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(ConfigError::InvalidEpsilon(epsilon));
        }
        Ok(Self {
            epsilon,
            frontier_size,
        })
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        Self::new(config.epsilon, config.frontier_size)
    }

    /// `floor(frontier_size * epsilon)`
    pub fn exploration_budget(&self) -> usize {
        ((self.frontier_size as f64) * self.epsilon).floor() as usize
    }

    /// Pick up to `frontier_size` distinct accounts.
    pub fn choose<R: Rng + ?Sized>(&self, store: &ScoreStore, rng: &mut R) -> Frontier {
        let ids: Vec<AccountId> = store.account_ids().collect();
        let k = self
            .exploration_budget()
            .min(self.frontier_size)
            .min(ids.len());

        let explored: Vec<AccountId> = rand::seq::index::sample(rng, ids.len(), k)
            .into_iter()
            .map(|i| ids[i])
            .collect();

        let taken: HashSet<AccountId> = explored.iter().copied().collect();
        let exploited: Vec<AccountId> = store
            .ordered_account_ids()
            .into_iter()
            .filter(|id| !taken.contains(id))
            .take(self.frontier_size - explored.len())
            .collect();

        Frontier {
            explored,
            exploited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::account::AccountRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store_with_scores(scores: &[(u64, f64)]) -> ScoreStore {
        scores
            .iter()
            .map(|&(id, score)| AccountRecord {
                score,
                ..AccountRecord::seeded(id, "")
            })
            .collect()
    }

    #[test]
    fn test_pure_exploitation_takes_top_scores() {
        let store = store_with_scores(&[(1, 5.0), (2, 3.0), (3, -1.0)]);
        let selector = FrontierSelector::new(0.0, 2).unwrap();
        let frontier = selector.choose(&store, &mut StdRng::seed_from_u64(7));

        assert!(frontier.explored.is_empty());
        assert_eq!(frontier.exploited, vec![AccountId(1), AccountId(2)]);
    }

    #[test]
    fn test_exploration_budget_is_floored() {
        assert_eq!(FrontierSelector::new(0.2, 300).unwrap().exploration_budget(), 60);
        assert_eq!(FrontierSelector::new(0.1, 15).unwrap().exploration_budget(), 1);
        assert_eq!(FrontierSelector::new(0.5, 1).unwrap().exploration_budget(), 0);
    }

    #[test]
    fn test_small_store_returns_everything() {
        let store = store_with_scores(&[(1, 0.1), (2, 0.2), (3, 0.3)]);
        let selector = FrontierSelector::new(1.0, 10).unwrap();
        let frontier = selector.choose(&store, &mut StdRng::seed_from_u64(1));

        assert_eq!(frontier.explored.len(), 3);
        assert!(frontier.exploited.is_empty());
        let mut ids: Vec<_> = frontier.ids().collect();
        ids.sort();
        assert_eq!(ids, vec![AccountId(1), AccountId(2), AccountId(3)]);
    }

    #[test]
    fn test_empty_store() {
        let selector = FrontierSelector::new(0.2, 300).unwrap();
        let frontier = selector.choose(&ScoreStore::new(), &mut StdRng::seed_from_u64(1));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_exploitation_skips_explored_ids() {
        let store = store_with_scores(&[(1, 5.0), (2, 4.0), (3, 3.0), (4, 2.0), (5, 1.0)]);
        let selector = FrontierSelector::new(0.5, 4).unwrap();

        for seed in 0..20 {
            let frontier = selector.choose(&store, &mut StdRng::seed_from_u64(seed));
            assert_eq!(frontier.explored.len(), 2);
            assert_eq!(frontier.len(), 4);
            let unique: HashSet<_> = frontier.ids().collect();
            assert_eq!(unique.len(), 4, "seed {seed} produced duplicates");
        }
    }

    #[test]
    fn test_rejects_invalid_epsilon() {
        assert_eq!(
            FrontierSelector::new(-0.1, 10),
            Err(ConfigError::InvalidEpsilon(-0.1))
        );
    }
}
