//! Property tests for frontier selection and the score recurrence.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

use frontier_crawler::{AccountRecord, FrontierSelector, ScoreRecurrence, ScoreStore};

fn store_from_scores(scores: &[f64]) -> ScoreStore {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| AccountRecord {
            score,
            ..AccountRecord::seeded(i as u64 + 1, "")
        })
        .collect()
}

proptest! {
    #[test]
    fn selection_size_is_min_of_n_and_store(
        scores in prop::collection::vec(-1.0f64..2.0, 0..60),
        n in 0usize..80,
        epsilon in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let store = store_from_scores(&scores);
        let selector = FrontierSelector::new(epsilon, n).unwrap();
        let frontier = selector.choose(&store, &mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(frontier.len(), n.min(store.len()));
        let distinct: HashSet<_> = frontier.ids().collect();
        prop_assert_eq!(distinct.len(), frontier.len());
        prop_assert!(frontier.ids().all(|id| store.contains(id)));
        prop_assert!(frontier.explored.len() <= selector.exploration_budget());
    }

    #[test]
    fn exploitation_takes_the_best_remaining(
        scores in prop::collection::vec(-1.0f64..2.0, 1..40),
        n in 1usize..40,
        seed in any::<u64>(),
    ) {
        let store = store_from_scores(&scores);
        let selector = FrontierSelector::new(0.0, n).unwrap();
        let frontier = selector.choose(&store, &mut StdRng::seed_from_u64(seed));

        let expected: Vec<_> = store.ordered_account_ids().into_iter().take(n).collect();
        prop_assert_eq!(frontier.exploited, expected);
    }

    #[test]
    fn zero_matches_halves_the_score(old in -10.0f64..10.0, base in 0.01f64..0.99) {
        let recurrence = ScoreRecurrence::new(base).unwrap();
        prop_assert_eq!(recurrence.next(old, 0), 0.5 * old);
    }

    #[test]
    fn score_stays_below_saturation(old in -10.0f64..10.0, count in 0usize..10_000, base in 0.01f64..0.99) {
        let recurrence = ScoreRecurrence::new(base).unwrap();
        let next = recurrence.next(old, count);
        prop_assert!(next >= 0.5 * old);
        prop_assert!(next <= 1.0 + 0.5 * old);
    }

    #[test]
    fn repeated_cycles_stay_bounded(count in 0usize..50, cycles in 1usize..200) {
        let recurrence = ScoreRecurrence::new(0.9).unwrap();
        let mut score = -1.0;
        for _ in 0..cycles {
            score = recurrence.next(score, count);
        }
        prop_assert!(score < 2.0);
        prop_assert!(score >= -1.0);
    }
}
