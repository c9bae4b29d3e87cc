// src/engine/selection.rs

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::{MAX_QUESTION_COUNT, MIN_QUESTION_COUNT};

/// Selection priority of a question for one user. Lower tiers are asked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// No statistics row yet.
    Unseen = 0,
    /// Attempted, never answered correctly.
    NeverCorrect = 1,
    /// Answered correctly at least once (mastered).
    Seen = 2,
}

impl Tier {
    /// Classifies a question from the user's `(times_attempted, times_correct)`.
    pub fn of(stat: Option<(i32, i32)>) -> Self {
        match stat {
            None => Tier::Unseen,
            Some((_, 0)) => Tier::NeverCorrect,
            Some(_) => Tier::Seen,
        }
    }
}

/// Anything the selector can rank.
pub trait Ranked {
    fn tier(&self) -> Tier;
}

/// Number of questions a regular session gets: the request is clamped to
/// `[MIN_QUESTION_COUNT, MAX_QUESTION_COUNT]`, then to what the subject holds.
pub fn clamp_question_count(requested: i64, available: i64) -> i64 {
    requested
        .clamp(MIN_QUESTION_COUNT, MAX_QUESTION_COUNT)
        .min(available.max(0))
}

/// Net-wrong test for practice sessions. A question stays "wrong" while
/// cumulative attempts outnumber cumulative correct answers.
pub fn is_net_wrong(times_attempted: i32, times_correct: i32) -> bool {
    times_attempted > times_correct
}

/// Orders candidates by tier, shuffling uniformly inside each tier, and keeps
/// the first `count`.
pub fn select_by_priority<T, R>(candidates: Vec<T>, count: usize, rng: &mut R) -> Vec<T>
where
    T: Ranked,
    R: Rng + ?Sized,
{
    let mut buckets: [Vec<T>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for candidate in candidates {
        buckets[candidate.tier() as usize].push(candidate);
    }

    let mut ordered = Vec::with_capacity(count);
    for mut bucket in buckets {
        if ordered.len() >= count {
            break;
        }
        bucket.shuffle(rng);
        let take = (count - ordered.len()).min(bucket.len());
        ordered.extend(bucket.into_iter().take(take));
    }
    ordered
}

/// Random order, truncated to `count`. Used when every candidate is equally
/// eligible (wrong-answer practice).
pub fn shuffle_and_take<T, R>(mut candidates: Vec<T>, count: usize, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Debug, Clone, PartialEq)]
    struct Candidate {
        id: i64,
        stat: Option<(i32, i32)>,
    }

    impl Ranked for Candidate {
        fn tier(&self) -> Tier {
            Tier::of(self.stat)
        }
    }

    fn candidate(id: i64, stat: Option<(i32, i32)>) -> Candidate {
        Candidate { id, stat }
    }

    #[test]
    fn test_tier_classification() {
        assert_eq!(Tier::of(None), Tier::Unseen);
        assert_eq!(Tier::of(Some((3, 0))), Tier::NeverCorrect);
        assert_eq!(Tier::of(Some((3, 1))), Tier::Seen);
    }

    #[test]
    fn test_clamp_question_count() {
        // Small subject: everything it has.
        assert_eq!(clamp_question_count(10, 3), 3);
        // Below minimum is raised to 10.
        assert_eq!(clamp_question_count(2, 50), 10);
        // Above maximum is capped at 100.
        assert_eq!(clamp_question_count(500, 1_000), 100);
        assert_eq!(clamp_question_count(25, 40), 25);
        assert_eq!(clamp_question_count(25, 0), 0);
    }

    #[test]
    fn test_net_wrong_counts_history_not_latest() {
        // One wrong then three right: attempted 4, correct 3.
        assert!(is_net_wrong(4, 3));
        assert!(!is_net_wrong(3, 3));
        assert!(!is_net_wrong(0, 0));
    }

    #[test]
    fn test_select_prefers_lower_tiers() {
        let candidates = vec![
            candidate(1, Some((2, 2))),
            candidate(2, Some((1, 0))),
            candidate(3, None),
            candidate(4, Some((5, 1))),
            candidate(5, None),
            candidate(6, Some((4, 0))),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_by_priority(candidates, 4, &mut rng);

        let tiers: Vec<Tier> = picked.iter().map(|c| c.tier()).collect();
        assert_eq!(
            tiers,
            vec![Tier::Unseen, Tier::Unseen, Tier::NeverCorrect, Tier::NeverCorrect]
        );
        let mut ids: Vec<i64> = picked.iter().map(|c| c.id).collect();
        ids.sort();
        assert_eq!(ids, vec![2, 3, 5, 6]);
    }

    #[test]
    fn test_select_returns_everything_when_count_exceeds_pool() {
        let candidates: Vec<Candidate> = (1..=3).map(|id| candidate(id, None)).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let picked = select_by_priority(candidates, 10, &mut rng);
        let mut ids: Vec<i64> = picked.iter().map(|c| c.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_select_shuffles_within_tier() {
        let candidates: Vec<Candidate> = (1..=20).map(|id| candidate(id, None)).collect();
        let orders: Vec<Vec<i64>> = (0..5u64)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                select_by_priority(candidates.clone(), 20, &mut rng)
                    .into_iter()
                    .map(|c| c.id)
                    .collect()
            })
            .collect();
        assert!(orders.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn test_shuffle_and_take_caps_count() {
        let mut rng = StdRng::seed_from_u64(3);
        let picked = shuffle_and_take((0..150).collect::<Vec<i32>>(), 100, &mut rng);
        assert_eq!(picked.len(), 100);
    }
}
