//! Spawn plan for a problem's answer set
//!
//! When a problem arrives, the whole answer set (correct values and
//! distractors) is shuffled and each block gets its horizontal drop position
//! rolled up front, so the round consumes exactly one RNG stream and replays
//! deterministically.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::{SPAWN_X_MAX, SPAWN_X_MIN};
use crate::problem::Problem;

/// One block waiting to drop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedBlock {
    pub value: i32,
    pub is_correct: bool,
    /// Horizontal spawn position, rolled when the plan was built
    pub x: f32,
}

/// Shuffled queue of blocks for the current round
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnPlan {
    queue: Vec<PlannedBlock>,
}

impl SpawnPlan {
    /// Build a round's plan: correct values and distractors, uniformly
    /// shuffled, each with a random x inside the spawn band.
    pub fn build(problem: &Problem, rng: &mut Pcg32) -> Self {
        let mut queue: Vec<PlannedBlock> = problem
            .correct
            .iter()
            .map(|&v| (v, true))
            .chain(problem.distractors.iter().map(|&v| (v, false)))
            .map(|(value, is_correct)| PlannedBlock {
                value,
                is_correct,
                x: rng.random_range(SPAWN_X_MIN..=SPAWN_X_MAX),
            })
            .collect();
        queue.shuffle(rng);
        Self { queue }
    }

    /// Next block to drop, if any remain
    pub fn pop(&mut self) -> Option<PlannedBlock> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn remaining(&self) -> impl Iterator<Item = &PlannedBlock> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn drain(plan: &mut SpawnPlan) -> Vec<(i32, bool)> {
        let mut out = Vec::new();
        while let Some(b) = plan.pop() {
            out.push((b.value, b.is_correct));
        }
        out
    }

    #[test]
    fn test_plan_is_answer_multiset() {
        // Order is random; the multiset must be exactly correct ∪ distractors
        let problem = Problem::fallback();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut plan = SpawnPlan::build(&problem, &mut rng);

        assert_eq!(plan.len(), problem.answer_count());
        let mut got = drain(&mut plan);
        got.sort_unstable();
        let mut want = vec![(2, true), (3, true), (-2, false), (-3, false)];
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn test_spawn_x_stays_in_band() {
        let problem = Problem {
            question: String::new(),
            correct: vec![1, 2, 3, 4],
            distractors: vec![-1, -2, -3, -4],
        };
        let mut rng = Pcg32::seed_from_u64(99);
        let plan = SpawnPlan::build(&problem, &mut rng);

        for block in plan.remaining() {
            assert!((SPAWN_X_MIN..=SPAWN_X_MAX).contains(&block.x));
        }
    }

    #[test]
    fn test_same_seed_same_plan() {
        let problem = Problem::fallback();
        let mut a = SpawnPlan::build(&problem, &mut Pcg32::seed_from_u64(5));
        let mut b = SpawnPlan::build(&problem, &mut Pcg32::seed_from_u64(5));

        while let Some(x) = a.pop() {
            assert_eq!(Some(x), b.pop());
        }
        assert!(b.is_empty());
    }
}
