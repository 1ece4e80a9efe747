//! # Plan Selector
//!
//! Greedy weighted-random plan construction. Every draw scores the remaining
//! candidates against the recipes already chosen, shifts the scores so the
//! lowest becomes 1, and samples one winner proportionally. Winners leave the
//! pool, so a plan never repeats a recipe.
//!
//! Randomness is always passed in, which keeps draws reproducible under a
//! seeded generator.

use crate::affinity::AffinityScorer;
use crate::planner_errors::{PlannerError, PlannerResult};
use crate::recipe_model::{MealPreferences, RecipeFeatures, RecipeId};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

/// Shift scores so the minimum maps to 1 and every weight is at least 1
pub fn selection_weights(scores: &[f64]) -> Vec<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    scores.iter().map(|score| (score - min) + 1.0).collect()
}

/// Draw one index with probability proportional to its shifted score
///
/// Returns `Ok(None)` for an empty score list.
pub fn weighted_pick<R: Rng + ?Sized>(scores: &[f64], rng: &mut R) -> PlannerResult<Option<usize>> {
    if scores.is_empty() {
        return Ok(None);
    }

    let weights = selection_weights(scores);
    let distribution =
        WeightedIndex::new(&weights).map_err(|e| PlannerError::Sampling(e.to_string()))?;

    Ok(Some(distribution.sample(rng)))
}

/// Weighted-greedy selection over pre-loaded recipe features
pub struct PlanSelector<'a> {
    scorer: &'a AffinityScorer,
}

impl<'a> PlanSelector<'a> {
    pub fn new(scorer: &'a AffinityScorer) -> Self {
        Self { scorer }
    }

    /// Grow a plan from `seed` until it holds `target_count` recipes or the
    /// candidates run out
    ///
    /// The seed is always the first entry of the returned ids.
    pub fn build_plan<R: Rng + ?Sized>(
        &self,
        seed: RecipeFeatures,
        candidates: Vec<RecipeFeatures>,
        target_count: usize,
        prefs: &MealPreferences,
        recent_ids: &HashSet<RecipeId>,
        rng: &mut R,
    ) -> PlannerResult<Vec<RecipeId>> {
        let mut pool: Vec<RecipeFeatures> = candidates
            .into_iter()
            .filter(|candidate| candidate.id != seed.id)
            .collect();
        let mut plan = vec![seed];

        while plan.len() < target_count && !pool.is_empty() {
            let scores: Vec<f64> = pool
                .iter()
                .map(|candidate| self.scorer.total_score(candidate, &plan, prefs, recent_ids))
                .collect();

            let Some(index) = weighted_pick(&scores, rng)? else {
                break;
            };

            let winner = pool.remove(index);
            debug!(recipe_id = winner.id, score = scores[index], "Added recipe to plan");
            plan.push(winner);
        }

        Ok(plan.into_iter().map(|recipe| recipe.id).collect())
    }

    /// Draw one candidate scored by summed affinity against `fixed`
    pub fn pick_replacement<R: Rng + ?Sized>(
        &self,
        fixed: &[RecipeFeatures],
        candidates: &[RecipeFeatures],
        prefs: &MealPreferences,
        recent_ids: &HashSet<RecipeId>,
        rng: &mut R,
    ) -> PlannerResult<Option<RecipeId>> {
        let scores: Vec<f64> = candidates
            .iter()
            .map(|candidate| self.scorer.total_score(candidate, fixed, prefs, recent_ids))
            .collect();

        Ok(weighted_pick(&scores, rng)?.map(|index| candidates[index].id))
    }

    /// Draw one candidate scored by affinity against `locked` plus its
    /// standalone preference bonus
    pub fn pick_single<R: Rng + ?Sized>(
        &self,
        locked: &[RecipeFeatures],
        candidates: &[RecipeFeatures],
        prefs: &MealPreferences,
        recent_ids: &HashSet<RecipeId>,
        rng: &mut R,
    ) -> PlannerResult<Option<RecipeId>> {
        let scores: Vec<f64> = candidates
            .iter()
            .map(|candidate| {
                self.scorer.total_score(candidate, locked, prefs, recent_ids)
                    + self.scorer.individual_weight(candidate, prefs)
            })
            .collect();

        Ok(weighted_pick(&scores, rng)?.map(|index| candidates[index].id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_config::PlannerConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scorer() -> AffinityScorer {
        let config = PlannerConfig::default();
        AffinityScorer::new(config.weights, config.noisy_labels)
    }

    fn features(id: RecipeId, fresh: &[&str]) -> RecipeFeatures {
        RecipeFeatures {
            id,
            fresh_ingredients: fresh.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_weights_are_at_least_one() {
        let weights = selection_weights(&[-120.0, 0.0, 35.5, -50.0]);
        assert_eq!(weights, vec![1.0, 121.0, 156.5, 71.0]);
        assert!(weights.iter().all(|w| *w >= 1.0));

        assert_eq!(selection_weights(&[-7.0, -7.0]), vec![1.0, 1.0]);
        assert!(selection_weights(&[]).is_empty());
    }

    #[test]
    fn test_weighted_pick_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(weighted_pick(&[], &mut rng).unwrap(), None);
        assert_eq!(weighted_pick(&[-999.0], &mut rng).unwrap(), Some(0));
    }

    #[test]
    fn test_weighted_pick_rejects_non_finite_scores() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = weighted_pick(&[1.0, f64::NAN], &mut rng);
        assert!(matches!(result, Err(PlannerError::Sampling(_))));
    }

    #[test]
    fn test_every_candidate_can_win() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            if let Some(index) = weighted_pick(&[-100.0, 0.0, 10.0], &mut rng).unwrap() {
                seen.insert(index);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_build_plan_has_no_duplicates() {
        let scorer = scorer();
        let selector = PlanSelector::new(&scorer);
        let candidates: Vec<_> = (1..=8).map(|id| features(id, &["onion"])).collect();

        for seed_value in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed_value);
            let plan = selector
                .build_plan(
                    features(1, &["onion"]),
                    candidates.clone(),
                    5,
                    &MealPreferences::default(),
                    &HashSet::new(),
                    &mut rng,
                )
                .unwrap();

            assert_eq!(plan.len(), 5);
            assert_eq!(plan[0], 1);
            let unique: HashSet<_> = plan.iter().collect();
            assert_eq!(unique.len(), 5);
        }
    }

    #[test]
    fn test_build_plan_stops_when_pool_is_exhausted() {
        let scorer = scorer();
        let selector = PlanSelector::new(&scorer);
        let mut rng = StdRng::seed_from_u64(3);

        let plan = selector
            .build_plan(
                features(1, &[]),
                vec![features(2, &[]), features(3, &[])],
                5,
                &MealPreferences::default(),
                &HashSet::new(),
                &mut rng,
            )
            .unwrap();

        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_build_plan_is_reproducible() {
        let scorer = scorer();
        let selector = PlanSelector::new(&scorer);
        let candidates: Vec<_> = (2..=12).map(|id| features(id, &[])).collect();

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            selector
                .build_plan(
                    features(1, &[]),
                    candidates.clone(),
                    5,
                    &MealPreferences::default(),
                    &HashSet::new(),
                    &mut rng,
                )
                .unwrap()
        };

        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_pick_replacement_from_single_candidate() {
        let scorer = scorer();
        let selector = PlanSelector::new(&scorer);
        let mut rng = StdRng::seed_from_u64(5);

        let picked = selector
            .pick_replacement(
                &[features(1, &["leek"])],
                &[features(9, &[])],
                &MealPreferences::default(),
                &HashSet::new(),
                &mut rng,
            )
            .unwrap();
        assert_eq!(picked, Some(9));

        let none = selector
            .pick_replacement(&[], &[], &MealPreferences::default(), &HashSet::new(), &mut rng)
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_pick_single_prefers_matching_preferences() {
        let scorer = scorer();
        let selector = PlanSelector::new(&scorer);
        let prefs = MealPreferences::default().with_max_time(30);

        let mut quick = features(1, &[]);
        quick.time_minutes = Some(20);
        let mut slow = features(2, &[]);
        slow.time_minutes = Some(90);
        let candidates = vec![quick, slow];

        let mut rng = StdRng::seed_from_u64(99);
        let mut quick_wins = 0;
        for _ in 0..500 {
            let picked = selector
                .pick_single(&[], &candidates, &prefs, &HashSet::new(), &mut rng)
                .unwrap();
            if picked == Some(1) {
                quick_wins += 1;
            }
        }

        // Weights are 41 and 1, so the quick recipe should win almost every time
        assert!(quick_wins > 400);
    }
}
