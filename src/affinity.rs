//! # Affinity Scoring
//!
//! Directional compatibility score between two recipes. The first recipe's own
//! calories, time and recency are evaluated against the preferences; the second
//! recipe only contributes through shared ingredients and labels, so
//! `score(a, b)` and `score(b, a)` generally differ.

use crate::planner_config::AffinityWeights;
use crate::recipe_model::{MealPreferences, RecipeFeatures, RecipeId};
use std::collections::{BTreeSet, HashSet};

/// Scores candidate recipes against plan members
#[derive(Debug, Clone)]
pub struct AffinityScorer {
    weights: AffinityWeights,
    noisy_labels: BTreeSet<String>,
}

impl AffinityScorer {
    pub fn new(weights: AffinityWeights, noisy_labels: BTreeSet<String>) -> Self {
        Self {
            weights,
            noisy_labels,
        }
    }

    /// Score `candidate` against `member`
    ///
    /// # Arguments
    ///
    /// * `candidate` - Recipe whose calories, time and recency are evaluated
    /// * `member` - Recipe already in the plan
    /// * `prefs` - Calorie and time limits
    /// * `recent_ids` - Recipes eaten within the recency window
    ///
    /// # Returns
    ///
    /// The sum of five independent terms; unknown calories or time contribute nothing.
    pub fn score(
        &self,
        candidate: &RecipeFeatures,
        member: &RecipeFeatures,
        prefs: &MealPreferences,
        recent_ids: &HashSet<RecipeId>,
    ) -> f64 {
        let w = &self.weights;
        let mut score = 0.0;

        let shared_fresh = candidate
            .fresh_ingredients
            .intersection(&member.fresh_ingredients)
            .count();
        score += shared_fresh as f64 * w.shared_ingredient;

        let shared_labels = candidate
            .labels
            .intersection(&member.labels)
            .filter(|title| !self.noisy_labels.contains(*title))
            .count();
        score -= shared_labels as f64 * w.shared_label_penalty;

        if let (Some(limit), Some(calories)) =
            (positive(prefs.max_calories), positive(candidate.calories))
        {
            if calories <= limit {
                score += w.calorie_bonus;
                if limit - calories >= w.light_meal_margin {
                    score += w.light_meal_bonus;
                }
            }
        }

        if let (Some(limit), Some(minutes)) =
            (positive(prefs.max_time), positive(candidate.time_minutes))
        {
            if minutes <= limit {
                score += w.time_bonus;
                if minutes <= w.express_threshold_minutes {
                    score += w.express_bonus;
                }
            }
        }

        if recent_ids.contains(&candidate.id) {
            score -= w.recency_penalty;
        }

        score
    }

    /// Sum of `score(candidate, member)` over every plan member
    pub fn total_score(
        &self,
        candidate: &RecipeFeatures,
        members: &[RecipeFeatures],
        prefs: &MealPreferences,
        recent_ids: &HashSet<RecipeId>,
    ) -> f64 {
        members
            .iter()
            .map(|member| self.score(candidate, member, prefs, recent_ids))
            .sum()
    }

    /// Standalone bonus for a candidate's own calories and time
    ///
    /// Each known value within its limit earns the bonus; over the limit it
    /// costs the same amount. Never excludes a recipe.
    pub fn individual_weight(&self, candidate: &RecipeFeatures, prefs: &MealPreferences) -> f64 {
        let bonus = self.weights.standalone_bonus;
        let mut weight = 0.0;

        if let (Some(limit), Some(calories)) =
            (positive(prefs.max_calories), positive(candidate.calories))
        {
            weight += if calories <= limit { bonus } else { -bonus };
        }

        if let (Some(limit), Some(minutes)) =
            (positive(prefs.max_time), positive(candidate.time_minutes))
        {
            weight += if minutes <= limit { bonus } else { -bonus };
        }

        weight
    }
}

// Zero limits and zero readings count as unset
fn positive<T: PartialOrd + Default + Copy>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_config::PlannerConfig;

    fn scorer() -> AffinityScorer {
        let config = PlannerConfig::default();
        AffinityScorer::new(config.weights, config.noisy_labels)
    }

    fn recipe(id: RecipeId, fresh: &[&str], labels: &[&str]) -> RecipeFeatures {
        RecipeFeatures {
            id,
            fresh_ingredients: fresh.iter().map(|s| s.to_string()).collect(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_fresh_ingredients() {
        let a = recipe(1, &["leek", "potato", "cream"], &[]);
        let b = recipe(2, &["leek", "potato"], &[]);
        let score = scorer().score(&a, &b, &MealPreferences::default(), &HashSet::new());
        assert_eq!(score, 10.0);
    }

    #[test]
    fn test_shared_labels_ignore_noisy_ones() {
        let a = recipe(1, &[], &["Italian", "New", "Dairy Free"]);
        let b = recipe(2, &[], &["Italian", "New", "Dairy Free"]);
        let score = scorer().score(&a, &b, &MealPreferences::default(), &HashSet::new());
        assert_eq!(score, -2.0);
    }

    #[test]
    fn test_calorie_bonus_and_light_margin() {
        let prefs = MealPreferences::default().with_max_calories(700);
        let other = recipe(2, &[], &[]);

        let mut a = recipe(1, &[], &[]);
        a.calories = Some(650);
        assert_eq!(scorer().score(&a, &other, &prefs, &HashSet::new()), 15.0);

        a.calories = Some(600);
        assert_eq!(scorer().score(&a, &other, &prefs, &HashSet::new()), 20.0);

        a.calories = Some(800);
        assert_eq!(scorer().score(&a, &other, &prefs, &HashSet::new()), 0.0);

        a.calories = None;
        assert_eq!(scorer().score(&a, &other, &prefs, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_score_is_directional() {
        let prefs = MealPreferences::default().with_max_time(20);
        let mut a = recipe(1, &[], &[]);
        a.time_minutes = Some(15);
        let mut b = recipe(2, &[], &[]);
        b.time_minutes = Some(90);

        let scorer = scorer();
        assert_eq!(scorer.score(&a, &b, &prefs, &HashSet::new()), 20.0);
        assert_eq!(scorer.score(&b, &a, &prefs, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_time_bonus_without_express() {
        let prefs = MealPreferences::default().with_max_time(45);
        let mut a = recipe(1, &[], &[]);
        a.time_minutes = Some(35);
        let b = recipe(2, &[], &[]);
        assert_eq!(scorer().score(&a, &b, &prefs, &HashSet::new()), 15.0);
    }

    #[test]
    fn test_recency_penalty() {
        let a = recipe(1, &["leek"], &[]);
        let b = recipe(2, &["leek"], &[]);
        let recent: HashSet<RecipeId> = [1].into_iter().collect();
        assert_eq!(scorer().score(&a, &b, &MealPreferences::default(), &recent), -45.0);
        assert_eq!(scorer().score(&b, &a, &MealPreferences::default(), &recent), 5.0);
    }

    #[test]
    fn test_total_score_sums_members() {
        let candidate = recipe(1, &["leek"], &[]);
        let members = vec![recipe(2, &["leek"], &[]), recipe(3, &["leek"], &[])];
        let total = scorer().total_score(
            &candidate,
            &members,
            &MealPreferences::default(),
            &HashSet::new(),
        );
        assert_eq!(total, 10.0);
    }

    #[test]
    fn test_individual_weight() {
        let prefs = MealPreferences::default().with_max_calories(600).with_max_time(30);
        let mut candidate = recipe(1, &[], &[]);

        assert_eq!(scorer().individual_weight(&candidate, &prefs), 0.0);

        candidate.calories = Some(550);
        candidate.time_minutes = Some(45);
        assert_eq!(scorer().individual_weight(&candidate, &prefs), 0.0);

        candidate.time_minutes = Some(25);
        assert_eq!(scorer().individual_weight(&candidate, &prefs), 40.0);

        candidate.calories = Some(900);
        candidate.time_minutes = Some(60);
        assert_eq!(scorer().individual_weight(&candidate, &prefs), -40.0);

        assert_eq!(scorer().individual_weight(&candidate, &MealPreferences::default()), 0.0);
    }
}
