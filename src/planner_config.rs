//! # Planner Configuration Module
//!
//! This module defines the tuning tables read by the planner: affinity weights,
//! label diversity constraints, catalogue labels that carry no cuisine signal,
//! and plan size limits.

use std::collections::{BTreeMap, BTreeSet};

// Constants for planner configuration
pub const DEFAULT_MAX_PLAN_SIZE: usize = 5;
pub const DEFAULT_RECENCY_DAYS: i64 = 14;
pub const DEFAULT_VEGETARIAN_LABEL: &str = "Vegetarian";

/// Catalogue metadata labels that say nothing about cuisine
pub const NOISY_LABELS: [&str; 4] = [
    "All Gousto Recipes",
    "Gluten Free Recipes",
    "Dairy Free",
    "New",
];

/// Inclusive `[min, max]` bound on how many plan members may carry a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBounds {
    pub min: usize,
    pub max: usize,
}

impl LabelBounds {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

/// Weights applied by the affinity scorer
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityWeights {
    /// Bonus per fresh ingredient shared by two recipes
    pub shared_ingredient: f64,
    /// Penalty per cuisine label shared by two recipes
    pub shared_label_penalty: f64,
    /// Bonus when calories are within the limit
    pub calorie_bonus: f64,
    /// Extra bonus for light meals
    pub light_meal_bonus: f64,
    /// Margin below the calorie limit that makes a meal light
    pub light_meal_margin: i64,
    /// Bonus when cooking time is within the limit
    pub time_bonus: f64,
    /// Extra bonus for express meals
    pub express_bonus: f64,
    /// Cooking time at or under which a meal is express
    pub express_threshold_minutes: i32,
    /// Penalty for recipes eaten within the recency window
    pub recency_penalty: f64,
    /// Standalone bonus (or penalty) for a candidate's own calories and time
    pub standalone_bonus: f64,
}

impl Default for AffinityWeights {
    fn default() -> Self {
        Self {
            shared_ingredient: 5.0,
            shared_label_penalty: 2.0,
            calorie_bonus: 15.0,
            light_meal_bonus: 5.0,
            light_meal_margin: 100, // kcal
            time_bonus: 15.0,
            express_bonus: 5.0,
            express_threshold_minutes: 20,
            recency_penalty: 50.0,
            standalone_bonus: 20.0,
        }
    }
}

/// Configuration structure for plan building and shopping-list generation
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Label title to inclusive count bounds
    pub label_constraints: BTreeMap<String, LabelBounds>,
    /// Labels ignored when comparing cuisines
    pub noisy_labels: BTreeSet<String>,
    /// Largest selection turned into a shopping list
    pub max_plan_size: usize,
    /// Trailing window, in days, for the recency penalty
    pub recency_days: i64,
    /// Label a recipe must carry when only vegetarian meals are wanted
    pub vegetarian_label: String,
    /// Affinity scoring weights
    pub weights: AffinityWeights,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let mut label_constraints = BTreeMap::new();
        label_constraints.insert("Spicy".to_string(), LabelBounds::new(0, 2));
        label_constraints.insert("Quick".to_string(), LabelBounds::new(1, 7));
        label_constraints.insert("Healthy".to_string(), LabelBounds::new(2, 7));
        label_constraints.insert("Vegetarian".to_string(), LabelBounds::new(0, 7));

        Self {
            label_constraints,
            noisy_labels: NOISY_LABELS.iter().map(|label| label.to_string()).collect(),
            max_plan_size: DEFAULT_MAX_PLAN_SIZE,
            recency_days: DEFAULT_RECENCY_DAYS,
            vegetarian_label: DEFAULT_VEGETARIAN_LABEL.to_string(),
            weights: AffinityWeights::default(),
        }
    }
}

impl PlannerConfig {
    pub fn with_max_plan_size(mut self, max_plan_size: usize) -> Self {
        self.max_plan_size = max_plan_size;
        self
    }

    pub fn with_recency_days(mut self, recency_days: i64) -> Self {
        self.recency_days = recency_days;
        self
    }

    pub fn with_label_constraint(mut self, title: &str, bounds: LabelBounds) -> Self {
        self.label_constraints.insert(title.to_string(), bounds);
        self
    }

    pub fn with_weights(mut self, weights: AffinityWeights) -> Self {
        self.weights = weights;
        self
    }
}
