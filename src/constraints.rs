//! # Label Constraint Validation
//!
//! Checks a recipe selection against per-label `[min, max]` counts. A recipe
//! carrying several constrained labels counts towards each of them.

use crate::planner_config::LabelBounds;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Count of one constrained label against its bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    pub min: usize,
    pub max: usize,
}

impl LabelCount {
    pub fn within_bounds(&self) -> bool {
        LabelBounds::new(self.min, self.max).contains(self.count)
    }
}

/// Outcome of checking a selection against a constraint table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintReport {
    pub counts: Vec<LabelCount>,
}

impl ConstraintReport {
    /// Whether every constrained label is within bounds
    pub fn passed(&self) -> bool {
        self.violations().next().is_none()
    }

    pub fn violations(&self) -> impl Iterator<Item = &LabelCount> {
        self.counts
            .iter()
            .filter(|c| !c.within_bounds())
    }
}

/// Count constrained labels across `recipe_labels`, one label set per recipe
pub fn evaluate_constraints<'a, I>(
    recipe_labels: I,
    constraints: &BTreeMap<String, LabelBounds>,
) -> ConstraintReport
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    let mut counts: BTreeMap<&str, usize> = constraints.keys().map(|k| (k.as_str(), 0)).collect();

    for labels in recipe_labels {
        for title in labels {
            if let Some(count) = counts.get_mut(title.as_str()) {
                *count += 1;
            }
        }
    }

    ConstraintReport {
        counts: constraints
            .iter()
            .map(|(label, bounds)| LabelCount {
                label: label.clone(),
                count: counts.get(label.as_str()).copied().unwrap_or(0),
                min: bounds.min,
                max: bounds.max,
            })
            .collect(),
    }
}

/// Whether the selection satisfies every constraint
pub fn check_constraints<'a, I>(
    recipe_labels: I,
    constraints: &BTreeMap<String, LabelBounds>,
) -> bool
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    evaluate_constraints(recipe_labels, constraints).passed()
}
