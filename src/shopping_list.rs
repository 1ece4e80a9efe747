//! # Shopping List Aggregation
//!
//! Turns a finalized recipe selection into a grouped shopping list:
//!
//! 1. Unknown and repeated ids are dropped; selections larger than the plan
//!    size limit keep their first entries.
//! 2. Label constraints are checked and reported, never enforced.
//! 3. Basic ingredients go to a flat checklist without quantities.
//! 4. Everything else is converted to base units and summed per
//!    `(title-cased name, unit)`.
//! 5. Summed items are grouped by the ingredient's stored shopping category.

use crate::constraints::{evaluate_constraints, ConstraintReport};
use crate::ingredient_classifier::ShoppingCategory;
use crate::planner_config::LabelBounds;
use crate::planner_errors::{PlannerError, PlannerResult};
use crate::recipe_model::{Catalogue, RecipeId};
use crate::unit_standardizer::standardize;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// One aggregated line of the shopping list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Grouped shopping list for a recipe selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingList {
    /// Every category is present, possibly with no items
    pub grouped_shopping_list: BTreeMap<ShoppingCategory, Vec<ShoppingItem>>,
    /// Title-cased basic ingredients, first occurrence order
    pub basics_check_list: Vec<String>,
    /// Number of recipes aggregated
    pub total_recipes: usize,
    /// Recipes aggregated, in selection order
    pub recipe_ids: Vec<RecipeId>,
    pub constraints_satisfied: bool,
    pub constraint_report: ConstraintReport,
}

impl ShoppingList {
    pub fn items(&self, category: ShoppingCategory) -> &[ShoppingItem] {
        self.grouped_shopping_list
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn item_count(&self) -> usize {
        self.grouped_shopping_list.values().map(Vec::len).sum()
    }
}

/// Builds shopping lists from a pre-loaded catalogue
pub struct ShoppingListAggregator<'a> {
    constraints: &'a BTreeMap<String, LabelBounds>,
    max_plan_size: usize,
}

impl<'a> ShoppingListAggregator<'a> {
    pub fn new(constraints: &'a BTreeMap<String, LabelBounds>, max_plan_size: usize) -> Self {
        Self {
            constraints,
            max_plan_size,
        }
    }

    /// Keep the known recipes of a selection, in order, up to the plan size limit
    pub fn select_recipes(&self, recipe_ids: &[RecipeId], catalogue: &Catalogue) -> Vec<RecipeId> {
        let mut seen = HashSet::new();
        let mut selected: Vec<RecipeId> = Vec::new();

        for &id in recipe_ids {
            if !seen.insert(id) {
                continue;
            }
            if catalogue.recipe(id).is_none() {
                warn!(recipe_id = id, "Selected recipe not found, skipping");
                continue;
            }
            selected.push(id);
        }

        if selected.len() > self.max_plan_size {
            warn!(
                selected = selected.len(),
                max_plan_size = self.max_plan_size,
                "Selection exceeds plan size, keeping the first recipes"
            );
            selected.truncate(self.max_plan_size);
        }

        selected
    }

    /// Aggregate the ingredients of `recipe_ids` into a grouped shopping list
    ///
    /// # Errors
    ///
    /// [`PlannerError::EmptySelection`] when no ids are given.
    pub fn aggregate(
        &self,
        recipe_ids: &[RecipeId],
        catalogue: &Catalogue,
    ) -> PlannerResult<ShoppingList> {
        if recipe_ids.is_empty() {
            return Err(PlannerError::EmptySelection);
        }

        let selected = self.select_recipes(recipe_ids, catalogue);

        let label_sets: Vec<_> = selected.iter().map(|&id| catalogue.label_titles(id)).collect();
        let report = evaluate_constraints(&label_sets, self.constraints);
        let constraints_satisfied = report.passed();
        if !constraints_satisfied {
            let failing: Vec<&str> = report.violations().map(|v| v.label.as_str()).collect();
            warn!(labels = ?failing, "Selection does not meet label constraints, continuing");
        }

        let mut basics: Vec<String> = Vec::new();
        let mut items: Vec<(ShoppingCategory, ShoppingItem)> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        for &recipe_id in &selected {
            for (ingredient, link) in catalogue.ingredient_lines(recipe_id) {
                let name = title_case(&ingredient.name);

                if ingredient.is_basic {
                    if !basics.contains(&name) {
                        basics.push(name);
                    }
                    continue;
                }

                let (quantity, unit) = standardize(link.quantity, &link.unit);
                let key = (name, unit);
                match index.get(&key) {
                    Some(&position) => items[position].1.quantity += quantity,
                    None => {
                        let category =
                            ShoppingCategory::from_stored(ingredient.category.as_deref());
                        index.insert(key.clone(), items.len());
                        items.push((
                            category,
                            ShoppingItem {
                                name: key.0,
                                quantity,
                                unit: key.1,
                            },
                        ));
                    }
                }
            }
        }

        let mut grouped: BTreeMap<ShoppingCategory, Vec<ShoppingItem>> = ShoppingCategory::ALL
            .into_iter()
            .map(|category| (category, Vec::new()))
            .collect();
        for (category, item) in items {
            grouped.entry(category).or_default().push(item);
        }

        info!(
            recipes = selected.len(),
            basics = basics.len(),
            "Generated shopping list"
        );

        Ok(ShoppingList {
            grouped_shopping_list: grouped,
            basics_check_list: basics,
            total_recipes: selected.len(),
            recipe_ids: selected,
            constraints_satisfied,
            constraint_report: report,
        })
    }
}

/// Fresh ingredient names shared by two or more of the given recipes
///
/// Names are title-cased and listed in first-seen order.
pub fn synergy_report(recipe_ids: &[RecipeId], catalogue: &Catalogue) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut seen_recipes = HashSet::new();

    for &recipe_id in recipe_ids {
        if !seen_recipes.insert(recipe_id) {
            continue;
        }
        let fresh: BTreeSet<String> = catalogue
            .fresh_ingredient_names(recipe_id)
            .iter()
            .map(|name| title_case(name))
            .collect();

        for name in fresh {
            let count = counts.entry(name.clone()).or_insert(0);
            if *count == 0 {
                order.push(name);
            }
            *count += 1;
        }
    }

    let shared: Vec<String> = order
        .into_iter()
        .filter(|name| counts.get(name).copied().unwrap_or(0) > 1)
        .collect();
    debug!(shared = shared.len(), "Computed synergy report");
    shared
}

/// Capitalize the first letter of every word and lower-case the rest
///
/// A word starts after any non-alphabetic character, so `"jack's"` becomes
/// `"Jack'S"` and `"half-fat"` becomes `"Half-Fat"`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner_config::PlannerConfig;
    use crate::recipe_model::Recipe;

    fn catalogue_with_onions() -> Catalogue {
        let mut catalogue = Catalogue::new();
        catalogue.insert_recipe(Recipe::new(1, "Onion soup"));
        catalogue.insert_recipe(Recipe::new(2, "Onion tart"));
        catalogue.add_ingredient_line(1, "onion", 200.0, "g", false);
        catalogue.add_ingredient_line(2, "onion", 200.0, "g", false);
        catalogue.add_ingredient_line(1, "salt", 1.0, "to taste", true);
        catalogue.add_ingredient_line(2, "salt", 1.0, "to taste", true);
        let onion = catalogue.ingredient_by_name("onion").unwrap().id;
        catalogue.ingredient_mut(onion).unwrap().category = Some("Veg".to_string());
        catalogue
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("red onion"), "Red Onion");
        assert_eq!(title_case("BABY spinach"), "Baby Spinach");
        assert_eq!(title_case("half-fat crème fraîche"), "Half-Fat Crème Fraîche");
        assert_eq!(title_case("jack's 2nd mix"), "Jack'S 2Nd Mix");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_same_ingredient_is_summed_once() {
        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);

        let list = aggregator.aggregate(&[1, 2], &catalogue_with_onions()).unwrap();

        let veg = list.items(ShoppingCategory::Veg);
        assert_eq!(veg.len(), 1);
        assert_eq!(veg[0].name, "Onion");
        assert_eq!(veg[0].quantity, 400.0);
        assert_eq!(veg[0].unit, "g");
        assert_eq!(list.item_count(), 1);
        assert_eq!(list.basics_check_list, vec!["Salt".to_string()]);
        assert_eq!(list.total_recipes, 2);
    }

    #[test]
    fn test_units_are_standardized_before_summing() {
        let mut catalogue = Catalogue::new();
        catalogue.insert_recipe(Recipe::new(1, "A"));
        catalogue.insert_recipe(Recipe::new(2, "B"));
        catalogue.insert_recipe(Recipe::new(3, "C"));
        catalogue.add_ingredient_line(1, "milk", 0.5, "l", false);
        catalogue.add_ingredient_line(2, "milk", 250.0, "ml", false);
        catalogue.add_ingredient_line(3, "Milk", 2.0, "item", false);

        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);
        let list = aggregator.aggregate(&[1, 2, 3], &catalogue).unwrap();

        let other = list.items(ShoppingCategory::Other);
        assert_eq!(other.len(), 2);
        assert_eq!(
            other[0],
            ShoppingItem {
                name: "Milk".into(),
                quantity: 750.0,
                unit: "ml".into()
            }
        );
        assert_eq!(other[1].unit, "item");
    }

    #[test]
    fn test_empty_selection_is_an_error() {
        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);
        let result = aggregator.aggregate(&[], &Catalogue::new());
        assert!(matches!(result, Err(PlannerError::EmptySelection)));
    }

    #[test]
    fn test_oversized_selection_is_truncated() {
        let mut catalogue = Catalogue::new();
        for id in 1..=7 {
            catalogue.insert_recipe(Recipe::new(id, &format!("Recipe {id}")));
            catalogue.add_ingredient_line(id, &format!("ingredient {id}"), 1.0, "item", false);
        }

        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);
        let list = aggregator.aggregate(&[7, 6, 5, 4, 3, 2, 1], &catalogue).unwrap();

        assert_eq!(list.recipe_ids, vec![7, 6, 5, 4, 3]);
        assert_eq!(list.total_recipes, 5);
        assert_eq!(list.item_count(), 5);
    }

    #[test]
    fn test_constraint_failure_does_not_block() {
        let mut catalogue = catalogue_with_onions();
        for id in [1, 2] {
            catalogue.attach_label(id, "Spicy");
        }
        catalogue.insert_recipe(Recipe::new(3, "Vindaloo"));
        catalogue.attach_label(3, "Spicy");

        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);
        let list = aggregator.aggregate(&[1, 2, 3], &catalogue).unwrap();

        assert!(!list.constraints_satisfied);
        assert!(list.constraint_report.violations().any(|v| v.label == "Spicy"));
        assert_eq!(list.items(ShoppingCategory::Veg)[0].quantity, 400.0);
    }

    #[test]
    fn test_unknown_and_repeated_ids_are_skipped() {
        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);
        let list = aggregator.aggregate(&[1, 1, 99], &catalogue_with_onions()).unwrap();

        assert_eq!(list.recipe_ids, vec![1]);
        assert_eq!(list.items(ShoppingCategory::Veg)[0].quantity, 200.0);
    }

    #[test]
    fn test_every_category_is_present() {
        let config = PlannerConfig::default();
        let aggregator =
            ShoppingListAggregator::new(&config.label_constraints, config.max_plan_size);
        let list = aggregator.aggregate(&[1], &catalogue_with_onions()).unwrap();

        assert_eq!(list.grouped_shopping_list.len(), 7);
        let json = serde_json::to_value(&list).unwrap();
        assert!(json["grouped_shopping_list"]["Bread"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_synergy_report() {
        let mut catalogue = catalogue_with_onions();
        catalogue.insert_recipe(Recipe::new(3, "Leek gratin"));
        catalogue.add_ingredient_line(3, "leek", 2.0, "item", false);
        catalogue.add_ingredient_line(3, "salt", 1.0, "to taste", true);

        assert_eq!(synergy_report(&[1, 2, 3], &catalogue), vec!["Onion".to_string()]);
        assert!(synergy_report(&[1, 3], &catalogue).is_empty());
        assert!(synergy_report(&[1, 1], &catalogue).is_empty());
    }
}
