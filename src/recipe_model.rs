//! # Recipe Catalogue Data Model
//!
//! This module defines the recipe read model used by the planner and the
//! in-memory [`Catalogue`] that holds it.
//!
//! ## Core Concepts
//!
//! - **Recipe**: a catalogue meal with its time, nutrition blob and user flags
//! - **Ingredient**: a named ingredient, flagged basic for pantry staples
//! - **RecipeIngredientLink**: a stored `(quantity, unit)` for one recipe ingredient
//! - **Label**: a cuisine, dietary or catalogue tag
//! - **Plan**: an ordered list of optional recipe slots
//!
//! Relationships are explicit identity-keyed maps and join records, so traversal
//! such as "the fresh ingredient names of this recipe" is a lookup, not a pointer.
//!
//! ## Usage
//!
//! ```rust
//! use meal_planner::recipe_model::{Catalogue, Recipe};
//!
//! let mut catalogue = Catalogue::new();
//! catalogue.insert_recipe(Recipe::new(1, "Chicken katsu").with_time_minutes(30));
//! catalogue.attach_label(1, "Japanese");
//! catalogue.add_ingredient_line(1, "chicken breast", 250.0, "g", false);
//!
//! let features = catalogue.features(1).unwrap();
//! assert!(features.fresh_ingredients.contains("chicken breast"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub type RecipeId = i64;
pub type IngredientId = i64;
pub type LabelId = i64;

/// A catalogue recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    /// Unique recipe name
    pub name: String,
    /// Single classification tag (e.g. "Chicken", "Vegetarian", "Other")
    pub category: Option<String>,
    pub servings: Option<i32>,
    pub time_minutes: Option<i32>,
    pub instructions: Option<String>,
    /// Raw nutrition JSON as imported from the catalogue
    pub nutritional_info: Option<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub is_favourite: bool,
    pub is_disliked: bool,
}

impl Recipe {
    pub fn new(id: RecipeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            category: None,
            servings: None,
            time_minutes: None,
            instructions: None,
            nutritional_info: None,
            image_url: None,
            source_url: None,
            is_favourite: false,
            is_disliked: false,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_time_minutes(mut self, minutes: i32) -> Self {
        self.time_minutes = Some(minutes);
        self
    }

    pub fn with_nutrition(mut self, nutrition: Value) -> Self {
        self.nutritional_info = Some(nutrition.to_string());
        self
    }

    /// Set a nutrition blob carrying only calories per portion
    pub fn with_calories(self, kcal: i64) -> Self {
        self.with_nutrition(serde_json::json!({ "per_portion": { "energy_kcal": kcal } }))
    }

    /// Calories per portion, derived from the nutrition blob
    ///
    /// Returns `None` when the blob is absent or does not have the expected shape.
    pub fn calories(&self) -> Option<i64> {
        let raw = self.nutritional_info.as_deref()?;
        let calories = extract_calories(raw);
        if calories.is_none() {
            debug!(recipe_id = self.id, "No usable calorie value in nutrition info");
        }
        calories
    }

    /// Mark or unmark as favourite; a favourite is never disliked
    pub fn set_favourite(&mut self, favourite: bool) {
        self.is_favourite = favourite;
        if favourite {
            self.is_disliked = false;
        }
    }

    /// Mark or unmark as disliked; a disliked recipe is never a favourite
    pub fn set_disliked(&mut self, disliked: bool) {
        self.is_disliked = disliked;
        if disliked {
            self.is_favourite = false;
        }
    }
}

/// Read `per_portion.energy_kcal`, falling back to `kcal` at the top level or
/// inside `per_portion`
pub fn extract_calories(raw: &str) -> Option<i64> {
    let data: Value = serde_json::from_str(raw).ok()?;
    let data = data.as_object()?;

    let portion = match data.get("per_portion") {
        None | Some(Value::Null) => None,
        Some(Value::Object(portion)) => Some(portion),
        Some(_) => return None,
    };

    let present = |value: Option<&Value>| value.filter(|v| !v.is_null()).cloned();

    let kcal = present(portion.and_then(|p| p.get("energy_kcal")))
        .or_else(|| present(data.get("kcal")))
        .or_else(|| present(portion.and_then(|p| p.get("kcal"))))?;

    match kcal {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// A catalogue ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    /// Unique, compared case-insensitively
    pub name: String,
    /// Pantry staple, kept out of aggregated quantities
    pub is_basic: bool,
    /// Shopping-list bucket
    pub category: Option<String>,
}

/// Quantity and unit of one ingredient in one recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredientLink {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    /// Always > 0
    pub quantity: f64,
    /// Stored as parsed, standardized only when aggregating
    pub unit: String,
}

/// A cuisine, dietary or catalogue label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub title: String,
}

/// Lifecycle of a confirmed plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PlanStatus::Active),
            "completed" => Ok(PlanStatus::Completed),
            other => Err(format!("Unknown plan status: {other}")),
        }
    }
}

/// A finalized week of recipes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedPlan {
    pub id: i64,
    pub recipe_ids: Vec<RecipeId>,
    pub date_confirmed: DateTime<Utc>,
    pub status: PlanStatus,
}

/// User preferences applied while scoring candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealPreferences {
    pub max_calories: Option<i64>,
    pub max_time: Option<i32>,
    /// Restrict candidates to vegetarian recipes
    pub veg_only: bool,
}

impl MealPreferences {
    pub fn with_max_calories(mut self, max_calories: i64) -> Self {
        self.max_calories = Some(max_calories);
        self
    }

    pub fn with_max_time(mut self, max_time: i32) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn vegetarian(mut self) -> Self {
        self.veg_only = true;
        self
    }
}

/// Which recipes a replacement may be drawn from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    #[default]
    All,
    Favourites,
}

impl FromStr for ShuffleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ShuffleMode::All),
            "favs" | "favourites" | "favorites" => Ok(ShuffleMode::Favourites),
            other => Err(format!("Unknown shuffle mode: {other}")),
        }
    }
}

/// One week's selection as an ordered list of slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub slots: Vec<Option<RecipeId>>,
}

impl Plan {
    pub fn from_ids(ids: &[RecipeId]) -> Self {
        Self {
            slots: ids.iter().copied().map(Some).collect(),
        }
    }

    /// Recipe ids of the filled slots, in slot order
    pub fn recipe_ids(&self) -> Vec<RecipeId> {
        self.slots.iter().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The per-recipe attributes read by the affinity scorer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFeatures {
    pub id: RecipeId,
    pub calories: Option<i64>,
    pub time_minutes: Option<i32>,
    /// Names of non-basic ingredients
    pub fresh_ingredients: BTreeSet<String>,
    /// All label titles, noisy ones included
    pub labels: BTreeSet<String>,
}

/// In-memory recipe catalogue with identity-keyed maps and join records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalogue {
    recipes: BTreeMap<RecipeId, Recipe>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    labels: BTreeMap<LabelId, Label>,
    links: Vec<RecipeIngredientLink>,
    recipe_labels: BTreeSet<(RecipeId, LabelId)>,
    confirmed_plans: Vec<ConfirmedPlan>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_recipe(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.id, recipe);
    }

    pub fn insert_ingredient(&mut self, ingredient: Ingredient) {
        self.ingredients.insert(ingredient.id, ingredient);
    }

    pub fn insert_label(&mut self, label: Label) {
        self.labels.insert(label.id, label);
    }

    /// Store a link; non-positive quantities and duplicate keys are rejected
    pub fn insert_link(&mut self, link: RecipeIngredientLink) -> bool {
        if link.quantity.is_nan() || link.quantity <= 0.0 {
            return false;
        }
        let exists = self
            .links
            .iter()
            .any(|l| l.recipe_id == link.recipe_id && l.ingredient_id == link.ingredient_id);
        if exists {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn insert_recipe_label(&mut self, recipe_id: RecipeId, label_id: LabelId) {
        self.recipe_labels.insert((recipe_id, label_id));
    }

    pub fn insert_confirmed_plan(&mut self, plan: ConfirmedPlan) {
        self.confirmed_plans.push(plan);
    }

    /// Attach a label by title, creating it if needed
    pub fn attach_label(&mut self, recipe_id: RecipeId, title: &str) -> LabelId {
        let title = title.trim();
        let label_id = match self.labels.values().find(|l| l.title == title) {
            Some(label) => label.id,
            None => {
                let id = next_id(&self.labels);
                self.labels.insert(
                    id,
                    Label {
                        id,
                        title: title.to_string(),
                    },
                );
                id
            }
        };
        self.recipe_labels.insert((recipe_id, label_id));
        label_id
    }

    /// Find an ingredient by name (case-insensitive), creating it if needed
    pub fn ensure_ingredient(&mut self, name: &str, is_basic: bool) -> IngredientId {
        let name = name.trim();
        if let Some(existing) = self.ingredient_by_name(name) {
            return existing.id;
        }
        let id = next_id(&self.ingredients);
        self.ingredients.insert(
            id,
            Ingredient {
                id,
                name: name.to_string(),
                is_basic,
                category: None,
            },
        );
        id
    }

    /// Link an ingredient line to a recipe, creating the ingredient if needed
    ///
    /// Returns `false` when the line was not stored (zero quantity or duplicate).
    pub fn add_ingredient_line(
        &mut self,
        recipe_id: RecipeId,
        name: &str,
        quantity: f64,
        unit: &str,
        is_basic: bool,
    ) -> bool {
        let ingredient_id = self.ensure_ingredient(name, is_basic);
        self.insert_link(RecipeIngredientLink {
            recipe_id,
            ingredient_id,
            quantity,
            unit: unit.to_string(),
        })
    }

    /// Drop every label and ingredient link of a recipe
    pub fn clear_recipe_links(&mut self, recipe_id: RecipeId) {
        self.links.retain(|link| link.recipe_id != recipe_id);
        self.recipe_labels.retain(|&(rid, _)| rid != recipe_id);
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    pub fn recipe_mut(&mut self, id: RecipeId) -> Option<&mut Recipe> {
        self.recipes.get_mut(&id)
    }

    pub fn recipe_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.values().find(|r| r.name == name)
    }

    /// All recipes in id order
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn recipe_ids(&self) -> Vec<RecipeId> {
        self.recipes.keys().copied().collect()
    }

    pub fn next_recipe_id(&self) -> RecipeId {
        next_id(&self.recipes)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<&Ingredient> {
        self.ingredients.get(&id)
    }

    pub fn ingredient_mut(&mut self, id: IngredientId) -> Option<&mut Ingredient> {
        self.ingredients.get_mut(&id)
    }

    pub fn ingredient_by_name(&self, name: &str) -> Option<&Ingredient> {
        let wanted = name.trim().to_lowercase();
        self.ingredients
            .values()
            .find(|i| i.name.to_lowercase() == wanted)
    }

    pub fn ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.values()
    }

    pub fn confirmed_plans(&self) -> &[ConfirmedPlan] {
        &self.confirmed_plans
    }

    pub fn confirmed_plans_mut(&mut self) -> &mut Vec<ConfirmedPlan> {
        &mut self.confirmed_plans
    }

    /// Labels attached to a recipe
    pub fn labels_of(&self, recipe_id: RecipeId) -> Vec<&Label> {
        self.recipe_labels
            .range((recipe_id, LabelId::MIN)..=(recipe_id, LabelId::MAX))
            .filter_map(|(_, label_id)| self.labels.get(label_id))
            .collect()
    }

    pub fn label_titles(&self, recipe_id: RecipeId) -> BTreeSet<String> {
        self.labels_of(recipe_id)
            .into_iter()
            .map(|label| label.title.clone())
            .collect()
    }

    /// Ingredient lines of a recipe, in link order
    pub fn ingredient_lines(
        &self,
        recipe_id: RecipeId,
    ) -> Vec<(&Ingredient, &RecipeIngredientLink)> {
        self.links
            .iter()
            .filter(|link| link.recipe_id == recipe_id)
            .filter_map(|link| {
                self.ingredients
                    .get(&link.ingredient_id)
                    .map(|ingredient| (ingredient, link))
            })
            .collect()
    }

    pub fn fresh_ingredient_names(&self, recipe_id: RecipeId) -> BTreeSet<String> {
        self.ingredient_lines(recipe_id)
            .into_iter()
            .filter(|(ingredient, _)| !ingredient.is_basic)
            .map(|(ingredient, _)| ingredient.name.clone())
            .collect()
    }

    /// Scoring attributes of a recipe
    pub fn features(&self, recipe_id: RecipeId) -> Option<RecipeFeatures> {
        let recipe = self.recipes.get(&recipe_id)?;
        Some(RecipeFeatures {
            id: recipe.id,
            calories: recipe.calories(),
            time_minutes: recipe.time_minutes,
            fresh_ingredients: self.fresh_ingredient_names(recipe_id),
            labels: self.label_titles(recipe_id),
        })
    }

    /// Copy of this catalogue restricted to the given recipes and whatever
    /// labels, ingredients and links they reference
    pub fn subset<I>(&self, recipe_ids: I) -> Catalogue
    where
        I: IntoIterator<Item = RecipeId>,
    {
        let mut subset = Catalogue::new();
        for id in recipe_ids {
            if subset.recipes.contains_key(&id) {
                continue;
            }
            let Some(recipe) = self.recipes.get(&id) else {
                continue;
            };
            subset.insert_recipe(recipe.clone());
            for label in self.labels_of(id) {
                subset.insert_label(label.clone());
                subset.insert_recipe_label(id, label.id);
            }
            for (ingredient, link) in self.ingredient_lines(id) {
                subset.insert_ingredient(ingredient.clone());
                subset.links.push(link.clone());
            }
        }
        subset
    }
}

fn next_id<V>(map: &BTreeMap<i64, V>) -> i64 {
    map.keys().next_back().map_or(1, |last| last + 1)
}
