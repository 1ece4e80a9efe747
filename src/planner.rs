//! # Meal Planner Service
//!
//! Composes a recipe store with the scoring, selection and aggregation code.
//! Every call fetches what it needs from the store, works on that snapshot and
//! returns; no state is kept between calls. Plans are plain values handed in
//! and out.

use crate::affinity::AffinityScorer;
use crate::catalogue_import::ParsedRecipe;
use crate::db::{CatalogueWriter, LabelMatch, RecipeQuery, RecipeStore};
use crate::ingredient_classifier::{classify_ingredient, classify_recipe};
use crate::plan_selector::PlanSelector;
use crate::planner_config::PlannerConfig;
use crate::planner_errors::{PlannerError, PlannerResult};
use crate::recipe_model::{
    Catalogue, ConfirmedPlan, MealPreferences, Plan, RecipeFeatures, RecipeId, ShuffleMode,
};
use crate::shopping_list::{synergy_report, ShoppingList, ShoppingListAggregator};
use chrono::{Duration, Utc};
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, info};

/// Category value that means "no category filter"
const ANY_CATEGORY: &str = "All";

/// Plan building, replacement and shopping-list generation over a store
pub struct MealPlanner<S> {
    store: S,
    config: PlannerConfig,
    scorer: AffinityScorer,
}

fn all_features(catalogue: &Catalogue) -> Vec<RecipeFeatures> {
    catalogue
        .recipe_ids()
        .into_iter()
        .filter_map(|id| catalogue.features(id))
        .collect()
}

fn features_in_order(catalogue: &Catalogue, ids: &[RecipeId]) -> Vec<RecipeFeatures> {
    ids.iter().filter_map(|&id| catalogue.features(id)).collect()
}

impl<S: RecipeStore> MealPlanner<S> {
    pub fn new(store: S, config: PlannerConfig) -> Self {
        let scorer = AffinityScorer::new(config.weights.clone(), config.noisy_labels.clone());
        Self {
            store,
            config,
            scorer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Recipes from plans confirmed within the recency window
    async fn recent_ids(&self) -> PlannerResult<HashSet<RecipeId>> {
        let days = self.config.recency_days;
        let since = Duration::try_days(days)
            .filter(|_| days >= 0)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or(PlannerError::RecencyWindow(days))?;
        let recent = self.store.recent_recipe_ids(since).await?;
        debug!(recent = recent.len(), days = self.config.recency_days, "Loaded recent recipes");
        Ok(recent)
    }

    /// Build a plan of up to `count` recipes starting from `seed_id`
    ///
    /// The seed is always the first slot. The plan is shorter than `count` only
    /// when the candidate pool runs out.
    ///
    /// # Errors
    ///
    /// [`PlannerError::SeedNotFound`] when the seed recipe does not exist.
    pub async fn suggest_meal_plan<R: Rng + ?Sized>(
        &self,
        seed_id: RecipeId,
        count: usize,
        prefs: &MealPreferences,
        rng: &mut R,
    ) -> PlannerResult<Plan> {
        let seed_catalogue = self.store.fetch_catalogue(&RecipeQuery::by_ids(&[seed_id])).await?;
        let seed = seed_catalogue
            .features(seed_id)
            .ok_or(PlannerError::SeedNotFound(seed_id))?;

        let recent = self.recent_ids().await?;

        let mut query = RecipeQuery::all().excluding(&[seed_id]);
        if prefs.veg_only {
            query = query.with_label(LabelMatch::Equals(self.config.vegetarian_label.clone()));
        }
        let candidates = self.store.fetch_catalogue(&query).await?;

        let selector = PlanSelector::new(&self.scorer);
        let ids = selector.build_plan(seed, all_features(&candidates), count, prefs, &recent, rng)?;

        info!(seed_id, requested = count, planned = ids.len(), "Suggested meal plan");
        Ok(Plan::from_ids(&ids))
    }

    /// Draw one recipe to sit alongside `fixed_ids`
    ///
    /// In favourites mode an empty favourites pool falls back to all recipes
    /// once. Returns `Ok(None)` when no candidate is left.
    pub async fn suggest_replacement<R: Rng + ?Sized>(
        &self,
        fixed_ids: &[RecipeId],
        exclude_ids: &[RecipeId],
        prefs: &MealPreferences,
        mode: ShuffleMode,
        rng: &mut R,
    ) -> PlannerResult<Option<RecipeId>> {
        let fixed_catalogue = self.store.fetch_catalogue(&RecipeQuery::by_ids(fixed_ids)).await?;
        let fixed = features_in_order(&fixed_catalogue, fixed_ids);
        let recent = self.recent_ids().await?;

        let mut query = RecipeQuery::all().excluding(exclude_ids);
        if prefs.veg_only {
            query = query.with_label(LabelMatch::Contains(self.config.vegetarian_label.clone()));
        }

        let mut candidates = match mode {
            ShuffleMode::Favourites => {
                self.store
                    .fetch_catalogue(&query.clone().favourite(true))
                    .await?
            }
            ShuffleMode::All => Catalogue::new(),
        };
        if candidates.is_empty() {
            if mode == ShuffleMode::Favourites {
                info!("No favourites match the filters, drawing from all recipes");
            }
            candidates = self.store.fetch_catalogue(&query).await?;
        }

        let selector = PlanSelector::new(&self.scorer);
        let picked =
            selector.pick_replacement(&fixed, &all_features(&candidates), prefs, &recent, rng)?;

        debug!(picked = ?picked, candidates = candidates.len(), "Suggested replacement");
        Ok(picked)
    }

    /// Replace the recipe in slot `index` and return the updated plan
    ///
    /// The other filled slots are scored against; every recipe currently in
    /// the plan is excluded from the draw.
    ///
    /// # Errors
    ///
    /// [`PlannerError::SlotOutOfRange`] for a bad index and
    /// [`PlannerError::NoCandidates`] when nothing can be drawn.
    pub async fn replace_slot<R: Rng + ?Sized>(
        &self,
        plan: &Plan,
        index: usize,
        prefs: &MealPreferences,
        mode: ShuffleMode,
        rng: &mut R,
    ) -> PlannerResult<Plan> {
        if index >= plan.len() {
            return Err(PlannerError::SlotOutOfRange {
                index,
                len: plan.len(),
            });
        }

        let fixed: Vec<RecipeId> = plan
            .slots
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .filter_map(|(_, slot)| *slot)
            .collect();
        let exclude = plan.recipe_ids();

        let replacement = self
            .suggest_replacement(&fixed, &exclude, prefs, mode, rng)
            .await?
            .ok_or(PlannerError::NoCandidates)?;

        let mut updated = plan.clone();
        updated.slots[index] = Some(replacement);
        info!(index, replacement, "Replaced plan slot");
        Ok(updated)
    }

    /// Draw one non-disliked recipe to add to `existing_ids`
    ///
    /// `category` of `None` or `"All"` applies no category filter. Candidates
    /// over the calorie or time limit are penalized, not excluded.
    pub async fn suggest_single_recipe<R: Rng + ?Sized>(
        &self,
        existing_ids: &[RecipeId],
        category: Option<&str>,
        prefs: &MealPreferences,
        rng: &mut R,
    ) -> PlannerResult<Option<RecipeId>> {
        let recent = self.recent_ids().await?;

        let locked = if existing_ids.is_empty() {
            Vec::new()
        } else {
            let catalogue = self.store.fetch_catalogue(&RecipeQuery::by_ids(existing_ids)).await?;
            features_in_order(&catalogue, existing_ids)
        };

        let mut query = RecipeQuery::all().disliked(false).excluding(existing_ids);
        if let Some(category) = category.filter(|c| !c.eq_ignore_ascii_case(ANY_CATEGORY)) {
            query = query.in_category(category);
        }
        let candidates = self.store.fetch_catalogue(&query).await?;

        let selector = PlanSelector::new(&self.scorer);
        let picked =
            selector.pick_single(&locked, &all_features(&candidates), prefs, &recent, rng)?;

        debug!(picked = ?picked, candidates = candidates.len(), "Suggested single recipe");
        Ok(picked)
    }

    /// Fresh ingredients shared by two or more of the given recipes
    pub async fn synergy_report(&self, recipe_ids: &[RecipeId]) -> PlannerResult<Vec<String>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        let catalogue = self.store.fetch_catalogue(&RecipeQuery::by_ids(recipe_ids)).await?;
        Ok(synergy_report(recipe_ids, &catalogue))
    }

    /// Aggregate a finalized selection into a grouped shopping list
    ///
    /// # Errors
    ///
    /// [`PlannerError::EmptySelection`] when `recipe_ids` is empty.
    pub async fn generate_shopping_list(
        &self,
        recipe_ids: &[RecipeId],
    ) -> PlannerResult<ShoppingList> {
        if recipe_ids.is_empty() {
            return Err(PlannerError::EmptySelection);
        }
        let catalogue = self.store.fetch_catalogue(&RecipeQuery::by_ids(recipe_ids)).await?;
        ShoppingListAggregator::new(&self.config.label_constraints, self.config.max_plan_size)
            .aggregate(recipe_ids, &catalogue)
    }
}

impl<S: RecipeStore + CatalogueWriter> MealPlanner<S> {
    /// Store a parsed catalogue recipe
    pub async fn import_recipe(&self, recipe: &ParsedRecipe) -> PlannerResult<RecipeId> {
        self.store.upsert_recipe(recipe).await
    }

    /// Persist the filled slots of a plan as the new active plan
    pub async fn confirm_plan(&self, plan: &Plan) -> PlannerResult<ConfirmedPlan> {
        let ids = plan.recipe_ids();
        if ids.is_empty() {
            return Err(PlannerError::EmptySelection);
        }
        self.store.confirm_plan(&ids).await
    }

    /// Flip the favourite flag; `Ok(None)` when the recipe does not exist
    pub async fn toggle_favourite(&self, recipe_id: RecipeId) -> PlannerResult<Option<bool>> {
        let Some(recipe) = self.store.fetch_recipe(recipe_id).await? else {
            return Ok(None);
        };
        let favourite = !recipe.is_favourite;
        self.store.set_favourite(recipe_id, favourite).await?;
        Ok(Some(favourite))
    }

    /// Flip the disliked flag; `Ok(None)` when the recipe does not exist
    pub async fn toggle_disliked(&self, recipe_id: RecipeId) -> PlannerResult<Option<bool>> {
        let Some(recipe) = self.store.fetch_recipe(recipe_id).await? else {
            return Ok(None);
        };
        let disliked = !recipe.is_disliked;
        self.store.set_disliked(recipe_id, disliked).await?;
        Ok(Some(disliked))
    }

    /// Assign a shopping category to every stored ingredient
    ///
    /// Returns the number of ingredients whose category changed.
    pub async fn reclassify_ingredients(&self) -> PlannerResult<usize> {
        let catalogue = self.store.fetch_catalogue(&RecipeQuery::all()).await?;
        let mut updated = 0;

        for ingredient in catalogue.ingredients() {
            let category = classify_ingredient(&ingredient.name);
            if ingredient.category.as_deref() == Some(category.as_str()) {
                continue;
            }
            if self.store.set_ingredient_category(ingredient.id, category.as_str()).await? {
                debug!(ingredient = %ingredient.name, %category, "Classified ingredient");
                updated += 1;
            }
        }

        info!(updated, "Ingredient classification complete");
        Ok(updated)
    }

    /// Assign a main-protein category to every stored recipe
    ///
    /// Returns the number of recipes whose category changed.
    pub async fn reclassify_recipes(&self) -> PlannerResult<usize> {
        let catalogue = self.store.fetch_catalogue(&RecipeQuery::all()).await?;
        let mut updated = 0;

        for recipe in catalogue.recipes() {
            let ingredient_names = catalogue
                .ingredient_lines(recipe.id)
                .into_iter()
                .map(|(ingredient, _)| ingredient.name.as_str());
            let category = classify_recipe(catalogue.label_titles(recipe.id), ingredient_names);

            if recipe.category.as_deref() == Some(category.as_str()) {
                continue;
            }
            if self.store.set_recipe_category(recipe.id, category.as_str()).await? {
                debug!(recipe_id = recipe.id, %category, "Classified recipe");
                updated += 1;
            }
        }

        info!(updated, "Recipe classification complete");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::recipe_model::Recipe;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalogue() -> Catalogue {
        let mut catalogue = Catalogue::new();
        for id in 1..=6 {
            catalogue.insert_recipe(Recipe::new(id, &format!("Recipe {id}")).with_time_minutes(30));
            catalogue.add_ingredient_line(id, "onion", 1.0, "item", false);
            catalogue.add_ingredient_line(id, "salt", 1.0, "to taste", true);
        }
        catalogue.attach_label(2, "Vegetarian");
        catalogue.attach_label(3, "Vegetarian");
        catalogue
    }

    fn planner() -> MealPlanner<MemoryStore> {
        MealPlanner::new(MemoryStore::new(catalogue()), PlannerConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_seed_fails_fast() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = planner()
            .suggest_meal_plan(99, 5, &MealPreferences::default(), &mut rng)
            .await;
        assert!(matches!(result, Err(PlannerError::SeedNotFound(99))));
    }

    #[tokio::test]
    async fn test_plan_starts_with_seed() {
        let mut rng = StdRng::seed_from_u64(2);
        let plan = planner()
            .suggest_meal_plan(4, 5, &MealPreferences::default(), &mut rng)
            .await
            .unwrap();

        assert_eq!(plan.len(), 5);
        assert_eq!(plan.slots[0], Some(4));
    }

    #[tokio::test]
    async fn test_vegetarian_plan_only_draws_vegetarian() {
        let mut rng = StdRng::seed_from_u64(3);
        let plan = planner()
            .suggest_meal_plan(1, 5, &MealPreferences::default().vegetarian(), &mut rng)
            .await
            .unwrap();

        let mut drawn = plan.recipe_ids()[1..].to_vec();
        drawn.sort();
        assert_eq!(drawn, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_unrepresentable_recency_window_is_an_error() {
        for days in [200_000_000, -1] {
            let config = PlannerConfig::default().with_recency_days(days);
            let planner = MealPlanner::new(MemoryStore::new(catalogue()), config);
            let mut rng = StdRng::seed_from_u64(7);
            let result = planner
                .suggest_single_recipe(&[1], None, &MealPreferences::default(), &mut rng)
                .await;
            assert!(matches!(result, Err(PlannerError::RecencyWindow(d)) if d == days));
        }
    }

    #[tokio::test]
    async fn test_replace_slot_checks_index() {
        let mut rng = StdRng::seed_from_u64(4);
        let plan = Plan::from_ids(&[1, 2]);
        let result = planner()
            .replace_slot(&plan, 2, &MealPreferences::default(), ShuffleMode::All, &mut rng)
            .await;
        assert!(matches!(
            result,
            Err(PlannerError::SlotOutOfRange { index: 2, len: 2 })
        ));
    }

    #[tokio::test]
    async fn test_replace_slot_without_candidates() {
        let mut rng = StdRng::seed_from_u64(5);
        let plan = Plan::from_ids(&[1, 2, 3, 4, 5, 6]);
        let result = planner()
            .replace_slot(&plan, 0, &MealPreferences::default(), ShuffleMode::All, &mut rng)
            .await;
        assert!(matches!(result, Err(PlannerError::NoCandidates)));
    }

    #[tokio::test]
    async fn test_favourites_fall_back_to_all() {
        let mut rng = StdRng::seed_from_u64(6);
        let picked = planner()
            .suggest_replacement(
                &[1],
                &[1, 2, 3, 4, 5],
                &MealPreferences::default(),
                ShuffleMode::Favourites,
                &mut rng,
            )
            .await
            .unwrap();
        assert_eq!(picked, Some(6));
    }

    #[tokio::test]
    async fn test_single_recipe_skips_disliked() {
        let planner = planner();
        for id in 2..=6 {
            planner.store().set_disliked(id, true).await.unwrap();
        }

        let mut rng = StdRng::seed_from_u64(7);
        let picked = planner
            .suggest_single_recipe(&[], None, &MealPreferences::default(), &mut rng)
            .await
            .unwrap();
        assert_eq!(picked, Some(1));

        let none = planner
            .suggest_single_recipe(&[1], Some("All"), &MealPreferences::default(), &mut rng)
            .await
            .unwrap();
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn test_confirm_empty_plan_is_rejected() {
        let result = planner().confirm_plan(&Plan { slots: vec![None, None] }).await;
        assert!(matches!(result, Err(PlannerError::EmptySelection)));
    }

    #[tokio::test]
    async fn test_toggle_flags() {
        let planner = planner();
        assert_eq!(planner.toggle_favourite(1).await.unwrap(), Some(true));
        assert_eq!(planner.toggle_disliked(1).await.unwrap(), Some(true));

        let recipe = planner.store().fetch_recipe(1).await.unwrap().unwrap();
        assert!(recipe.is_disliked);
        assert!(!recipe.is_favourite);

        assert_eq!(planner.toggle_disliked(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reclassify_recipes_uses_labels() {
        let planner = planner();
        let updated = planner.reclassify_recipes().await.unwrap();
        assert_eq!(updated, 6);

        let recipe = planner.store().fetch_recipe(2).await.unwrap().unwrap();
        assert_eq!(recipe.category.as_deref(), Some("Vegetarian"));
        let recipe = planner.store().fetch_recipe(1).await.unwrap().unwrap();
        assert_eq!(recipe.category.as_deref(), Some("Other"));

        // Second pass changes nothing
        assert_eq!(planner.reclassify_recipes().await.unwrap(), 0);
    }
}
