//! # Recipe Store Module
//!
//! Read and write access to the recipe catalogue. The planner only talks to the
//! [`RecipeStore`] and [`CatalogueWriter`] traits; two implementations are
//! provided:
//!
//! - [`MemoryStore`]: an in-memory [`Catalogue`] behind a lock
//! - [`PgRecipeStore`]: PostgreSQL through `sqlx`
//!
//! Reads are eager: a catalogue fetch returns the matched recipes together with
//! their labels, ingredients and ingredient links, so scoring never issues
//! per-recipe follow-up queries.

use crate::catalogue_import::{ParsedRecipe, BASIC_QUANTITY, BASIC_UNIT};
use crate::planner_errors::PlannerResult;
use crate::recipe_model::{
    Catalogue, ConfirmedPlan, Ingredient, IngredientId, Label, PlanStatus, Recipe,
    RecipeId, RecipeIngredientLink,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::collections::{BTreeSet, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How a recipe's label titles are matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMatch {
    /// Title equals the value, ignoring case
    Equals(String),
    /// Title contains the value, ignoring case
    Contains(String),
}

impl LabelMatch {
    fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        match self {
            LabelMatch::Equals(wanted) => title == wanted.to_lowercase(),
            LabelMatch::Contains(wanted) => title.contains(&wanted.to_lowercase()),
        }
    }
}

/// Predicates for a catalogue fetch; unset fields do not filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub ids: Option<Vec<RecipeId>>,
    pub exclude_ids: Vec<RecipeId>,
    /// Category equals, ignoring case
    pub category: Option<String>,
    pub favourite: Option<bool>,
    pub disliked: Option<bool>,
    pub label: Option<LabelMatch>,
    /// Name contains, ignoring case
    pub name_contains: Option<String>,
}

impl RecipeQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_ids(ids: &[RecipeId]) -> Self {
        Self {
            ids: Some(ids.to_vec()),
            ..Self::default()
        }
    }

    pub fn excluding(mut self, ids: &[RecipeId]) -> Self {
        self.exclude_ids.extend_from_slice(ids);
        self
    }

    pub fn in_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn favourite(mut self, favourite: bool) -> Self {
        self.favourite = Some(favourite);
        self
    }

    pub fn disliked(mut self, disliked: bool) -> Self {
        self.disliked = Some(disliked);
        self
    }

    pub fn with_label(mut self, label: LabelMatch) -> Self {
        self.label = Some(label);
        self
    }

    pub fn name_contains(mut self, fragment: &str) -> Self {
        self.name_contains = Some(fragment.to_string());
        self
    }

    /// Whether a recipe with the given label titles satisfies every predicate
    pub fn matches(&self, recipe: &Recipe, label_titles: &BTreeSet<String>) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&recipe.id) {
                return false;
            }
        }
        if self.exclude_ids.contains(&recipe.id) {
            return false;
        }
        if let Some(category) = &self.category {
            let same = recipe
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == category.to_lowercase());
            if !same {
                return false;
            }
        }
        if self.favourite.is_some_and(|f| recipe.is_favourite != f) {
            return false;
        }
        if self.disliked.is_some_and(|d| recipe.is_disliked != d) {
            return false;
        }
        if let Some(label) = &self.label {
            if !label_titles.iter().any(|title| label.matches(title)) {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            if !recipe.name.to_lowercase().contains(&fragment.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Read access used by the planner
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Fetch one recipe by id
    async fn fetch_recipe(&self, id: RecipeId) -> PlannerResult<Option<Recipe>>;

    /// Fetch the matching recipes with their labels and ingredient links
    async fn fetch_catalogue(&self, query: &RecipeQuery) -> PlannerResult<Catalogue>;

    /// Ids of recipes in any plan confirmed at or after `since`
    async fn recent_recipe_ids(&self, since: DateTime<Utc>) -> PlannerResult<HashSet<RecipeId>>;
}

/// Writes performed around the planner: imports, confirmations, flags and
/// classification results
#[async_trait]
pub trait CatalogueWriter: Send + Sync {
    /// Insert or update a recipe by name, replacing its labels and ingredient links
    async fn upsert_recipe(&self, recipe: &ParsedRecipe) -> PlannerResult<RecipeId>;

    /// Record a new active plan; the previously active plan becomes completed
    async fn confirm_plan(&self, recipe_ids: &[RecipeId]) -> PlannerResult<ConfirmedPlan>;

    /// Returns `false` when the recipe does not exist
    async fn set_favourite(&self, id: RecipeId, favourite: bool) -> PlannerResult<bool>;

    /// Returns `false` when the recipe does not exist
    async fn set_disliked(&self, id: RecipeId, disliked: bool) -> PlannerResult<bool>;

    async fn set_recipe_category(&self, id: RecipeId, category: &str) -> PlannerResult<bool>;

    async fn set_ingredient_category(
        &self,
        id: IngredientId,
        category: &str,
    ) -> PlannerResult<bool>;
}

/// In-memory store backed by a [`Catalogue`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalogue: RwLock<Catalogue>,
}

impl MemoryStore {
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            catalogue: RwLock::new(catalogue),
        }
    }

    /// Copy of the current catalogue
    pub async fn snapshot(&self) -> Catalogue {
        self.catalogue.read().await.clone()
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn fetch_recipe(&self, id: RecipeId) -> PlannerResult<Option<Recipe>> {
        Ok(self.catalogue.read().await.recipe(id).cloned())
    }

    async fn fetch_catalogue(&self, query: &RecipeQuery) -> PlannerResult<Catalogue> {
        let catalogue = self.catalogue.read().await;
        let ids: Vec<RecipeId> = catalogue
            .recipes()
            .filter(|recipe| query.matches(recipe, &catalogue.label_titles(recipe.id)))
            .map(|recipe| recipe.id)
            .collect();
        Ok(catalogue.subset(ids))
    }

    async fn recent_recipe_ids(&self, since: DateTime<Utc>) -> PlannerResult<HashSet<RecipeId>> {
        let catalogue = self.catalogue.read().await;
        Ok(catalogue
            .confirmed_plans()
            .iter()
            .filter(|plan| plan.date_confirmed >= since)
            .flat_map(|plan| plan.recipe_ids.iter().copied())
            .collect())
    }
}

#[async_trait]
impl CatalogueWriter for MemoryStore {
    async fn upsert_recipe(&self, parsed: &ParsedRecipe) -> PlannerResult<RecipeId> {
        let mut catalogue = self.catalogue.write().await;

        let recipe_id = match catalogue.recipe_by_name(&parsed.name) {
            Some(existing) => {
                let id = existing.id;
                catalogue.clear_recipe_links(id);
                id
            }
            None => {
                let id = catalogue.next_recipe_id();
                catalogue.insert_recipe(Recipe::new(id, &parsed.name));
                id
            }
        };

        if let Some(recipe) = catalogue.recipe_mut(recipe_id) {
            recipe.servings = parsed.servings;
            recipe.time_minutes = parsed.time_minutes;
            recipe.instructions = Some(parsed.instructions.clone());
            recipe.nutritional_info = parsed.nutritional_info.clone();
            recipe.source_url = parsed.source_url.clone();
        }

        for title in &parsed.labels {
            catalogue.attach_label(recipe_id, title);
        }

        for name in parsed.unmeasured_basics() {
            let ingredient_id = catalogue.ensure_ingredient(name, true);
            if let Some(ingredient) = catalogue.ingredient_mut(ingredient_id) {
                ingredient.is_basic = true;
            }
            catalogue.insert_link(RecipeIngredientLink {
                recipe_id,
                ingredient_id,
                quantity: BASIC_QUANTITY,
                unit: BASIC_UNIT.to_string(),
            });
        }

        for line in &parsed.ingredients {
            let linked = catalogue.add_ingredient_line(
                recipe_id,
                &line.name,
                line.quantity,
                &line.unit,
                false,
            );
            if !linked {
                warn!(
                    recipe_id,
                    ingredient = %line.name,
                    unit = %line.unit,
                    "Ingredient already linked, keeping first line"
                );
            }
        }

        info!(recipe_id, name = %parsed.name, "Upserted recipe");
        Ok(recipe_id)
    }

    async fn confirm_plan(&self, recipe_ids: &[RecipeId]) -> PlannerResult<ConfirmedPlan> {
        let mut catalogue = self.catalogue.write().await;
        let plans = catalogue.confirmed_plans_mut();

        for plan in plans.iter_mut().filter(|p| p.status == PlanStatus::Active) {
            plan.status = PlanStatus::Completed;
        }

        let plan = ConfirmedPlan {
            id: plans.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            recipe_ids: recipe_ids.to_vec(),
            date_confirmed: Utc::now(),
            status: PlanStatus::Active,
        };
        plans.push(plan.clone());

        info!(plan_id = plan.id, recipes = recipe_ids.len(), "Confirmed plan");
        Ok(plan)
    }

    async fn set_favourite(&self, id: RecipeId, favourite: bool) -> PlannerResult<bool> {
        let mut catalogue = self.catalogue.write().await;
        Ok(match catalogue.recipe_mut(id) {
            Some(recipe) => {
                recipe.set_favourite(favourite);
                true
            }
            None => false,
        })
    }

    async fn set_disliked(&self, id: RecipeId, disliked: bool) -> PlannerResult<bool> {
        let mut catalogue = self.catalogue.write().await;
        Ok(match catalogue.recipe_mut(id) {
            Some(recipe) => {
                recipe.set_disliked(disliked);
                true
            }
            None => false,
        })
    }

    async fn set_recipe_category(&self, id: RecipeId, category: &str) -> PlannerResult<bool> {
        let mut catalogue = self.catalogue.write().await;
        Ok(match catalogue.recipe_mut(id) {
            Some(recipe) => {
                recipe.category = Some(category.to_string());
                true
            }
            None => false,
        })
    }

    async fn set_ingredient_category(
        &self,
        id: IngredientId,
        category: &str,
    ) -> PlannerResult<bool> {
        let mut catalogue = self.catalogue.write().await;
        Ok(match catalogue.ingredient_mut(id) {
            Some(ingredient) => {
                ingredient.category = Some(category.to_string());
                true
            }
            None => false,
        })
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) UNIQUE NOT NULL,
            category VARCHAR(100),
            servings INTEGER,
            time_minutes INTEGER,
            instructions TEXT,
            nutritional_info TEXT,
            is_favourite BOOLEAN NOT NULL DEFAULT FALSE,
            is_disliked BOOLEAN NOT NULL DEFAULT FALSE,
            image_url VARCHAR(500),
            source_url VARCHAR(500),
            CHECK (NOT (is_favourite AND is_disliked))
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipe table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ingredient (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            is_basic BOOLEAN NOT NULL DEFAULT FALSE,
            category VARCHAR(50)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create ingredient table")?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS ingredient_name_lower_idx ON ingredient (LOWER(name))",
    )
    .execute(pool)
        .await
        .context("Failed to create ingredient name index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS label (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(100) UNIQUE NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create label table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe_label (
            recipe_id BIGINT NOT NULL REFERENCES recipe(id) ON DELETE CASCADE,
            label_id BIGINT NOT NULL REFERENCES label(id) ON DELETE CASCADE,
            PRIMARY KEY (recipe_id, label_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipe_label table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe_ingredient (
            recipe_id BIGINT NOT NULL REFERENCES recipe(id) ON DELETE CASCADE,
            ingredient_id BIGINT NOT NULL REFERENCES ingredient(id) ON DELETE CASCADE,
            quantity DOUBLE PRECISION NOT NULL CHECK (quantity > 0),
            unit VARCHAR(50) NOT NULL,
            PRIMARY KEY (recipe_id, ingredient_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipe_ingredient table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS confirmed_plan (
            id BIGSERIAL PRIMARY KEY,
            date_confirmed TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            recipe_ids BIGINT[] NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'active'
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create confirmed_plan table")?;

    // At most one active plan
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS confirmed_plan_active_idx
         ON confirmed_plan (status) WHERE status = 'active'",
    )
    .execute(pool)
    .await
    .context("Failed to create active plan index")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS confirmed_plan_date_idx ON confirmed_plan (date_confirmed)",
    )
    .execute(pool)
        .await
        .context("Failed to create confirmed plan date index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgRecipeStore {
    pool: PgPool,
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const RECIPE_COLUMNS: &str = "r.id, r.name, r.category, r.servings, r.time_minutes, \
     r.instructions, r.nutritional_info, r.is_favourite, r.is_disliked, r.image_url, \
     r.source_url";

fn row_to_recipe(row: &PgRow) -> Result<Recipe, sqlx::Error> {
    Ok(Recipe {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        servings: row.try_get("servings")?,
        time_minutes: row.try_get("time_minutes")?,
        instructions: row.try_get("instructions")?,
        nutritional_info: row.try_get("nutritional_info")?,
        image_url: row.try_get("image_url")?,
        source_url: row.try_get("source_url")?,
        is_favourite: row.try_get("is_favourite")?,
        is_disliked: row.try_get("is_disliked")?,
    })
}

// Escape LIKE wildcards so user text matches literally
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &RecipeQuery) {
    if let Some(ids) = &query.ids {
        builder.push(" AND r.id = ANY(").push_bind(ids.clone()).push(")");
    }
    if !query.exclude_ids.is_empty() {
        builder
            .push(" AND NOT (r.id = ANY(")
            .push_bind(query.exclude_ids.clone())
            .push("))");
    }
    if let Some(category) = &query.category {
        builder
            .push(" AND LOWER(r.category) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(favourite) = query.favourite {
        builder.push(" AND r.is_favourite = ").push_bind(favourite);
    }
    if let Some(disliked) = query.disliked {
        builder.push(" AND r.is_disliked = ").push_bind(disliked);
    }
    if let Some(label) = &query.label {
        builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_label rl JOIN label l ON l.id = rl.label_id \
             WHERE rl.recipe_id = r.id AND ",
        );
        match label {
            LabelMatch::Equals(title) => {
                builder.push("LOWER(l.title) = LOWER(").push_bind(title.clone()).push("))");
            }
            LabelMatch::Contains(fragment) => {
                builder.push("l.title ILIKE ").push_bind(like_pattern(fragment)).push(")");
            }
        }
    }
    if let Some(fragment) = &query.name_contains {
        builder.push(" AND r.name ILIKE ").push_bind(like_pattern(fragment));
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn fetch_recipe(&self, id: RecipeId) -> PlannerResult<Option<Recipe>> {
        debug!("Reading recipe with ID: {}", id);

        let row = sqlx::query(&format!("SELECT {RECIPE_COLUMNS} FROM recipe r WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_recipe).transpose()?)
    }

    async fn fetch_catalogue(&self, query: &RecipeQuery) -> PlannerResult<Catalogue> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipe r WHERE TRUE"
        ));
        push_filters(&mut builder, query);
        builder.push(" ORDER BY r.id");

        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut catalogue = Catalogue::new();
        let mut ids: Vec<RecipeId> = Vec::with_capacity(rows.len());
        for row in &rows {
            let recipe = row_to_recipe(row)?;
            ids.push(recipe.id);
            catalogue.insert_recipe(recipe);
        }

        if ids.is_empty() {
            return Ok(catalogue);
        }

        let label_rows = sqlx::query(
            "SELECT rl.recipe_id, l.id, l.title
             FROM recipe_label rl JOIN label l ON l.id = rl.label_id
             WHERE rl.recipe_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &label_rows {
            let recipe_id: RecipeId = row.try_get("recipe_id")?;
            let label = Label {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
            };
            catalogue.insert_recipe_label(recipe_id, label.id);
            catalogue.insert_label(label);
        }

        let link_rows = sqlx::query(
            "SELECT ri.recipe_id, ri.ingredient_id, ri.quantity, ri.unit,
                    i.name, i.is_basic, i.category
             FROM recipe_ingredient ri JOIN ingredient i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ANY($1)
             ORDER BY ri.recipe_id, ri.ingredient_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &link_rows {
            let ingredient = Ingredient {
                id: row.try_get("ingredient_id")?,
                name: row.try_get("name")?,
                is_basic: row.try_get("is_basic")?,
                category: row.try_get("category")?,
            };
            let link = RecipeIngredientLink {
                recipe_id: row.try_get("recipe_id")?,
                ingredient_id: ingredient.id,
                quantity: row.try_get("quantity")?,
                unit: row.try_get("unit")?,
            };
            catalogue.insert_ingredient(ingredient);
            catalogue.insert_link(link);
        }

        debug!(
            recipes = ids.len(),
            labels = label_rows.len(),
            links = link_rows.len(),
            "Fetched catalogue"
        );
        Ok(catalogue)
    }

    async fn recent_recipe_ids(&self, since: DateTime<Utc>) -> PlannerResult<HashSet<RecipeId>> {
        let plans: Vec<Vec<i64>> =
            sqlx::query_scalar("SELECT recipe_ids FROM confirmed_plan WHERE date_confirmed >= $1")
                .bind(since)
                .fetch_all(&self.pool)
                .await?;

        Ok(plans.into_iter().flatten().collect())
    }
}

#[async_trait]
impl CatalogueWriter for PgRecipeStore {
    async fn upsert_recipe(&self, parsed: &ParsedRecipe) -> PlannerResult<RecipeId> {
        info!("Upserting recipe: {}", parsed.name);

        let mut tx = self.pool.begin().await?;

        let existing: Option<RecipeId> = sqlx::query_scalar("SELECT id FROM recipe WHERE name = $1")
            .bind(&parsed.name)
            .fetch_optional(&mut *tx)
            .await?;

        let recipe_id = match existing {
            Some(id) => {
                sqlx::query("DELETE FROM recipe_ingredient WHERE recipe_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM recipe_label WHERE recipe_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "UPDATE recipe SET servings = $2, time_minutes = $3, instructions = $4,
                            nutritional_info = $5, source_url = $6
                     WHERE id = $1",
                )
                .bind(id)
                .bind(parsed.servings)
                .bind(parsed.time_minutes)
                .bind(&parsed.instructions)
                .bind(&parsed.nutritional_info)
                .bind(&parsed.source_url)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                sqlx::query_scalar(
                    "INSERT INTO recipe
                         (name, servings, time_minutes, instructions, nutritional_info, source_url)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     RETURNING id",
                )
                .bind(&parsed.name)
                .bind(parsed.servings)
                .bind(parsed.time_minutes)
                .bind(&parsed.instructions)
                .bind(&parsed.nutritional_info)
                .bind(&parsed.source_url)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        for title in &parsed.labels {
            let label_id: i64 = sqlx::query_scalar(
                "INSERT INTO label (title) VALUES ($1)
                 ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
                 RETURNING id",
            )
            .bind(title)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO recipe_label (recipe_id, label_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(recipe_id)
            .bind(label_id)
            .execute(&mut *tx)
            .await?;
        }

        let basics = parsed
            .unmeasured_basics()
            .map(|name| (name, BASIC_QUANTITY, BASIC_UNIT, true));
        let main = parsed
            .ingredients
            .iter()
            .map(|line| (line.name.as_str(), line.quantity, line.unit.as_str(), false));

        for (name, quantity, unit, is_basic) in basics.chain(main) {
            let ingredient_id: i64 = sqlx::query_scalar(
                "INSERT INTO ingredient (name, is_basic) VALUES ($1, $2)
                 ON CONFLICT ((LOWER(name)))
                 DO UPDATE SET is_basic = ingredient.is_basic OR EXCLUDED.is_basic
                 RETURNING id",
            )
            .bind(name)
            .bind(is_basic)
            .fetch_one(&mut *tx)
            .await?;

            let inserted = sqlx::query(
                "INSERT INTO recipe_ingredient (recipe_id, ingredient_id, quantity, unit)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (recipe_id, ingredient_id) DO NOTHING",
            )
            .bind(recipe_id)
            .bind(ingredient_id)
            .bind(quantity)
            .bind(unit)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                warn!(
                    recipe_id,
                    ingredient = %name,
                    unit = %unit,
                    "Ingredient already linked, keeping first line"
                );
            }
        }

        tx.commit().await?;

        info!("Recipe upserted with ID: {}", recipe_id);
        Ok(recipe_id)
    }

    async fn confirm_plan(&self, recipe_ids: &[RecipeId]) -> PlannerResult<ConfirmedPlan> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE confirmed_plan SET status = $1 WHERE status = $2")
            .bind(PlanStatus::Completed.as_str())
            .bind(PlanStatus::Active.as_str())
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            "INSERT INTO confirmed_plan (recipe_ids, status) VALUES ($1, $2)
             RETURNING id, date_confirmed",
        )
        .bind(recipe_ids)
        .bind(PlanStatus::Active.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let plan = ConfirmedPlan {
            id: row.try_get("id")?,
            recipe_ids: recipe_ids.to_vec(),
            date_confirmed: row.try_get("date_confirmed")?,
            status: PlanStatus::Active,
        };
        info!("Plan confirmed with ID: {}", plan.id);
        Ok(plan)
    }

    async fn set_favourite(&self, id: RecipeId, favourite: bool) -> PlannerResult<bool> {
        let rows = sqlx::query(
            "UPDATE recipe
             SET is_favourite = $2, is_disliked = CASE WHEN $2 THEN FALSE ELSE is_disliked END
             WHERE id = $1",
        )
        .bind(id)
        .bind(favourite)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn set_disliked(&self, id: RecipeId, disliked: bool) -> PlannerResult<bool> {
        let rows = sqlx::query(
            "UPDATE recipe
             SET is_disliked = $2, is_favourite = CASE WHEN $2 THEN FALSE ELSE is_favourite END
             WHERE id = $1",
        )
        .bind(id)
        .bind(disliked)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows > 0)
    }

    async fn set_recipe_category(&self, id: RecipeId, category: &str) -> PlannerResult<bool> {
        let rows = sqlx::query("UPDATE recipe SET category = $2 WHERE id = $1")
            .bind(id)
            .bind(category)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn set_ingredient_category(
        &self,
        id: IngredientId,
        category: &str,
    ) -> PlannerResult<bool> {
        let rows = sqlx::query("UPDATE ingredient SET category = $2 WHERE id = $1")
            .bind(id)
            .bind(category)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> Recipe {
        let mut recipe = Recipe::new(3, "Thai Green Curry").with_category("Chicken");
        recipe.set_favourite(true);
        recipe
    }

    fn titles(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(RecipeQuery::all().matches(&recipe(), &BTreeSet::new()));
    }

    #[test]
    fn test_id_predicates() {
        assert!(RecipeQuery::by_ids(&[1, 3]).matches(&recipe(), &BTreeSet::new()));
        assert!(!RecipeQuery::by_ids(&[1, 2]).matches(&recipe(), &BTreeSet::new()));
        assert!(!RecipeQuery::all().excluding(&[3]).matches(&recipe(), &BTreeSet::new()));
    }

    #[test]
    fn test_category_and_flags() {
        let labels = BTreeSet::new();
        assert!(RecipeQuery::all().in_category("chicken").matches(&recipe(), &labels));
        assert!(!RecipeQuery::all().in_category("Beef").matches(&recipe(), &labels));
        assert!(RecipeQuery::all().favourite(true).matches(&recipe(), &labels));
        assert!(!RecipeQuery::all().disliked(true).matches(&recipe(), &labels));
    }

    #[test]
    fn test_label_predicates_ignore_case() {
        let labels = titles(&["Thai", "Vegetarian Friendly"]);
        let equals = RecipeQuery::all().with_label(LabelMatch::Equals("vegetarian".into()));
        let contains = RecipeQuery::all().with_label(LabelMatch::Contains("VEGETARIAN".into()));
        assert!(!equals.matches(&recipe(), &labels));
        assert!(contains.matches(&recipe(), &labels));
        assert!(RecipeQuery::all()
            .with_label(LabelMatch::Equals("thai".into()))
            .matches(&recipe(), &labels));
    }

    #[test]
    fn test_name_contains() {
        assert!(RecipeQuery::all().name_contains("green").matches(&recipe(), &BTreeSet::new()));
        assert!(!RecipeQuery::all().name_contains("red").matches(&recipe(), &BTreeSet::new()));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_memory_store_confirm_plan_completes_previous() {
        let store = MemoryStore::default();
        let first = store.confirm_plan(&[1, 2]).await.unwrap();
        let second = store.confirm_plan(&[3]).await.unwrap();

        let catalogue = store.snapshot().await;
        let plans = catalogue.confirmed_plans();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, first.id);
        assert_eq!(plans[0].status, PlanStatus::Completed);
        assert_eq!(plans[1].id, second.id);
        assert_eq!(plans[1].status, PlanStatus::Active);

        let recent = store
            .recent_recipe_ids(Utc::now() - chrono::Duration::days(14))
            .await
            .unwrap();
        assert_eq!(recent, [1, 2, 3].into_iter().collect());
    }

    #[tokio::test]
    async fn test_measured_line_wins_over_basic_of_same_name() {
        use crate::quantity_parser::ParsedIngredientLine;

        let store = MemoryStore::default();
        let parsed = ParsedRecipe {
            name: "Garlic Butter Prawns".to_string(),
            servings: Some(2),
            time_minutes: Some(15),
            instructions: String::new(),
            nutritional_info: None,
            source_url: None,
            labels: vec![],
            basics: vec!["butter".to_string(), "salt".to_string()],
            ingredients: vec![ParsedIngredientLine {
                name: "Butter".to_string(),
                quantity: 30.0,
                unit: "g".to_string(),
            }],
        };

        let recipe_id = store.upsert_recipe(&parsed).await.unwrap();

        let catalogue = store.snapshot().await;
        let lines = catalogue.ingredient_lines(recipe_id);
        assert_eq!(lines.len(), 2);
        let (butter, link) = lines
            .iter()
            .find(|(ingredient, _)| ingredient.name.eq_ignore_ascii_case("butter"))
            .unwrap();
        assert!(!butter.is_basic);
        assert_eq!(link.quantity, 30.0);
        assert_eq!(link.unit, "g");
    }
}
