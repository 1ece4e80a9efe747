use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use meal_planner::catalogue_import::parse_recipe_response;
use meal_planner::config::{AppConfig, LogFormat};
use meal_planner::db::{init_database_schema, PgRecipeStore};
use meal_planner::planner::MealPlanner;
use meal_planner::recipe_model::{MealPreferences, Plan, RecipeId, ShuffleMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Weekly meal planning and shopping lists
#[derive(Debug, Parser)]
#[command(name = "meal-planner", version, about)]
struct Cli {
    /// Seed for the random draws, for reproducible suggestions
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

/// Soft limits applied while scoring
#[derive(Debug, Args)]
struct PrefArgs {
    /// Calorie limit per portion
    #[arg(long)]
    max_calories: Option<i64>,
    /// Cooking time limit in minutes
    #[arg(long)]
    max_time: Option<i32>,
    /// Only draw vegetarian recipes
    #[arg(long)]
    veg_only: bool,
}

impl From<PrefArgs> for MealPreferences {
    fn from(args: PrefArgs) -> Self {
        MealPreferences {
            max_calories: args.max_calories,
            max_time: args.max_time,
            veg_only: args.veg_only,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database tables if they do not exist
    InitDb,

    /// Import a recipe from a saved catalogue API response
    Import {
        /// Path to the JSON response
        #[arg(short, long)]
        file: PathBuf,
        /// Recipe name, overriding the title in the response
        #[arg(short, long)]
        name: Option<String>,
        /// Servings from the catalogue listing
        #[arg(short, long)]
        servings: Option<i32>,
    },

    /// Assign shopping categories to ingredients and main categories to recipes
    Classify,

    /// Build a plan around a seed recipe
    Plan {
        /// Seed recipe id
        #[arg(long)]
        seed_id: RecipeId,
        /// Number of recipes in the plan
        #[arg(short, long, default_value = "5")]
        count: usize,
        #[command(flatten)]
        prefs: PrefArgs,
    },

    /// Replace one slot of a plan
    Replace {
        /// Current plan, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        plan: Vec<RecipeId>,
        /// Zero-based slot to replace
        #[arg(short, long)]
        index: usize,
        /// all or favs
        #[arg(short, long, default_value = "all")]
        mode: ShuffleMode,
        #[command(flatten)]
        prefs: PrefArgs,
    },

    /// Suggest one recipe to add to a selection
    Suggest {
        /// Recipes already chosen, comma separated
        #[arg(long, value_delimiter = ',')]
        existing: Vec<RecipeId>,
        /// Restrict to a recipe category
        #[arg(long)]
        category: Option<String>,
        #[command(flatten)]
        prefs: PrefArgs,
    },

    /// List fresh ingredients shared by two or more recipes
    Synergy {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<RecipeId>,
    },

    /// Build the shopping list for a selection
    ShoppingList {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<RecipeId>,
    },

    /// Confirm a plan as this week's active plan
    Confirm {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<RecipeId>,
    },

    /// Toggle a recipe's favourite flag
    Favourite { recipe_id: RecipeId },

    /// Toggle a recipe's disliked flag
    Dislike { recipe_id: RecipeId },
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_logging(&config);

    info!("Starting meal planner");

    let store = PgRecipeStore::connect(config.require_database_url()?).await?;
    let planner = MealPlanner::new(store, config.planner_config());
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match cli.command {
        Command::InitDb => {
            init_database_schema(planner.store().pool()).await?;
            print_json(&json!({ "initialized": true }))?;
        }
        Command::Import {
            file,
            name,
            servings,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let parsed = parse_recipe_response(&raw, name.as_deref(), servings)?;
            let recipe_id = planner.import_recipe(&parsed).await?;
            print_json(&json!({
                "recipe_id": recipe_id,
                "name": parsed.name,
                "ingredients": parsed.ingredients.len(),
                "basics": parsed.basics.len(),
            }))?;
        }
        Command::Classify => {
            let ingredients = planner.reclassify_ingredients().await?;
            let recipes = planner.reclassify_recipes().await?;
            print_json(&json!({
                "ingredients_updated": ingredients,
                "recipes_updated": recipes,
            }))?;
        }
        Command::Plan {
            seed_id,
            count,
            prefs,
        } => {
            let plan = planner
                .suggest_meal_plan(seed_id, count, &prefs.into(), &mut rng)
                .await?;
            let synergy = planner.synergy_report(&plan.recipe_ids()).await?;
            print_json(&json!({ "plan": plan.slots, "synergy": synergy }))?;
        }
        Command::Replace {
            plan,
            index,
            mode,
            prefs,
        } => {
            let plan = planner
                .replace_slot(&Plan::from_ids(&plan), index, &prefs.into(), mode, &mut rng)
                .await?;
            let synergy = planner.synergy_report(&plan.recipe_ids()).await?;
            print_json(&json!({ "plan": plan.slots, "synergy": synergy }))?;
        }
        Command::Suggest {
            existing,
            category,
            prefs,
        } => {
            let recipe_id = planner
                .suggest_single_recipe(&existing, category.as_deref(), &prefs.into(), &mut rng)
                .await?;
            print_json(&json!({ "recipe_id": recipe_id }))?;
        }
        Command::Synergy { ids } => {
            print_json(&planner.synergy_report(&ids).await?)?;
        }
        Command::ShoppingList { ids } => {
            print_json(&planner.generate_shopping_list(&ids).await?)?;
        }
        Command::Confirm { ids } => {
            print_json(&planner.confirm_plan(&Plan::from_ids(&ids)).await?)?;
        }
        Command::Favourite { recipe_id } => {
            let favourite = planner
                .toggle_favourite(recipe_id)
                .await?
                .with_context(|| format!("Recipe {recipe_id} not found"))?;
            print_json(&json!({ "recipe_id": recipe_id, "is_favourite": favourite }))?;
        }
        Command::Dislike { recipe_id } => {
            let disliked = planner
                .toggle_disliked(recipe_id)
                .await?
                .with_context(|| format!("Recipe {recipe_id} not found"))?;
            print_json(&json!({ "recipe_id": recipe_id, "is_disliked": disliked }))?;
        }
    }

    Ok(())
}
