//! # Catalogue Import Parsing
//!
//! This module turns a saved catalogue API recipe response into a
//! [`ParsedRecipe`] ready to be upserted into a store. Fetching the response is
//! out of scope; the caller supplies the JSON text.
//!
//! ## Extracted fields
//!
//! - cooking time for two, falling back to the time for four
//! - instructions with HTML removed, one step per line
//! - the nutrition blob, re-serialized as JSON text
//! - category titles, stored as labels
//! - basics, lower-cased and linked as "to taste"
//! - main ingredients, parsed with the quantity parser and merged by `(name, unit)`

use crate::measurement_patterns::{HTML_TAG_REGEX, RUN_TOGETHER_SENTENCE_REGEX};
use crate::planner_errors::{PlannerError, PlannerResult};
use crate::quantity_parser::{parse_ingredient_lines, ParsedIngredientLine, RawIngredientLine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Quantity stored for every basic ingredient
pub const BASIC_QUANTITY: f64 = 1.0;
/// Unit stored for every basic ingredient
pub const BASIC_UNIT: &str = "to taste";

/// Top level of a catalogue recipe response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeResponse {
    #[serde(default)]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub entry: Option<RecipeEntry>,
}

/// One recipe entry as published by the catalogue
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub prep_times: Option<PrepTimes>,
    #[serde(default)]
    pub cooking_instructions: Vec<CookingStep>,
    #[serde(default)]
    pub nutritional_information: Option<Value>,
    #[serde(default)]
    pub categories: Vec<TitledRef>,
    #[serde(default)]
    pub basics: Vec<TitledRef>,
    #[serde(default)]
    pub ingredients: Vec<IngredientRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrepTimes {
    #[serde(default)]
    pub for_2: Option<Value>,
    #[serde(default)]
    pub for_4: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookingStep {
    #[serde(default)]
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitledRef {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// A recipe ready to be written to a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecipe {
    pub name: String,
    pub servings: Option<i32>,
    pub time_minutes: Option<i32>,
    pub instructions: String,
    pub nutritional_info: Option<String>,
    pub source_url: Option<String>,
    pub labels: Vec<String>,
    /// Lower-cased basic ingredient names, without duplicates
    pub basics: Vec<String>,
    pub ingredients: Vec<ParsedIngredientLine>,
}

impl ParsedRecipe {
    /// Basics that are not also listed as a measured ingredient
    ///
    /// A measured line wins over the "to taste" link so its quantity reaches
    /// the shopping list.
    pub fn unmeasured_basics(&self) -> impl Iterator<Item = &str> {
        self.basics
            .iter()
            .map(String::as_str)
            .filter(|basic| {
                !self
                    .ingredients
                    .iter()
                    .any(|line| line.name.eq_ignore_ascii_case(basic))
            })
    }
}

/// Parse a saved recipe response
///
/// # Arguments
///
/// * `json` - Raw response body
/// * `name` - Recipe name; defaults to the entry title
/// * `servings` - Servings recorded on the recipe
///
/// # Errors
///
/// [`PlannerError::Import`] when the body is not JSON, carries no entry, or
/// when no name is available.
pub fn parse_recipe_response(
    json: &str,
    name: Option<&str>,
    servings: Option<i32>,
) -> PlannerResult<ParsedRecipe> {
    let response: RecipeResponse = serde_json::from_str(json)?;
    let entry = response
        .data
        .and_then(|data| data.entry)
        .ok_or_else(|| PlannerError::Import("Response contains no recipe entry".to_string()))?;

    parse_recipe_entry(&entry, name, servings)
}

/// Extract a [`ParsedRecipe`] from a catalogue entry
pub fn parse_recipe_entry(
    entry: &RecipeEntry,
    name: Option<&str>,
    servings: Option<i32>,
) -> PlannerResult<ParsedRecipe> {
    let name = name
        .map(str::to_string)
        .or_else(|| entry.title.clone())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PlannerError::Import("Recipe has no name".to_string()))?;

    let time_minutes = entry.prep_times.as_ref().and_then(|times| {
        as_minutes(times.for_2.as_ref()).or_else(|| as_minutes(times.for_4.as_ref()))
    });

    let steps: Vec<String> = entry
        .cooking_instructions
        .iter()
        .filter_map(|step| step.instruction.as_deref())
        .map(strip_html)
        .filter(|step| !step.is_empty())
        .collect();
    let instructions = clean_instructions(&steps.join("\n"));

    let nutritional_info = match &entry.nutritional_information {
        Some(value) if !is_empty_json(value) => Some(serde_json::to_string(value)?),
        _ => None,
    };

    let labels: Vec<String> = entry
        .categories
        .iter()
        .filter_map(|category| category.title.as_deref())
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .collect();

    let mut basics: Vec<String> = Vec::new();
    for basic in &entry.basics {
        let Some(title) = basic.title.as_deref() else {
            continue;
        };
        let title = title.trim().to_lowercase();
        if !title.is_empty() && !basics.contains(&title) {
            basics.push(title);
        }
    }

    let raw_lines: Vec<RawIngredientLine> = entry
        .ingredients
        .iter()
        .map(|ingredient| {
            RawIngredientLine::new(
                ingredient.name.as_deref().unwrap_or("N/A"),
                ingredient.label.as_deref().unwrap_or(""),
            )
        })
        .collect();
    let ingredients = parse_ingredient_lines(&raw_lines);

    info!(
        recipe = %name,
        ingredients = ingredients.len(),
        basics = basics.len(),
        labels = labels.len(),
        "Parsed catalogue recipe"
    );

    Ok(ParsedRecipe {
        name,
        servings,
        time_minutes,
        instructions,
        nutritional_info,
        source_url: entry.url.clone(),
        labels,
        basics,
        ingredients,
    })
}

/// Remove HTML tags, trimming each text fragment and joining them directly
pub fn strip_html(html: &str) -> String {
    HTML_TAG_REGEX
        .split(html)
        .map(decode_entities)
        .map(|fragment| fragment.trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

/// Split sentences that were glued together when tags were removed
/// ("hobReduce" becomes "hob. Reduce") and collapse doubled full stops
pub fn clean_instructions(text: &str) -> String {
    let split = RUN_TOGETHER_SENTENCE_REGEX.replace_all(text, "$1. $2");
    split.replace("..", ".")
}

fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).replace('\u{a0}', " ")
}

fn as_minutes(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
            .and_then(|minutes| i32::try_from(minutes).ok()),
        Value::String(text) => text.trim().parse().ok(),
        other => {
            debug!(value = %other, "Ignoring non-numeric cooking time");
            None
        }
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}
