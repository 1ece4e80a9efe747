//! # Quantity Parser
//!
//! This module turns the free-text quantity labels found on catalogue ingredients
//! into a normalized `(quantity, unit)` pair. It runs once, at import time, and the
//! result is stored on each recipe-ingredient link.
//!
//! ## Label formats
//!
//! - `"(1/2 tsp) x2"`: bracketed quantity and unit with an optional multiplier
//! - `"White potato x3"`: bare multiplier, counted as items
//! - anything else: one item
//!
//! ## Usage
//!
//! ```rust
//! use meal_planner::quantity_parser::parse_quantity_label;
//!
//! let parsed = parse_quantity_label("(1/2 tsp) x2");
//! assert_eq!(parsed.quantity, 1.0);
//! assert_eq!(parsed.unit, "tsp");
//! ```

use crate::measurement_patterns::{
    BRACKETED_QUANTITY_REGEX, NUMERIC_QUANTITY_REGEX, TRAILING_MULTIPLIER_REGEX,
};
use crate::unit_standardizer::standardize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Unit used when a label carries no unit of its own
pub const DEFAULT_UNIT: &str = "item";

/// A parsed `(quantity, unit)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuantity {
    pub quantity: f64,
    pub unit: String,
}

impl ParsedQuantity {
    fn item(quantity: f64) -> Self {
        Self {
            quantity,
            unit: DEFAULT_UNIT.to_string(),
        }
    }

    /// Zero quantities are never linked to a recipe
    pub fn is_zero(&self) -> bool {
        self.quantity == 0.0
    }
}

/// One raw ingredient line from the catalogue: a name and its quantity label
#[derive(Debug, Clone, PartialEq)]
pub struct RawIngredientLine {
    pub name: String,
    pub label: String,
}

impl RawIngredientLine {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
        }
    }
}

/// An ingredient line ready to be stored as a recipe-ingredient link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredientLine {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// Parse a quantity label into a `(quantity, unit)` pair
///
/// Never fails: malformed numbers fall back to a quantity of 1 in the matched
/// unit, and labels with no recognizable quantity count as one item. Callers
/// must drop results where [`ParsedQuantity::is_zero`] holds.
pub fn parse_quantity_label(label: &str) -> ParsedQuantity {
    let label = label.trim();

    if let Some(captures) = BRACKETED_QUANTITY_REGEX.captures(label) {
        let raw_quantity = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let unit = captures
            .get(2)
            .map(|m| m.as_str().trim().to_lowercase())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());
        let multiplier = captures
            .get(3)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(1);

        let quantity = match parse_numeric_quantity(raw_quantity) {
            Some(base) => base * f64::from(multiplier),
            None => {
                debug!(
                    label = %label,
                    raw_quantity = %raw_quantity,
                    "Unparseable quantity, defaulting to 1"
                );
                1.0
            }
        };

        return ParsedQuantity { quantity, unit };
    }

    if let Some(captures) = TRAILING_MULTIPLIER_REGEX.captures(label) {
        if let Some(count) = captures.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            return ParsedQuantity::item(count);
        }
    }

    ParsedQuantity::item(1.0)
}

/// Parse a whole number, decimal, simple fraction or mixed number
pub fn parse_numeric_quantity(text: &str) -> Option<f64> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let captures = NUMERIC_QUANTITY_REGEX.captures(&normalized)?;

    if let Some(plain) = captures.get(4) {
        return plain.as_str().parse().ok();
    }

    let whole: f64 = match captures.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0.0,
    };
    let numerator: f64 = captures.get(2)?.as_str().parse().ok()?;
    let denominator: f64 = captures.get(3)?.as_str().parse().ok()?;

    if denominator == 0.0 {
        return None;
    }

    Some(whole + numerator / denominator)
}

/// Parse a recipe's raw ingredient lines, dropping zero quantities and summing
/// lines that share the same `(name, unit)` key
///
/// A recipe links each ingredient once, so lines left with the same name
/// (ignoring case) are then merged in their base unit. A line whose unit cannot
/// be converted to the first line's unit is dropped with a warning. Output
/// order follows the first occurrence of each name.
pub fn parse_ingredient_lines(lines: &[RawIngredientLine]) -> Vec<ParsedIngredientLine> {
    let mut parsed: Vec<ParsedIngredientLine> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let name = line.name.trim();
        let parsed_quantity = parse_quantity_label(&line.label);
        if parsed_quantity.is_zero() {
            info!(
                ingredient = %name,
                label = %line.label,
                "Dropping zero-quantity ingredient line"
            );
            continue;
        }
        let ParsedQuantity { quantity, unit } = parsed_quantity;

        let key = (name.to_string(), unit.clone());
        match index.get(&key) {
            Some(&position) => parsed[position].quantity += quantity,
            None => {
                index.insert(key, parsed.len());
                parsed.push(ParsedIngredientLine {
                    name: name.to_string(),
                    quantity,
                    unit,
                });
            }
        }
    }

    merge_by_name(parsed)
}

fn merge_by_name(lines: Vec<ParsedIngredientLine>) -> Vec<ParsedIngredientLine> {
    let mut merged: Vec<ParsedIngredientLine> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for line in lines {
        let key = line.name.to_lowercase();
        let Some(&position) = index.get(&key) else {
            index.insert(key, merged.len());
            merged.push(line);
            continue;
        };

        let kept = &mut merged[position];
        let (kept_quantity, kept_unit) = standardize(kept.quantity, &kept.unit);
        let (quantity, unit) = standardize(line.quantity, &line.unit);
        if kept_unit == unit {
            kept.quantity = kept_quantity + quantity;
            kept.unit = kept_unit;
        } else {
            warn!(
                ingredient = %line.name,
                kept_unit = %kept.unit,
                dropped_unit = %line.unit,
                dropped_quantity = line.quantity,
                "Ingredient listed in incompatible units, dropping line"
            );
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracketed_fraction_with_multiplier() {
        let parsed = parse_quantity_label("(1/2 tsp) x2");
        assert_eq!(parsed.quantity, 1.0);
        assert_eq!(parsed.unit, "tsp");
    }

    #[test]
    fn test_bare_multiplier_counts_items() {
        let parsed = parse_quantity_label("White potato x3");
        assert_eq!(parsed.quantity, 3.0);
        assert_eq!(parsed.unit, "item");
    }

    #[test]
    fn test_empty_label_defaults_to_one_item() {
        let parsed = parse_quantity_label("");
        assert_eq!(parsed, ParsedQuantity::item(1.0));
    }

    #[test]
    fn test_bracketed_without_multiplier() {
        let parsed = parse_quantity_label("Chicken breast (250g)");
        assert_eq!(parsed.quantity, 250.0);
        assert_eq!(parsed.unit, "g");
    }

    #[test]
    fn test_unit_is_case_insensitive() {
        let parsed = parse_quantity_label("Passata (500 ML) x2");
        assert_eq!(parsed.quantity, 1000.0);
        assert_eq!(parsed.unit, "ml");
    }

    #[test]
    fn test_mixed_number() {
        let parsed = parse_quantity_label("Flour (1 1/2 tbsp)");
        assert_eq!(parsed.quantity, 1.5);
        assert_eq!(parsed.unit, "tbsp");
    }

    #[test]
    fn test_decimal_quantity() {
        let parsed = parse_quantity_label("Stock (0.5 l)");
        assert_eq!(parsed.quantity, 0.5);
        assert_eq!(parsed.unit, "l");
    }

    #[test]
    fn test_malformed_fraction_falls_back_to_one_in_unit() {
        let parsed = parse_quantity_label("Cumin (1/0 tsp) x3");
        assert_eq!(parsed.quantity, 1.0);
        assert_eq!(parsed.unit, "tsp");

        let parsed = parse_quantity_label("Salt (1//2 tsp)");
        assert_eq!(parsed.quantity, 1.0);
        assert_eq!(parsed.unit, "tsp");
    }

    #[test]
    fn test_zero_quantity_is_flagged() {
        assert!(parse_quantity_label("Water (0 ml)").is_zero());
        assert!(parse_quantity_label("Lemon x0").is_zero());
        assert!(!parse_quantity_label("Lemon x1").is_zero());
    }

    #[test]
    fn test_unanchored_bracket_is_not_a_quantity() {
        // The bracket must close the label for the bracketed form to apply
        let parsed = parse_quantity_label("(2 tbsp) soy sauce");
        assert_eq!(parsed, ParsedQuantity::item(1.0));
    }

    #[test]
    fn test_numeric_quantity_parsing() {
        assert_eq!(parse_numeric_quantity("2"), Some(2.0));
        assert_eq!(parse_numeric_quantity("2.25"), Some(2.25));
        assert_eq!(parse_numeric_quantity(".5"), Some(0.5));
        assert_eq!(parse_numeric_quantity("3/4"), Some(0.75));
        assert_eq!(parse_numeric_quantity("2 1/4"), Some(2.25));
        assert_eq!(parse_numeric_quantity(""), None);
        assert_eq!(parse_numeric_quantity("1/0"), None);
        assert_eq!(parse_numeric_quantity("1.2.3"), None);
    }

    #[test]
    fn test_lines_are_summed_by_name_and_unit() {
        let lines = vec![
            RawIngredientLine::new("Garlic clove", "Garlic clove x2"),
            RawIngredientLine::new("Chopped tomatoes", "Chopped tomatoes (400g)"),
            RawIngredientLine::new("Garlic clove", "Garlic clove x1"),
            RawIngredientLine::new("Water", "Water (0 ml)"),
            RawIngredientLine::new("Chopped tomatoes", "Chopped tomatoes (1 tin)"),
        ];

        let parsed = parse_ingredient_lines(&lines);

        // The tin cannot be expressed in grams, so only the first line survives
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Garlic clove");
        assert_eq!(parsed[0].quantity, 3.0);
        assert_eq!(parsed[0].unit, "item");
        assert_eq!(parsed[1].quantity, 400.0);
        assert_eq!(parsed[1].unit, "g");
    }

    #[test]
    fn test_same_ingredient_in_convertible_units_is_merged() {
        let lines = vec![
            RawIngredientLine::new("Chopped tomatoes", "Chopped tomatoes (400g)"),
            RawIngredientLine::new("Passata", "Passata (250ml)"),
            RawIngredientLine::new("Chopped tomatoes", "Chopped tomatoes (0.4kg)"),
            RawIngredientLine::new("passata", "Passata (0.25 l)"),
        ];

        let parsed = parse_ingredient_lines(&lines);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Chopped tomatoes");
        assert_eq!(parsed[0].quantity, 800.0);
        assert_eq!(parsed[0].unit, "g");
        assert_eq!(parsed[1].name, "Passata");
        assert_eq!(parsed[1].quantity, 500.0);
        assert_eq!(parsed[1].unit, "ml");
    }
}
