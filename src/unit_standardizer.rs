//! # Unit Standardizer
//!
//! Maps a stored `(quantity, unit)` pair onto a canonical base unit so that
//! quantities from different recipes can be summed. Mass collapses to grams,
//! volume to millilitres, and count-like units pass through unchanged.
//! Unknown units are echoed back lower-cased and trimmed, forming their own
//! aggregation bucket. The function is total.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Unit spellings and their `(base unit, factor)` conversion
    static ref UNIT_CONVERSIONS: HashMap<&'static str, (&'static str, f64)> = {
        let mut map = HashMap::new();

        // Mass
        map.insert("g", ("g", 1.0));
        map.insert("gram", ("g", 1.0));
        map.insert("grams", ("g", 1.0));
        map.insert("kg", ("g", 1000.0));
        map.insert("kilogram", ("g", 1000.0));
        map.insert("kilograms", ("g", 1000.0));

        // Volume
        map.insert("ml", ("ml", 1.0));
        map.insert("millilitre", ("ml", 1.0));
        map.insert("millilitres", ("ml", 1.0));
        map.insert("l", ("ml", 1000.0));
        map.insert("litre", ("ml", 1000.0));
        map.insert("litres", ("ml", 1000.0));

        // Count-like units
        map.insert("item", ("item", 1.0));
        map.insert("items", ("item", 1.0));
        map.insert("tsp", ("tsp", 1.0));
        map.insert("tbsp", ("tbsp", 1.0));
        map.insert("clove", ("clove", 1.0));
        map.insert("cloves", ("clove", 1.0));
        map.insert("to taste", ("to taste", 1.0));
        map.insert("splash", ("splash", 1.0));
        map.insert("pinch", ("pinch", 1.0));
        map.insert("pack", ("pack", 1.0));

        map
    };
}

/// Convert a quantity into its canonical base unit
///
/// # Examples
///
/// ```rust
/// use meal_planner::unit_standardizer::standardize;
///
/// assert_eq!(standardize(1.5, "kg"), (1500.0, "g".to_string()));
/// assert_eq!(standardize(2.0, " Tin "), (2.0, "tin".to_string()));
/// ```
pub fn standardize(quantity: f64, unit: &str) -> (f64, String) {
    let normalized = unit.trim().to_lowercase();

    match UNIT_CONVERSIONS.get(normalized.as_str()) {
        Some(&(base, factor)) => (quantity * factor, base.to_string()),
        None => (quantity, normalized),
    }
}
