//! # Measurement Patterns Module
//!
//! This module contains the regex patterns used to read quantities out of
//! catalogue ingredient labels such as `"(1/2 tsp) x2"` or `"White potato x3"`.

use lazy_static::lazy_static;
use regex::Regex;

// Bracketed quantity and 1-4 letter unit, optional xN multiplier, anchored at the end
pub const BRACKETED_QUANTITY_PATTERN: &str = r"(?i)\(([\d\s/.]+)\s*([a-z]{1,4})\)(?:\s*x(\d+))?$";

// Bare trailing multiplier with no bracketed unit
pub const TRAILING_MULTIPLIER_PATTERN: &str = r"(?i)x(\d+)$";

// Whole number, decimal, fraction or mixed number ("1 1/2")
pub const NUMERIC_QUANTITY_PATTERN: &str = r"^(?:(\d+)\s+)?(\d+)/(\d+)$|^(\d+(?:\.\d+)?|\.\d+)$";

// Lazy static regexes to avoid recompilation
lazy_static! {
    pub static ref BRACKETED_QUANTITY_REGEX: Regex =
        Regex::new(BRACKETED_QUANTITY_PATTERN).expect("Bracketed quantity pattern should be valid");
    pub static ref TRAILING_MULTIPLIER_REGEX: Regex =
        Regex::new(TRAILING_MULTIPLIER_PATTERN).expect("Multiplier pattern should be valid");
    pub static ref NUMERIC_QUANTITY_REGEX: Regex =
        Regex::new(NUMERIC_QUANTITY_PATTERN).expect("Numeric quantity pattern should be valid");
    pub static ref HTML_TAG_REGEX: Regex =
        Regex::new(r"<[^>]+>").expect("HTML tag pattern should be valid");
    pub static ref RUN_TOGETHER_SENTENCE_REGEX: Regex =
        Regex::new(r"([a-z])([A-Z])").expect("Sentence boundary pattern should be valid");
}
