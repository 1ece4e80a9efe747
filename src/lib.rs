//! # Meal Planner
//!
//! Recommends a week of meals from a recipe catalogue and turns the chosen
//! recipes into a category-grouped shopping list.
//!
//! - [`quantity_parser`] and [`unit_standardizer`] normalize ingredient amounts
//! - [`affinity`] and [`plan_selector`] score and draw recipes
//! - [`constraints`] checks label diversity bounds
//! - [`shopping_list`] aggregates a finalized selection
//! - [`db`] and [`planner`] wire the above to a recipe store

pub mod affinity;
pub mod catalogue_import;
pub mod config;
pub mod constraints;
pub mod db;
pub mod ingredient_classifier;
pub mod measurement_patterns;
pub mod plan_selector;
pub mod planner;
pub mod planner_config;
pub mod planner_errors;
pub mod quantity_parser;
pub mod recipe_model;
pub mod shopping_list;
pub mod unit_standardizer;
