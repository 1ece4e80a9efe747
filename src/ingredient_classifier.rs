//! # Ingredient and Recipe Classification
//!
//! Keyword-driven classifiers that assign shopping-list buckets to ingredients
//! and a main-protein category to recipes. Keyword tables are checked in order
//! and the first substring hit wins, so table order matters ("smoked fish" is
//! never reached because "fish" already matches).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shopping-list bucket for an ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShoppingCategory {
    Meat,
    Fish,
    Veg,
    Dairy,
    Pantry,
    Bread,
    Other,
}

impl ShoppingCategory {
    pub const ALL: [ShoppingCategory; 7] = [
        ShoppingCategory::Meat,
        ShoppingCategory::Fish,
        ShoppingCategory::Veg,
        ShoppingCategory::Dairy,
        ShoppingCategory::Pantry,
        ShoppingCategory::Bread,
        ShoppingCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShoppingCategory::Meat => "Meat",
            ShoppingCategory::Fish => "Fish",
            ShoppingCategory::Veg => "Veg",
            ShoppingCategory::Dairy => "Dairy",
            ShoppingCategory::Pantry => "Pantry",
            ShoppingCategory::Bread => "Bread",
            ShoppingCategory::Other => "Other",
        }
    }

    /// Read a stored category; anything unset or unrecognized is `Other`
    pub fn from_stored(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(ShoppingCategory::Other)
    }
}

impl fmt::Display for ShoppingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShoppingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ShoppingCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown shopping category: {s}"))
    }
}

const INGREDIENT_KEYWORDS: &[(ShoppingCategory, &[&str])] = &[
    (
        ShoppingCategory::Meat,
        &[
            "chicken", "beef", "pork", "lamb", "steak", "bacon", "sausage", "mince", "chorizo",
            "duck", "turkey", "gammon", "venison", "meatball", "salami", "prosciutto", "pancetta",
            "ham", "porker",
        ],
    ),
    (
        ShoppingCategory::Fish,
        &[
            "salmon", "cod", "prawn", "shrimp", "haddock", "tuna", "trout", "bass", "mackerel",
            "hake", "fish", "smoked fish",
        ],
    ),
    (
        ShoppingCategory::Veg,
        &[
            "potato", "onion", "garlic", "carrot", "pepper", "chilli", "tomato", "spinach",
            "aubergine", "mushroom", "parsnip", "shallot", "leek", "cabbage", "herb", "broccoli",
            "ginger", "coriander", "bean", "pea", "kale", "squash", "courgette", "cucumber",
            "lettuce", "rocket", "sweetcorn", "beetroot", "radish", "celery",
        ],
    ),
    (
        ShoppingCategory::Dairy,
        &[
            "milk", "cheese", "butter", "cream", "yogurt", "egg", "parmesan", "cheddar",
            "mozzarella", "paneer", "feta", "haloumi", "crème fraîche", "mascarpone",
        ],
    ),
    (
        ShoppingCategory::Pantry,
        &[
            "rice", "pasta", "flour", "sugar", "oil", "vinegar", "stock", "spice", "powder",
            "paste", "sauce", "honey", "syrup", "lentil", "seed", "chutney", "pastry", "nut",
            "olive", "tamarind", "curry", "ketchup", "mayo", "mustard", "soy", "oat", "quinoa",
            "couscous", "noodles", "broth",
        ],
    ),
    (
        ShoppingCategory::Bread,
        &[
            "bread", "roll", "wrap", "tortilla", "naan", "pitta", "baguette", "bun", "ciabatta",
        ],
    ),
];

const PANTRY_HINTS: &[&str] = &["mix", "blend", "dried", "jar"];
const VEG_HINTS: &[&str] = &["clove", "root", "leaf", "stalk"];

/// Assign a shopping-list bucket from an ingredient name
pub fn classify_ingredient(name: &str) -> ShoppingCategory {
    let name = name.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if let Some((category, _)) = INGREDIENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| mentions(keywords))
    {
        return *category;
    }

    if mentions(PANTRY_HINTS) {
        ShoppingCategory::Pantry
    } else if mentions(VEG_HINTS) {
        ShoppingCategory::Veg
    } else {
        ShoppingCategory::Other
    }
}

/// Main-protein category of a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealCategory {
    Vegetarian,
    Chicken,
    Beef,
    Pork,
    Fish,
    Other,
}

impl MealCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealCategory::Vegetarian => "Vegetarian",
            MealCategory::Chicken => "Chicken",
            MealCategory::Beef => "Beef",
            MealCategory::Pork => "Pork",
            MealCategory::Fish => "Fish",
            MealCategory::Other => "Other",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MEAT_FREE_LABELS: &[&str] = &["vegetarian", "vegan", "meat free"];

const LABEL_KEYWORDS: &[(MealCategory, &str)] = &[
    (MealCategory::Chicken, "chicken"),
    (MealCategory::Beef, "beef"),
    (MealCategory::Pork, "pork"),
    (MealCategory::Fish, "fish"),
];

const PROTEIN_KEYWORDS: &[(MealCategory, &[&str])] = &[
    (MealCategory::Beef, &["beef", "steak"]),
    (MealCategory::Chicken, &["chicken"]),
    (
        MealCategory::Pork,
        &["pork", "bacon", "sausage", "gammon", "ham", "chorizo", "pancetta", "pigs in blankets"],
    ),
    (
        MealCategory::Fish,
        &[
            "fish", "salmon", "tuna", "cod", "trout", "haddock", "mackerel", "sardine", "anchovy",
            "pollock", "basa", "prawn", "shrimp", "lobster", "seafood", "crab",
        ],
    ),
];

// Flavourings that name a meat without containing any
const DECEPTIVE_INGREDIENTS: &[&str] = &["stock", "cube", "mix", "gravy", "flavouring", "bouillon"];

/// Assign a recipe category from its label titles and ingredient names
///
/// Meat-free labels win, then meat labels, then a keyword scan over the
/// ingredient names with stock cubes and similar flavourings left out.
pub fn classify_recipe<L, I>(label_titles: L, ingredient_names: I) -> MealCategory
where
    L: IntoIterator,
    L::Item: AsRef<str>,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let labels: Vec<String> = label_titles
        .into_iter()
        .map(|title| title.as_ref().to_lowercase())
        .collect();

    if labels.iter().any(|title| MEAT_FREE_LABELS.contains(&title.as_str())) {
        return MealCategory::Vegetarian;
    }

    if let Some((category, _)) = LABEL_KEYWORDS
        .iter()
        .find(|(_, keyword)| labels.iter().any(|title| title.contains(keyword)))
    {
        return *category;
    }

    let combined = ingredient_names
        .into_iter()
        .map(|name| name.as_ref().to_lowercase())
        .filter(|name| !DECEPTIVE_INGREDIENTS.iter().any(|d| name.contains(d)))
        .collect::<Vec<_>>()
        .join(" ");

    PROTEIN_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| combined.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(MealCategory::Other)
}
