use serde::Serialize;

use crate::{
    error::{Error, HtmlError},
    schema::Id,
    store::RecipeStore,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalorieEntry {
    pub title: String,
    pub calories: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalorieSummary {
    #[serde(rename = "totalCalories")]
    pub total_calories: f64,
    #[serde(rename = "mealCount")]
    pub meal_count: usize,
    pub breakdown: Vec<CalorieEntry>,
}

/// Sums the calories of the given recipes. Unknown ids are skipped.
pub async fn calculate_calories(
    recipe_ids: &[Id],
    store: &dyn RecipeStore,
) -> Result<CalorieSummary, Error> {
    if recipe_ids.is_empty() {
        return Err(HtmlError::InvalidRequest.new("Invalid recipe IDs"));
    }

    let recipes = store.find_recipes_by_ids(recipe_ids).await?;
    let breakdown: Vec<CalorieEntry> = recipes
        .into_iter()
        .map(|recipe| CalorieEntry {
            title: recipe.title,
            calories: recipe.nutritional_info.calories,
        })
        .collect();

    Ok(CalorieSummary {
        total_calories: breakdown.iter().map(|e| e.calories).sum(),
        meal_count: breakdown.len(),
        breakdown,
    })
}
