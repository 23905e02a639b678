use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TypeError;

pub type Id = i32;

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl TryFrom<Value> for UserRole {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "user" => Ok(Self::User),
                "admin" => Ok(Self::Admin),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeOrder {
    #[default]
    Newest,
    Oldest,
    Alphabetical,
    RatingDesc,
    CaloriesAsc,
    CaloriesDesc,
}

impl RecipeOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            RecipeOrder::Newest => "created_at DESC, id DESC",
            RecipeOrder::Oldest => "created_at, id",
            RecipeOrder::Alphabetical => "title, id",
            RecipeOrder::RatingDesc => "rating DESC, id",
            RecipeOrder::CaloriesAsc => "calories, id",
            RecipeOrder::CaloriesDesc => "calories DESC, id",
        }
    }
}

impl TryFrom<Value> for RecipeOrder {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "newest" | "-createdAt" => Ok(Self::Newest),
                "oldest" | "createdAt" => Ok(Self::Oldest),
                "alphabetical" | "title" => Ok(Self::Alphabetical),
                "rating_desc" | "-rating" => Ok(Self::RatingDesc),
                "calories_asc" => Ok(Self::CaloriesAsc),
                "calories_desc" => Ok(Self::CaloriesDesc),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionalInfo {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionalInfo {
    pub fn validate(&self) -> Result<(), TypeError> {
        let values = [self.calories, self.protein, self.carbs, self.fat];
        if values.iter().any(|v| !v.is_finite() || *v < 0.) {
            return Err(TypeError::new(
                "Nutritional values must be non-negative numbers",
            ));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Id,
    pub title: String,
    pub ingredients: Vec<String>,
    pub directions: Vec<String>,
    pub category: String,
    #[sqlx(flatten)]
    #[serde(rename = "nutritionalInfo")]
    pub nutritional_info: NutritionalInfo,
    pub author_id: Id,

    pub rating: f64,
    #[serde(skip)]
    pub rating_version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Id,
    pub recipe_id: Id,
    pub user_id: Id,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Id,
    pub user_id: Id,
    pub recipe_id: Id,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating a recipe.
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub directions: Vec<String>,
    pub category: String,
    pub nutritional_info: NutritionalInfo,
}

/// Partial recipe update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub directions: Option<Vec<String>>,
    pub category: Option<String>,
    pub nutritional_info: Option<NutritionalInfo>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_calories: Option<f64>,
    pub max_calories: Option<f64>,
    pub order: RecipeOrder,
    pub offset: i64,
    pub limit: Option<i64>,
}

impl RecipeFilter {
    /// Whitespace separated search terms, used for ingredient matching.
    pub fn search_terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .map(|s| s.split_whitespace().map(|t| t.to_lowercase()).collect())
            .unwrap_or_default()
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            let terms = self.search_terms();
            let in_title = recipe.title.to_lowercase().contains(&needle);
            let in_ingredients = recipe.ingredients.iter().any(|i| {
                let i = i.to_lowercase();
                terms.iter().any(|t| i.contains(t))
            });
            if !(in_title || in_ingredients) {
                return false;
            }
        }

        if let Some(category) = self.category.as_deref() {
            if recipe.category != category {
                return false;
            }
        }

        let calories = recipe.nutritional_info.calories;
        if self.min_calories.is_some_and(|min| calories < min) {
            return false;
        }
        if self.max_calories.is_some_and(|max| calories > max) {
            return false;
        }

        true
    }
}
