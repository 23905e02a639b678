//! Persistence port.
//!
//! Every operation in [`crate::actions`] talks to storage through
//! [`RecipeStore`], so the same code runs against [`crate::postgres::PgStore`] in
//! production and [`crate::memory::MemoryStore`] in tests.

use async_trait::async_trait;

use super::{
    error::Error,
    schema::{
        Favorite, Id, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeFilter, Review, User,
        UserRole,
    },
};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    // Users

    async fn get_user(&self, user_id: Id) -> Result<Option<User>, Error>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    /// Returns `None` when the username or email is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error>;

    async fn list_users(&self) -> Result<Vec<User>, Error>;

    async fn delete_user(&self, user_id: Id) -> Result<bool, Error>;

    async fn set_user_role(&self, user_id: Id, role: UserRole) -> Result<Option<User>, Error>;

    // Recipes

    async fn insert_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, Error>;

    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, Error>;

    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error>;

    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, Error>;

    /// Unknown ids are skipped.
    async fn find_recipes_by_ids(&self, recipe_ids: &[Id]) -> Result<Vec<Recipe>, Error>;

    async fn update_recipe(
        &self,
        recipe_id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, Error>;

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error>;

    /// Writes `rating` only if the recipe's `rating_version` still equals
    /// `expected_version`, bumping the version on success.
    async fn update_recipe_rating(
        &self,
        recipe_id: Id,
        rating: f64,
        expected_version: i64,
    ) -> Result<bool, Error>;

    // Reviews

    /// Returns `None` when the user already reviewed the recipe.
    async fn insert_review(
        &self,
        recipe_id: Id,
        user_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error>;

    async fn get_review(&self, review_id: Id) -> Result<Option<Review>, Error>;

    async fn find_reviews_by_recipe(&self, recipe_id: Id) -> Result<Vec<Review>, Error>;

    async fn find_reviews_by_user(&self, user_id: Id) -> Result<Vec<Review>, Error>;

    async fn update_review(
        &self,
        review_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error>;

    async fn delete_review(&self, review_id: Id) -> Result<bool, Error>;

    // Favorites

    /// Returns `None` when the recipe is already a favorite of the user.
    async fn insert_favorite(&self, user_id: Id, recipe_id: Id)
        -> Result<Option<Favorite>, Error>;

    async fn get_favorite(&self, favorite_id: Id) -> Result<Option<Favorite>, Error>;

    async fn find_favorites_by_recipe(&self, recipe_id: Id) -> Result<Vec<Favorite>, Error>;

    async fn find_favorites_by_user(&self, user_id: Id) -> Result<Vec<Favorite>, Error>;

    async fn delete_favorite(&self, favorite_id: Id) -> Result<bool, Error>;
}
