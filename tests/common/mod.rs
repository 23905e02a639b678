#![allow(dead_code)]

use async_trait::async_trait;
use snack_attack_sdk::{
    actions,
    error::Error,
    jwt::{generate_jwt_session, SessionData, SessionKeys},
    memory::MemoryStore,
    schema::{
        Favorite, Id, NewRecipe, NewUser, NutritionalInfo, Recipe, RecipeChanges, RecipeFilter,
        Review, User, UserRole,
    },
    store::RecipeStore,
};

pub fn keys() -> SessionKeys {
    SessionKeys::new(b"integration-secret", 1).unwrap()
}

pub async fn user(store: &dyn RecipeStore, username: &str, role: UserRole) -> User {
    store
        .insert_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: String::from("not-a-real-hash"),
            role,
        })
        .await
        .unwrap()
        .unwrap()
}

pub fn session(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.to_owned(),
        role: user.role,
        is_admin: user.role == UserRole::Admin,
    }
}

pub fn token(user: &User, keys: &SessionKeys) -> String {
    generate_jwt_session(user, keys).unwrap()
}

pub async fn recipe(store: &dyn RecipeStore, author: &User, title: &str, calories: f64) -> Recipe {
    actions::create_recipe(
        NewRecipe {
            title: title.to_string(),
            ingredients: vec![String::from("oats"), String::from("honey")],
            directions: vec![String::from("Mix"), String::from("Bake")],
            category: String::from("snack"),
            nutritional_info: NutritionalInfo {
                calories,
                ..Default::default()
            },
        },
        &session(author),
        store,
    )
    .await
    .unwrap()
}

/// Memory store whose rating compare-and-swap never wins.
#[derive(Default)]
pub struct ContendedStore {
    inner: MemoryStore,
}

#[async_trait]
impl RecipeStore for ContendedStore {
    async fn get_user(&self, user_id: Id) -> Result<Option<User>, Error> {
        self.inner.get_user(user_id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.inner.get_user_by_username(username).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        self.inner.insert_user(user).await
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.inner.list_users().await
    }

    async fn delete_user(&self, user_id: Id) -> Result<bool, Error> {
        self.inner.delete_user(user_id).await
    }

    async fn set_user_role(&self, user_id: Id, role: UserRole) -> Result<Option<User>, Error> {
        self.inner.set_user_role(user_id, role).await
    }

    async fn insert_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, Error> {
        self.inner.insert_recipe(author_id, recipe).await
    }

    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, Error> {
        self.inner.get_recipe(recipe_id).await
    }

    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error> {
        self.inner.find_recipes(filter).await
    }

    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, Error> {
        self.inner.count_recipes(filter).await
    }

    async fn find_recipes_by_ids(&self, recipe_ids: &[Id]) -> Result<Vec<Recipe>, Error> {
        self.inner.find_recipes_by_ids(recipe_ids).await
    }

    async fn update_recipe(
        &self,
        recipe_id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, Error> {
        self.inner.update_recipe(recipe_id, changes).await
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error> {
        self.inner.delete_recipe(recipe_id).await
    }

    async fn update_recipe_rating(
        &self,
        _recipe_id: Id,
        _rating: f64,
        _expected_version: i64,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    async fn insert_review(
        &self,
        recipe_id: Id,
        user_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error> {
        self.inner.insert_review(recipe_id, user_id, rating, comment).await
    }

    async fn get_review(&self, review_id: Id) -> Result<Option<Review>, Error> {
        self.inner.get_review(review_id).await
    }

    async fn find_reviews_by_recipe(&self, recipe_id: Id) -> Result<Vec<Review>, Error> {
        self.inner.find_reviews_by_recipe(recipe_id).await
    }

    async fn find_reviews_by_user(&self, user_id: Id) -> Result<Vec<Review>, Error> {
        self.inner.find_reviews_by_user(user_id).await
    }

    async fn update_review(
        &self,
        review_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error> {
        self.inner.update_review(review_id, rating, comment).await
    }

    async fn delete_review(&self, review_id: Id) -> Result<bool, Error> {
        self.inner.delete_review(review_id).await
    }

    async fn insert_favorite(
        &self,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<Option<Favorite>, Error> {
        self.inner.insert_favorite(user_id, recipe_id).await
    }

    async fn get_favorite(&self, favorite_id: Id) -> Result<Option<Favorite>, Error> {
        self.inner.get_favorite(favorite_id).await
    }

    async fn find_favorites_by_recipe(&self, recipe_id: Id) -> Result<Vec<Favorite>, Error> {
        self.inner.find_favorites_by_recipe(recipe_id).await
    }

    async fn find_favorites_by_user(&self, user_id: Id) -> Result<Vec<Favorite>, Error> {
        self.inner.find_favorites_by_user(user_id).await
    }

    async fn delete_favorite(&self, favorite_id: Id) -> Result<bool, Error> {
        self.inner.delete_favorite(favorite_id).await
    }
}
