//! In-process [`RecipeStore`] used by tests and local demos.
//!
//! Uniqueness rules and cascades mirror the Postgres tables so the actions
//! behave the same against both stores.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::Error,
    schema::{
        Favorite, Id, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeFilter, RecipeOrder,
        Review, User, UserRole,
    },
    store::RecipeStore,
};

#[derive(Default)]
struct MemoryState {
    next_id: Id,
    users: BTreeMap<Id, User>,
    recipes: BTreeMap<Id, Recipe>,
    reviews: BTreeMap<Id, Review>,
    favorites: BTreeMap<Id, Favorite>,
}

impl MemoryState {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn matching_recipes(&self, filter: &RecipeFilter) -> Vec<Recipe> {
        self.recipes
            .values()
            .filter(|recipe| filter.matches(recipe))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_recipes(recipes: &mut [Recipe], order: RecipeOrder) {
    match order {
        RecipeOrder::Newest => {
            recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
        }
        RecipeOrder::Oldest => {
            recipes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        }
        RecipeOrder::Alphabetical => {
            recipes.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)))
        }
        RecipeOrder::RatingDesc => {
            recipes.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)))
        }
        RecipeOrder::CaloriesAsc => recipes.sort_by(|a, b| {
            a.nutritional_info
                .calories
                .total_cmp(&b.nutritional_info.calories)
                .then(a.id.cmp(&b.id))
        }),
        RecipeOrder::CaloriesDesc => recipes.sort_by(|a, b| {
            b.nutritional_info
                .calories
                .total_cmp(&a.nutritional_info.calories)
                .then(a.id.cmp(&b.id))
        }),
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn get_user(&self, user_id: Id) -> Result<Option<User>, Error> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Ok(None);
        }

        let id = state.next_id();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());

        Ok(Some(user))
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn delete_user(&self, user_id: Id) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        if state.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        let owned: Vec<Id> = state
            .recipes
            .values()
            .filter(|r| r.author_id == user_id)
            .map(|r| r.id)
            .collect();
        state.recipes.retain(|_, r| r.author_id != user_id);
        state
            .reviews
            .retain(|_, r| r.user_id != user_id && !owned.contains(&r.recipe_id));
        state
            .favorites
            .retain(|_, f| f.user_id != user_id && !owned.contains(&f.recipe_id));

        Ok(true)
    }

    async fn set_user_role(&self, user_id: Id, role: UserRole) -> Result<Option<User>, Error> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&user_id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn insert_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, Error> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let now = Utc::now();
        let recipe = Recipe {
            id,
            title: recipe.title,
            ingredients: recipe.ingredients,
            directions: recipe.directions,
            category: recipe.category,
            nutritional_info: recipe.nutritional_info,
            author_id,
            rating: 0.,
            rating_version: 0,
            created_at: now,
            updated_at: now,
        };
        state.recipes.insert(id, recipe.clone());

        Ok(recipe)
    }

    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, Error> {
        Ok(self.state.read().await.recipes.get(&recipe_id).cloned())
    }

    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error> {
        let mut rows = self.state.read().await.matching_recipes(filter);
        sort_recipes(&mut rows, filter.order);

        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit.unwrap_or(RECIPE_COUNT_PER_PAGE)).unwrap_or(0);

        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, Error> {
        let count = self.state.read().await.matching_recipes(filter).len();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn find_recipes_by_ids(&self, recipe_ids: &[Id]) -> Result<Vec<Recipe>, Error> {
        let state = self.state.read().await;
        Ok(state
            .recipes
            .values()
            .filter(|r| recipe_ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn update_recipe(
        &self,
        recipe_id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, Error> {
        let mut state = self.state.write().await;
        let recipe = match state.recipes.get_mut(&recipe_id) {
            Some(recipe) => recipe,
            None => return Ok(None),
        };

        if let Some(title) = changes.title {
            recipe.title = title;
        }
        if let Some(ingredients) = changes.ingredients {
            recipe.ingredients = ingredients;
        }
        if let Some(directions) = changes.directions {
            recipe.directions = directions;
        }
        if let Some(category) = changes.category {
            recipe.category = category;
        }
        if let Some(nutritional_info) = changes.nutritional_info {
            recipe.nutritional_info = nutritional_info;
        }
        recipe.updated_at = Utc::now();

        Ok(Some(recipe.clone()))
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        if state.recipes.remove(&recipe_id).is_none() {
            return Ok(false);
        }
        state.reviews.retain(|_, r| r.recipe_id != recipe_id);
        state.favorites.retain(|_, f| f.recipe_id != recipe_id);

        Ok(true)
    }

    async fn update_recipe_rating(
        &self,
        recipe_id: Id,
        rating: f64,
        expected_version: i64,
    ) -> Result<bool, Error> {
        let mut state = self.state.write().await;
        match state.recipes.get_mut(&recipe_id) {
            Some(recipe) if recipe.rating_version == expected_version => {
                recipe.rating = rating;
                recipe.rating_version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_review(
        &self,
        recipe_id: Id,
        user_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error> {
        let mut state = self.state.write().await;
        let exists = state
            .reviews
            .values()
            .any(|r| r.recipe_id == recipe_id && r.user_id == user_id);
        if exists {
            return Ok(None);
        }

        let id = state.next_id();
        let now = Utc::now();
        let review = Review {
            id,
            recipe_id,
            user_id,
            rating,
            comment,
            created_at: now,
            updated_at: now,
        };
        state.reviews.insert(id, review.clone());

        Ok(Some(review))
    }

    async fn get_review(&self, review_id: Id) -> Result<Option<Review>, Error> {
        Ok(self.state.read().await.reviews.get(&review_id).cloned())
    }

    async fn find_reviews_by_recipe(&self, recipe_id: Id) -> Result<Vec<Review>, Error> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.recipe_id == recipe_id)
            .cloned()
            .collect())
    }

    async fn find_reviews_by_user(&self, user_id: Id) -> Result<Vec<Review>, Error> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_review(
        &self,
        review_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error> {
        let mut state = self.state.write().await;
        Ok(state.reviews.get_mut(&review_id).map(|review| {
            review.rating = rating;
            review.comment = comment;
            review.updated_at = Utc::now();
            review.clone()
        }))
    }

    async fn delete_review(&self, review_id: Id) -> Result<bool, Error> {
        Ok(self.state.write().await.reviews.remove(&review_id).is_some())
    }

    async fn insert_favorite(
        &self,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<Option<Favorite>, Error> {
        let mut state = self.state.write().await;
        let exists = state
            .favorites
            .values()
            .any(|f| f.user_id == user_id && f.recipe_id == recipe_id);
        if exists {
            return Ok(None);
        }

        let id = state.next_id();
        let favorite = Favorite {
            id,
            user_id,
            recipe_id,
            created_at: Utc::now(),
        };
        state.favorites.insert(id, favorite.clone());

        Ok(Some(favorite))
    }

    async fn get_favorite(&self, favorite_id: Id) -> Result<Option<Favorite>, Error> {
        Ok(self.state.read().await.favorites.get(&favorite_id).cloned())
    }

    async fn find_favorites_by_recipe(&self, recipe_id: Id) -> Result<Vec<Favorite>, Error> {
        let state = self.state.read().await;
        Ok(state
            .favorites
            .values()
            .filter(|f| f.recipe_id == recipe_id)
            .cloned()
            .collect())
    }

    async fn find_favorites_by_user(&self, user_id: Id) -> Result<Vec<Favorite>, Error> {
        let state = self.state.read().await;
        let mut rows: Vec<Favorite> = state
            .favorites
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows)
    }

    async fn delete_favorite(&self, favorite_id: Id) -> Result<bool, Error> {
        Ok(self.state.write().await.favorites.remove(&favorite_id).is_some())
    }
}
