//! Postgres implementation of [`RecipeStore`].
//!
//! Expected tables:
//!
//! - `users (id SERIAL, username TEXT UNIQUE, email TEXT UNIQUE, password TEXT,
//!   role user_role DEFAULT 'user', created_at TIMESTAMPTZ DEFAULT NOW())`
//! - `recipes (id SERIAL, title TEXT, ingredients TEXT[], directions TEXT[],
//!   category TEXT, calories/protein/carbs/fat DOUBLE PRECISION DEFAULT 0,
//!   author_id INT REFERENCES users ON DELETE CASCADE, rating DOUBLE PRECISION DEFAULT 0,
//!   rating_version BIGINT DEFAULT 0, created_at/updated_at TIMESTAMPTZ DEFAULT NOW())`
//! - `reviews (id SERIAL, recipe_id INT REFERENCES recipes ON DELETE CASCADE,
//!   user_id INT REFERENCES users ON DELETE CASCADE, rating INT CHECK (rating BETWEEN 1 AND 5),
//!   comment TEXT, created_at/updated_at TIMESTAMPTZ, UNIQUE (recipe_id, user_id))`
//! - `favorites (id SERIAL, user_id INT, recipe_id INT, created_at TIMESTAMPTZ,
//!   UNIQUE (user_id, recipe_id))`, both references cascading.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::{Error, QueryError},
    schema::{
        Favorite, Id, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeFilter, Review, User,
        UserRole,
    },
    store::RecipeStore,
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// `%term%` with LIKE wildcards in `term` escaped by a backslash, the
/// default escape character of `ILIKE`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter) {
    query.push(" WHERE TRUE");

    if let Some(search) = &filter.search {
        let patterns: Vec<String> = filter
            .search_terms()
            .into_iter()
            .map(|term| like_pattern(&term))
            .collect();

        query
            .push(" AND (title ILIKE ")
            .push_bind(like_pattern(search))
            .push(" OR EXISTS (SELECT 1 FROM unnest(ingredients) AS i WHERE i ILIKE ANY(")
            .push_bind(patterns)
            .push(")))");
    }

    if let Some(category) = &filter.category {
        query.push(" AND category = ").push_bind(category.to_owned());
    }

    if let Some(min) = filter.min_calories {
        query.push(" AND calories >= ").push_bind(min);
    }

    if let Some(max) = filter.max_calories {
        query.push(" AND calories <= ").push_bind(max);
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn get_user(&self, user_id: Id) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as(
            "
            INSERT INTO users (username, email, password, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING RETURNING *;
        ",
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn list_users(&self) -> Result<Vec<User>, Error> {
        let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_user(&self, user_id: Id) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_user_role(&self, user_id: Id, role: UserRole) -> Result<Option<User>, Error> {
        let row: Option<User> = sqlx::query_as("UPDATE users SET role = $1 WHERE id = $2 RETURNING *")
            .bind(role)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn insert_recipe(&self, author_id: Id, recipe: NewRecipe) -> Result<Recipe, Error> {
        let row: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (title, ingredients, directions, category, calories, protein, carbs, fat, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
        ",
        )
        .bind(recipe.title)
        .bind(recipe.ingredients)
        .bind(recipe.directions)
        .bind(recipe.category)
        .bind(recipe.nutritional_info.calories)
        .bind(recipe.nutritional_info.protein)
        .bind(recipe.nutritional_info.carbs)
        .bind(recipe.nutritional_info.fat)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, Error> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn find_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM recipes");
        push_filter(&mut query, filter);
        query
            .push(format!(" ORDER BY {}", filter.order.sql()))
            .push(" LIMIT ")
            .push_bind(filter.limit.unwrap_or(RECIPE_COUNT_PER_PAGE))
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<Recipe> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn count_recipes(&self, filter: &RecipeFilter) -> Result<i64, Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM recipes");
        push_filter(&mut query, filter);

        let count: (i64,) = query
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(count.0)
    }

    async fn find_recipes_by_ids(&self, recipe_ids: &[Id]) -> Result<Vec<Recipe>, Error> {
        let rows: Vec<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = ANY($1) ORDER BY id")
            .bind(recipe_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn update_recipe(
        &self,
        recipe_id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, Error> {
        let nutrition = changes.nutritional_info;

        let row: Option<Recipe> = sqlx::query_as(
            "
            UPDATE recipes SET
            title = COALESCE($1, title),
            ingredients = COALESCE($2, ingredients),
            directions = COALESCE($3, directions),
            category = COALESCE($4, category),
            calories = COALESCE($5, calories),
            protein = COALESCE($6, protein),
            carbs = COALESCE($7, carbs),
            fat = COALESCE($8, fat),
            updated_at = NOW()
            WHERE id = $9
            RETURNING *
        ",
        )
        .bind(changes.title)
        .bind(changes.ingredients)
        .bind(changes.directions)
        .bind(changes.category)
        .bind(nutrition.map(|n| n.calories))
        .bind(nutrition.map(|n| n.protein))
        .bind(nutrition.map(|n| n.carbs))
        .bind(nutrition.map(|n| n.fat))
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_recipe_rating(
        &self,
        recipe_id: Id,
        rating: f64,
        expected_version: i64,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            "
            UPDATE recipes SET rating = $1, rating_version = rating_version + 1
            WHERE id = $2 AND rating_version = $3
        ",
        )
        .bind(rating)
        .bind(recipe_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_review(
        &self,
        recipe_id: Id,
        user_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error> {
        let row: Option<Review> = sqlx::query_as(
            "
            INSERT INTO reviews (recipe_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (recipe_id, user_id) DO NOTHING RETURNING *;
        ",
        )
        .bind(recipe_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_review(&self, review_id: Id) -> Result<Option<Review>, Error> {
        let row: Option<Review> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1")
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn find_reviews_by_recipe(&self, recipe_id: Id) -> Result<Vec<Review>, Error> {
        let rows: Vec<Review> = sqlx::query_as("SELECT * FROM reviews WHERE recipe_id = $1 ORDER BY id")
            .bind(recipe_id)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn find_reviews_by_user(&self, user_id: Id) -> Result<Vec<Review>, Error> {
        let rows: Vec<Review> = sqlx::query_as("SELECT * FROM reviews WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn update_review(
        &self,
        review_id: Id,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Option<Review>, Error> {
        let row: Option<Review> = sqlx::query_as(
            "UPDATE reviews SET rating = $1, comment = $2, updated_at = NOW() WHERE id = $3 RETURNING *",
        )
        .bind(rating)
        .bind(comment)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn delete_review(&self, review_id: Id) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_favorite(
        &self,
        user_id: Id,
        recipe_id: Id,
    ) -> Result<Option<Favorite>, Error> {
        let row: Option<Favorite> = sqlx::query_as(
            "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *;",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn get_favorite(&self, favorite_id: Id) -> Result<Option<Favorite>, Error> {
        let row: Option<Favorite> = sqlx::query_as("SELECT * FROM favorites WHERE id = $1")
            .bind(favorite_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(row)
    }

    async fn find_favorites_by_recipe(&self, recipe_id: Id) -> Result<Vec<Favorite>, Error> {
        let rows: Vec<Favorite> = sqlx::query_as("SELECT * FROM favorites WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_all(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn find_favorites_by_user(&self, user_id: Id) -> Result<Vec<Favorite>, Error> {
        let rows: Vec<Favorite> =
            sqlx::query_as("SELECT * FROM favorites WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(QueryError::from)?;

        Ok(rows)
    }

    async fn delete_favorite(&self, favorite_id: Id) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = $1")
            .bind(favorite_id)
            .execute(&self.pool)
            .await
            .map_err(QueryError::from)?;

        Ok(result.rows_affected() > 0)
    }
}
