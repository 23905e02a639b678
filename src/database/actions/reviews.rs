use serde::Serialize;

use crate::{
    authentication::{
        jwt::SessionData,
        permissions::{ActionType, Resource},
    },
    error::{Error, HtmlError},
    schema::{Id, Review},
    scoring::rating::{average_rating, recompute_recipe_rating, validate_rating},
    store::RecipeStore,
};

/// A review together with the recipe rating it produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub review: Review,
    pub recipe_rating: f64,
    /// Set when the stored rating could not be written yet and still needs
    /// a recompute.
    #[serde(skip)]
    pub rating_pending: bool,
}

impl ReviewOutcome {
    /// Runs the aggregator after a review write has been committed. The write
    /// stands either way: a lost rating race is reported as pending with the
    /// mean of the current reviews.
    async fn settle(review: Review, store: &dyn RecipeStore) -> Result<Self, Error> {
        let (recipe_rating, rating_pending) =
            match recompute_recipe_rating(store, review.recipe_id).await {
                Ok(rating) => (rating, false),
                Err(e) if e.kind == HtmlError::Conflict => {
                    log::warn!("> Rating of recipe {} left pending: {e}", review.recipe_id);
                    let reviews = store.find_reviews_by_recipe(review.recipe_id).await?;
                    (average_rating(&reviews), true)
                }
                // Recipe deleted since the write, its reviews went with it.
                Err(e) if e.kind == HtmlError::NotFound => (0., false),
                Err(e) => return Err(e),
            };

        Ok(Self {
            review,
            recipe_rating,
            rating_pending,
        })
    }
}

fn clean_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

pub async fn list_reviews(recipe_id: Id, store: &dyn RecipeStore) -> Result<Vec<Review>, Error> {
    store.find_reviews_by_recipe(recipe_id).await
}

/// One review per user and recipe; a second submission is a conflict.
pub async fn submit_review(
    recipe_id: Id,
    rating: i64,
    comment: Option<String>,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<ReviewOutcome, Error> {
    session.authenticate(ActionType::CreateReviews)?;
    let rating = validate_rating(rating)?;

    if store.get_recipe(recipe_id).await?.is_none() {
        return Err(HtmlError::NotFound.new("Recipe not found"));
    }

    let review = store
        .insert_review(recipe_id, session.user_id, rating, clean_comment(comment))
        .await?
        .ok_or_else(|| HtmlError::Conflict.new("You have already reviewed this recipe"))?;

    ReviewOutcome::settle(review, store).await
}

/// Omitted fields keep their stored values.
pub async fn update_review(
    review_id: Id,
    rating: Option<i64>,
    comment: Option<String>,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<ReviewOutcome, Error> {
    let rating = rating.map(validate_rating).transpose()?;

    let review = store
        .get_review(review_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Review not found"))?;
    session.authorize(Resource::Review {
        author_id: review.user_id,
    })?;

    let comment = match comment {
        Some(comment) => clean_comment(Some(comment)),
        None => review.comment,
    };

    let updated = store
        .update_review(review_id, rating.unwrap_or(review.rating), comment)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Review not found"))?;

    ReviewOutcome::settle(updated, store).await
}

pub async fn delete_review(
    review_id: Id,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<ReviewOutcome, Error> {
    let review = store
        .get_review(review_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Review not found"))?;
    session.authorize(Resource::Review {
        author_id: review.user_id,
    })?;

    if !store.delete_review(review_id).await? {
        return Err(HtmlError::NotFound.new("Review not found"));
    }

    ReviewOutcome::settle(review, store).await
}
