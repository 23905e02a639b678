//! Average rating maintenance.
//!
//! A recipe's `rating` is the plain mean of its review ratings and has to be
//! recomputed whenever one of those reviews is created, changed or removed.
//! The write back is a compare-and-swap on `rating_version`: a writer that
//! read a stale review set loses the swap and recomputes instead of
//! overwriting a newer average.

use crate::{
    constants::{MAX_RATING_UPDATE_ATTEMPTS, RATING_MAX, RATING_MIN},
    error::{Error, HtmlError},
    schema::{Id, Review},
    store::RecipeStore,
};

/// Mean of the review ratings, 0 when there are none.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.;
    }

    let total: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    total as f64 / reviews.len() as f64
}

/// Accepts integer ratings in `RATING_MIN..=RATING_MAX`.
pub fn validate_rating(value: i64) -> Result<i32, Error> {
    if !(i64::from(RATING_MIN)..=i64::from(RATING_MAX)).contains(&value) {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Rating must be between {RATING_MIN}-{RATING_MAX}"
        )));
    }

    Ok(value as i32)
}

/// Recomputes and stores the average rating of `recipe_id`, returning the
/// value written.
pub async fn recompute_recipe_rating(
    store: &dyn RecipeStore,
    recipe_id: Id,
) -> Result<f64, Error> {
    for attempt in 1..=MAX_RATING_UPDATE_ATTEMPTS {
        let recipe = store
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))?;

        let reviews = store.find_reviews_by_recipe(recipe_id).await?;
        let rating = average_rating(&reviews);

        if store
            .update_recipe_rating(recipe_id, rating, recipe.rating_version)
            .await?
        {
            log::info!(
                "> Recipe {recipe_id} rated {rating:.2} over {} review(s)",
                reviews.len()
            );
            return Ok(rating);
        }

        log::debug!("> Rating of recipe {recipe_id} changed underneath us (attempt {attempt})");
    }

    Err(HtmlError::Conflict.new("Recipe rating is being updated concurrently, try again"))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;

    use super::*;

    fn reviews(ratings: &[i32]) -> Vec<Review> {
        let now = Utc::now();
        ratings
            .iter()
            .enumerate()
            .map(|(i, rating)| Review {
                id: i as Id + 1,
                recipe_id: 1,
                user_id: i as Id + 1,
                rating: *rating,
                comment: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn empty_review_set_averages_to_zero() {
        assert_eq!(average_rating(&[]), 0.);
    }

    #[rstest]
    #[case(&[5], 5.)]
    #[case(&[4, 5], 4.5)]
    #[case(&[1, 2, 2], 5. / 3.)]
    #[case(&[3, 3, 3, 4], 3.25)]
    fn average_is_arithmetic_mean(#[case] ratings: &[i32], #[case] expected: f64) {
        assert!((average_rating(&reviews(ratings)) - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[case(-3)]
    fn out_of_range_ratings_are_rejected(#[case] value: i64) {
        let error = validate_rating(value).unwrap_err();
        assert_eq!(error.kind, HtmlError::InvalidRequest);
    }

    #[test]
    fn boundary_ratings_are_accepted() {
        assert_eq!(validate_rating(1).ok(), Some(1));
        assert_eq!(validate_rating(5).ok(), Some(5));
    }
}
