//! Trending ranking.
//!
//! ```text
//! popularity = round(favorites * 0.3 + reviews * 0.2 + avg_rating * 0.5, 2)
//! ```
//!
//! The score is a projection computed on demand and is never stored.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    scoring::rating::average_rating,
    schema::{Favorite, Id, Recipe, Review},
};

// Weights expressed in hundredths, so that the 2 decimal rounding happens on
// an integer scale.
const FAVORITES_WEIGHT: f64 = 30.;
const REVIEWS_WEIGHT: f64 = 20.;
const RATING_WEIGHT: f64 = 50.;

pub const TRENDING_DEFAULT_LIMIT: usize = 10;
pub const TRENDING_MAX_LIMIT: usize = 100;

pub fn popularity_score(favorites_count: usize, reviews_count: usize, avg_rating: f64) -> f64 {
    let hundredths = favorites_count as f64 * FAVORITES_WEIGHT
        + reviews_count as f64 * REVIEWS_WEIGHT
        + avg_rating * RATING_WEIGHT;

    hundredths.round() / 100.
}

/// Requested trending size capped at `TRENDING_MAX_LIMIT`. A missing or
/// zero request means the default.
pub fn trending_limit(requested: Option<usize>) -> usize {
    requested
        .filter(|limit| *limit > 0)
        .unwrap_or(TRENDING_DEFAULT_LIMIT)
        .min(TRENDING_MAX_LIMIT)
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    #[serde(rename = "favoritesCount")]
    pub favorites_count: usize,
    #[serde(rename = "reviewsCount")]
    pub reviews_count: usize,
    #[serde(rename = "avgRating")]
    pub avg_rating: f64,
    #[serde(rename = "popularityScore")]
    pub popularity_score: f64,
}

impl TrendingRecipe {
    pub fn score(recipe: Recipe, favorites: &[Favorite], reviews: &[Review]) -> Self {
        let avg_rating = average_rating(reviews);

        Self {
            recipe,
            favorites_count: favorites.len(),
            reviews_count: reviews.len(),
            avg_rating,
            popularity_score: popularity_score(favorites.len(), reviews.len(), avg_rating),
        }
    }
}

/// Scores every recipe against the favorites and reviews referencing it and
/// returns the `limit` best, highest score first. Equal scores are ordered
/// by recipe id so the result is reproducible.
pub fn rank_trending(
    recipes: Vec<Recipe>,
    favorites: &[Favorite],
    reviews: &[Review],
    limit: usize,
) -> Vec<TrendingRecipe> {
    let mut favorites_by_recipe: HashMap<Id, Vec<Favorite>> = HashMap::new();
    favorites.iter().for_each(|f| {
        favorites_by_recipe
            .entry(f.recipe_id)
            .or_default()
            .push(f.clone())
    });

    let mut reviews_by_recipe: HashMap<Id, Vec<Review>> = HashMap::new();
    reviews.iter().for_each(|r| {
        reviews_by_recipe
            .entry(r.recipe_id)
            .or_default()
            .push(r.clone())
    });

    let mut ranked: Vec<TrendingRecipe> = recipes
        .into_iter()
        .map(|recipe| {
            let favorites = favorites_by_recipe
                .get(&recipe.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let reviews = reviews_by_recipe
                .get(&recipe.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            TrendingRecipe::score(recipe, favorites, reviews)
        })
        .collect();

    sort_trending(&mut ranked);
    ranked.truncate(limit);
    ranked
}

pub fn sort_trending(ranked: &mut [TrendingRecipe]) {
    ranked.sort_by(|a, b| {
        b.popularity_score
            .total_cmp(&a.popularity_score)
            .then(a.recipe.id.cmp(&b.recipe.id))
    });
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::schema::NutritionalInfo;

    fn recipe(id: Id) -> Recipe {
        let now = Utc::now();
        Recipe {
            id,
            title: format!("Recipe {id}"),
            ingredients: vec![],
            directions: vec![],
            category: String::from("snack"),
            nutritional_info: NutritionalInfo::default(),
            author_id: 1,
            rating: 0.,
            rating_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn favorite(id: Id, recipe_id: Id) -> Favorite {
        Favorite {
            id,
            user_id: id,
            recipe_id,
            created_at: Utc::now(),
        }
    }

    fn review(id: Id, recipe_id: Id, rating: i32) -> Review {
        let now = Utc::now();
        Review {
            id,
            recipe_id,
            user_id: id,
            rating,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn worked_example_scores_3_55() {
        let favorites = [favorite(1, 1), favorite(2, 1), favorite(3, 1)];
        let reviews = [review(4, 1, 4), review(5, 1, 5)];

        let ranked = rank_trending(vec![recipe(1)], &favorites, &reviews, 10);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].favorites_count, 3);
        assert_eq!(ranked[0].reviews_count, 2);
        assert!(approx(ranked[0].avg_rating, 4.5));
        assert!(approx(ranked[0].popularity_score, 3.55));
    }

    #[test]
    fn untouched_recipe_scores_zero() {
        let ranked = rank_trending(vec![recipe(1)], &[], &[], 10);
        assert_eq!(ranked[0].avg_rating, 0.);
        assert_eq!(ranked[0].popularity_score, 0.);
    }

    #[test]
    fn score_is_rounded_to_two_decimals() {
        // 1 * 0.2 + (5/3) * 0.5 = 1.0333...
        assert!(approx(popularity_score(0, 1, 5. / 3.), 1.03));
        // 0.5 * 0.5 = 0.25, stays exact
        assert!(approx(popularity_score(0, 0, 0.5), 0.25));
    }

    #[rstest]
    #[case(0, 0, 0.)]
    #[case(2, 3, 3.5)]
    #[case(10, 1, 5.)]
    fn score_is_monotonic_in_each_input(
        #[case] favorites: usize,
        #[case] reviews: usize,
        #[case] rating: f64,
    ) {
        let base = popularity_score(favorites, reviews, rating);
        assert!(popularity_score(favorites + 1, reviews, rating) >= base);
        assert!(popularity_score(favorites, reviews + 1, rating) >= base);
        assert!(popularity_score(favorites, reviews, rating + 0.25) >= base);
    }

    #[test]
    fn higher_score_sorts_first() {
        let mut ranked = vec![
            TrendingRecipe {
                recipe: recipe(1),
                favorites_count: 0,
                reviews_count: 0,
                avg_rating: 0.,
                popularity_score: 3.54,
            },
            TrendingRecipe {
                recipe: recipe(2),
                favorites_count: 0,
                reviews_count: 0,
                avg_rating: 0.,
                popularity_score: 3.55,
            },
        ];
        sort_trending(&mut ranked);

        assert_eq!(ranked[0].recipe.id, 2);
        assert_eq!(ranked[1].recipe.id, 1);
    }

    #[test]
    fn ties_break_on_recipe_id_and_limit_truncates() {
        let favorites = [favorite(10, 3), favorite(11, 2), favorite(12, 1)];

        let ranked = rank_trending(
            vec![recipe(3), recipe(1), recipe(2), recipe(4)],
            &favorites,
            &[],
            3,
        );

        let ids: Vec<Id> = ranked.iter().map(|r| r.recipe.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn serializes_with_camel_case_annotations() {
        let ranked = rank_trending(vec![recipe(1)], &[favorite(2, 1)], &[], 1);
        let json = serde_json::to_value(&ranked[0]).unwrap();

        assert_eq!(json["favoritesCount"], 1);
        assert_eq!(json["reviewsCount"], 0);
        assert_eq!(json["title"], "Recipe 1");
        assert!(json.get("popularityScore").is_some());
    }

    #[rstest]
    #[case(None, 10)]
    #[case(Some(0), 10)]
    #[case(Some(1), 1)]
    #[case(Some(25), 25)]
    #[case(Some(5000), 100)]
    fn limit_is_clamped(#[case] requested: Option<usize>, #[case] expected: usize) {
        assert_eq!(trending_limit(requested), expected);
    }
}
