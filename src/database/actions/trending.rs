use crate::{
    error::Error,
    schema::RecipeFilter,
    scoring::popularity::{rank_trending, trending_limit, TrendingRecipe},
    store::RecipeStore,
};

/// Ranks the whole catalogue by popularity. Computed on every call.
pub async fn trending_recipes(
    limit: Option<usize>,
    store: &dyn RecipeStore,
) -> Result<Vec<TrendingRecipe>, Error> {
    let filter = RecipeFilter {
        limit: Some(i64::MAX),
        ..Default::default()
    };
    let recipes = store.find_recipes(&filter).await?;

    let mut favorites = vec![];
    let mut reviews = vec![];
    for recipe in recipes.iter() {
        favorites.extend(store.find_favorites_by_recipe(recipe.id).await?);
        reviews.extend(store.find_reviews_by_recipe(recipe.id).await?);
    }

    let ranked = rank_trending(recipes, &favorites, &reviews, trending_limit(limit));
    log::debug!("> Ranked {} trending recipe(s)", ranked.len());

    Ok(ranked)
}
