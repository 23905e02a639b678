use crate::{
    authentication::{jwt::SessionData, permissions::Resource},
    error::{Error, HtmlError},
    schema::{Favorite, Id},
    store::RecipeStore,
};

pub async fn list_favorites(
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<Vec<Favorite>, Error> {
    store.find_favorites_by_user(session.user_id).await
}

pub async fn add_to_favorites(
    recipe_id: Id,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<Favorite, Error> {
    if store.get_recipe(recipe_id).await?.is_none() {
        return Err(HtmlError::NotFound.new("Recipe not found"));
    }

    store
        .insert_favorite(session.user_id, recipe_id)
        .await?
        .ok_or_else(|| HtmlError::InvalidRequest.new("Recipe is already in favorites"))
}

pub async fn remove_from_favorites(
    favorite_id: Id,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<(), Error> {
    let favorite = store
        .get_favorite(favorite_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Favorite not found"))?;
    session.authorize(Resource::Favorite {
        owner_id: favorite.user_id,
    })?;

    if !store.delete_favorite(favorite_id).await? {
        return Err(HtmlError::NotFound.new("Favorite not found"));
    }

    Ok(())
}
