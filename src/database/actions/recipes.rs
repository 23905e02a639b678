use crate::{
    authentication::{
        jwt::SessionData,
        permissions::{ActionType, Resource},
    },
    constants::{RECIPE_COUNT_PER_PAGE, RECIPE_MAX_PAGE_SIZE},
    error::{Error, HtmlError},
    pagination::PageContext,
    schema::{Id, NewRecipe, Recipe, RecipeChanges, RecipeFilter},
    store::RecipeStore,
};

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub async fn create_recipe(
    recipe: NewRecipe,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::CreateRecipes)?;

    let title = recipe.title.trim().to_string();
    if title.is_empty() {
        return Err(HtmlError::InvalidRequest.new("Title is required"));
    }
    recipe.nutritional_info.validate()?;

    let recipe = NewRecipe {
        title,
        ingredients: clean_list(recipe.ingredients),
        directions: clean_list(recipe.directions),
        category: recipe.category.trim().to_string(),
        nutritional_info: recipe.nutritional_info,
    };

    let recipe = store.insert_recipe(session.user_id, recipe).await?;
    log::info!("> Recipe {} created by {}", recipe.id, session.username);

    Ok(recipe)
}

pub async fn get_recipe(recipe_id: Id, store: &dyn RecipeStore) -> Result<Recipe, Error> {
    store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))
}

/// Recipe the session may modify: its own, or any for admins.
pub async fn get_recipe_mut(
    recipe_id: Id,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(recipe_id, store).await?;
    session.authorize(Resource::Recipe {
        author_id: recipe.author_id,
    })?;

    Ok(recipe)
}

/// Requested page size capped at `RECIPE_MAX_PAGE_SIZE`, the default when
/// missing or not positive.
pub fn recipe_page_size(requested: Option<i64>) -> i64 {
    requested
        .filter(|limit| *limit > 0)
        .unwrap_or(RECIPE_COUNT_PER_PAGE)
        .min(RECIPE_MAX_PAGE_SIZE)
}

pub async fn fetch_recipes(
    filter: RecipeFilter,
    store: &dyn RecipeStore,
) -> Result<PageContext<Recipe>, Error> {
    let page_size = recipe_page_size(filter.limit);
    let filter = RecipeFilter {
        limit: Some(page_size),
        offset: filter.offset.max(0),
        ..filter
    };

    let rows = store.find_recipes(&filter).await?;
    let total_count = store.count_recipes(&filter).await?;

    Ok(PageContext::from_rows(rows, total_count, page_size, filter.offset))
}

pub async fn update_recipe(
    recipe_id: Id,
    changes: RecipeChanges,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<Recipe, Error> {
    get_recipe_mut(recipe_id, session, store).await?;

    if changes
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(HtmlError::InvalidRequest.new("Title is required"));
    }
    if let Some(nutritional_info) = &changes.nutritional_info {
        nutritional_info.validate()?;
    }

    let changes = RecipeChanges {
        title: changes.title.map(|t| t.trim().to_string()),
        ingredients: changes.ingredients.map(clean_list),
        directions: changes.directions.map(clean_list),
        category: changes.category.map(|c| c.trim().to_string()),
        nutritional_info: changes.nutritional_info,
    };

    store
        .update_recipe(recipe_id, changes)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("Recipe not found"))
}

pub async fn delete_recipe(
    recipe_id: Id,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<(), Error> {
    get_recipe_mut(recipe_id, session, store).await?;

    if !store.delete_recipe(recipe_id).await? {
        return Err(HtmlError::NotFound.new("Recipe not found"));
    }

    log::info!("> Recipe {recipe_id} removed by {}", session.username);
    Ok(())
}
