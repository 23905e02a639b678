//! HTTP surface over the actions.
//!
//! Every route is boxed into a `BoxedFilter<(Response,)>` and the set is
//! joined with `or`. Errors travel as [`Error`] rejections and are rendered
//! by [`handle_rejection`] as `{"msg": ...}` with the matching status.

use std::{collections::HashMap, convert::Infallible, sync::Arc, time::Duration};

use redis::aio::MultiplexedConnection;
use serde::Serialize;
use serde_json::{json, Value};
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{self, ReviewOutcome},
    cache::cache::{rotate_recipe_cache, CacheKeyType, RedisValue},
    constants::{RATING_RETRY_DELAY_MS, SESSION_COOKIE},
    error::{Error, HtmlError},
    export::RecipeText,
    form::{Form, FormData},
    jwt::{SessionData, SessionKeys},
    middleware::{with_admin, with_session},
    rating::recompute_recipe_rating,
    schema::{Id, NewRecipe, NutritionalInfo, Recipe, RecipeChanges, RecipeFilter, RecipeOrder, UserRole},
    store::RecipeStore,
};

const BODY_LIMIT: u64 = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    pub keys: Arc<SessionKeys>,
    pub cache: Option<MultiplexedConnection>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecipeStore>, keys: SessionKeys) -> Self {
        Self {
            store,
            keys: Arc::new(keys),
            cache: None,
        }
    }

    pub fn with_cache(self, cache: MultiplexedConnection) -> Self {
        Self {
            cache: Some(cache),
            ..self
        }
    }

    fn store(&self) -> &dyn RecipeStore {
        self.store.as_ref()
    }

    /// Drops every cached recipe. Failures are logged, not returned.
    async fn rotate_cache(&self) {
        if let Some(mut cache) = self.cache.clone() {
            if let Err(e) = rotate_recipe_cache(&mut cache).await {
                log::error!("> Failed to rotate recipe cache: {e}");
            }
        }
    }

    /// Review writes stand even when their action fails afterwards, so the
    /// cache is rotated regardless and pending ratings get another try.
    async fn after_review_write(
        &self,
        result: Result<ReviewOutcome, Error>,
    ) -> Result<ReviewOutcome, Rejection> {
        self.rotate_cache().await;

        let outcome = result.map_err(reject)?;
        if outcome.rating_pending {
            self.settle_rating_later(outcome.review.recipe_id);
        }

        Ok(outcome)
    }

    fn settle_rating_later(&self, recipe_id: Id) {
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(RATING_RETRY_DELAY_MS)).await;
            match recompute_recipe_rating(state.store(), recipe_id).await {
                Ok(_) => state.rotate_cache().await,
                Err(e) => log::error!("> Rating of recipe {recipe_id} still pending: {e}"),
            }
        });
    }
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json::<FormData>())
}

fn reply_json<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn reply_msg(msg: &str) -> Response {
    reply_json(&json!({ "msg": msg }), StatusCode::OK)
}

fn reject(e: Error) -> Rejection {
    warp::reject::custom(e)
}

fn query_form(query: HashMap<String, String>) -> Form {
    Form::from_data(
        query
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

fn optional_number(form: &Form, key: &str) -> Result<Option<f64>, Error> {
    match form.contains(key) {
        true => form.get_number(key).map(Some),
        false => Ok(None),
    }
}

fn recipe_filter(form: &Form) -> Result<RecipeFilter, Error> {
    let order = match form.contains("sort") {
        true => form.get_value::<RecipeOrder>("sort")?,
        false => RecipeOrder::default(),
    };

    // `page` is 1-based and wins over a raw `offset`.
    let limit = form.get_optional_int("limit")?;
    let offset = match form.get_optional_int("page")? {
        Some(page) => (page.max(1) - 1).saturating_mul(actions::recipe_page_size(limit)),
        None => form.get_optional_int("offset")?.unwrap_or(0),
    };

    Ok(RecipeFilter {
        search: form.get_optional_str("search")?.filter(|s| !s.trim().is_empty()),
        category: form.get_optional_str("category")?.filter(|s| !s.is_empty()),
        min_calories: optional_number(form, "minCalories")?,
        max_calories: optional_number(form, "maxCalories")?,
        order,
        offset,
        limit,
    })
}

/// Missing nutrition values count as 0.
fn nutritional_info(form: &Form) -> Result<NutritionalInfo, Error> {
    let number = |key: &str| optional_number(form, key).map(|n| n.unwrap_or(0.));

    Ok(NutritionalInfo {
        calories: number("calories")?,
        protein: number("protein")?,
        carbs: number("carbs")?,
        fat: number("fat")?,
    })
}

fn new_recipe(form: &Form) -> Result<NewRecipe, Error> {
    Ok(NewRecipe {
        title: form.get_optional_str("title")?.unwrap_or_default(),
        ingredients: form.get_str_list("ingredients")?,
        directions: form.get_str_list("directions")?,
        category: form.get_optional_str("category")?.unwrap_or_default(),
        nutritional_info: form
            .get_form("nutritionalInfo")
            .map(|f| nutritional_info(&f))
            .transpose()?
            .unwrap_or_default(),
    })
}

fn recipe_changes(form: &Form) -> Result<RecipeChanges, Error> {
    let list = |key: &str| match form.contains(key) {
        true => form.get_str_list(key).map(Some),
        false => Ok(None),
    };

    Ok(RecipeChanges {
        title: form.get_optional_str("title")?,
        ingredients: list("ingredients")?,
        directions: list("directions")?,
        category: form.get_optional_str("category")?,
        nutritional_info: form
            .get_form("nutritionalInfo")
            .map(|f| nutritional_info(&f))
            .transpose()?,
    })
}

fn recipe_id(form: &Form) -> Result<Id, Error> {
    let id = form.get_int("recipeId")?;
    Id::try_from(id).map_err(|_e| HtmlError::InvalidRequest.new("Invalid recipe ID"))
}

// Auth

async fn register_handler(body: FormData, state: AppState) -> Result<Response, Rejection> {
    let form = Form::from_data(body);
    let user = actions::register_user(
        &form.get_str("username").map_err(reject)?,
        &form.get_str("email").map_err(reject)?,
        &form.get_str("password").map_err(reject)?,
        state.store(),
    )
    .await
    .map_err(reject)?;

    Ok(reply_json(&user, StatusCode::CREATED))
}

async fn login_handler(body: FormData, state: AppState) -> Result<Response, Rejection> {
    let form = Form::from_data(body);
    let token = actions::login_user(
        &form.get_str("username").map_err(reject)?,
        &form.get_str("password").map_err(reject)?,
        &state.keys,
        state.store(),
    )
    .await
    .map_err(reject)?;

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.keys.lifetime().num_seconds()
    );

    Ok(warp::reply::with_header(
        reply_json(&json!({ "token": token }), StatusCode::OK),
        "set-cookie",
        cookie,
    )
    .into_response())
}

// Recipes

async fn list_recipes_handler(
    query: HashMap<String, String>,
    state: AppState,
) -> Result<Response, Rejection> {
    let filter = recipe_filter(&query_form(query)).map_err(reject)?;
    let page = actions::fetch_recipes(filter, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&page, StatusCode::OK))
}

async fn trending_handler(
    query: HashMap<String, String>,
    state: AppState,
) -> Result<Response, Rejection> {
    let limit = query_form(query)
        .get_optional_int("limit")
        .map_err(reject)?
        .map(|l| usize::try_from(l).unwrap_or(0));
    let trending = actions::trending_recipes(limit, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&trending, StatusCode::OK))
}

async fn calories_handler(body: FormData, state: AppState) -> Result<Response, Rejection> {
    let ids = Form::from_data(body)
        .get_id_list("recipeIds")
        .map_err(reject)?;
    let summary = actions::calculate_calories(&ids, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&summary, StatusCode::OK))
}

async fn cached_recipe(recipe_id: Id, state: &AppState) -> Result<Recipe, Error> {
    if let Some(mut cache) = state.cache.clone() {
        let store = state.store.clone();
        let cached = RedisValue::<Recipe>::get_or_optional(
            CacheKeyType::Recipe.new(recipe_id),
            &mut cache,
            move || async move { store.get_recipe(recipe_id).await },
        )
        .await;

        match cached {
            Ok(Some(recipe)) => return Ok(recipe.value),
            Ok(None) => return Err(HtmlError::NotFound.new("Recipe not found")),
            Err(e) => log::error!("> Recipe cache unavailable: {e}"),
        }
    }

    actions::get_recipe(recipe_id, state.store()).await
}

async fn get_recipe_handler(recipe_id: Id, state: AppState) -> Result<Response, Rejection> {
    let recipe = cached_recipe(recipe_id, &state).await.map_err(reject)?;

    Ok(reply_json(&recipe, StatusCode::OK))
}

async fn download_text_handler(recipe_id: Id, state: AppState) -> Result<Response, Rejection> {
    let recipe = actions::get_recipe(recipe_id, state.store())
        .await
        .map_err(reject)?;
    let text = RecipeText::new(&recipe);

    let reply = warp::reply::with_header(
        text.to_string(),
        "content-type",
        "text/plain; charset=utf-8",
    );
    Ok(warp::reply::with_header(reply, "content-disposition", text.content_disposition())
        .into_response())
}

async fn create_recipe_handler(
    session: SessionData,
    body: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe = new_recipe(&Form::from_data(body)).map_err(reject)?;
    let recipe = actions::create_recipe(recipe, &session, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&recipe, StatusCode::CREATED))
}

async fn update_recipe_handler(
    recipe_id: Id,
    session: SessionData,
    body: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let changes = recipe_changes(&Form::from_data(body)).map_err(reject)?;
    let recipe = actions::update_recipe(recipe_id, changes, &session, state.store())
        .await
        .map_err(reject)?;
    state.rotate_cache().await;

    Ok(reply_json(&recipe, StatusCode::OK))
}

async fn delete_recipe_handler(
    recipe_id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    actions::delete_recipe(recipe_id, &session, state.store())
        .await
        .map_err(reject)?;
    state.rotate_cache().await;

    Ok(reply_msg("Recipe deleted"))
}

// Reviews

async fn list_reviews_handler(recipe_id: Id, state: AppState) -> Result<Response, Rejection> {
    let reviews = actions::list_reviews(recipe_id, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&reviews, StatusCode::OK))
}

async fn submit_review_handler(
    session: SessionData,
    body: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let form = Form::from_data(body);
    let outcome = actions::submit_review(
        recipe_id(&form).map_err(reject)?,
        form.get_int("rating").map_err(reject)?,
        form.get_optional_str("comment").map_err(reject)?,
        &session,
        state.store(),
    )
    .await;
    let outcome = state.after_review_write(outcome).await?;

    Ok(reply_json(&outcome, StatusCode::CREATED))
}

async fn update_review_handler(
    review_id: Id,
    session: SessionData,
    body: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let form = Form::from_data(body);
    let outcome = actions::update_review(
        review_id,
        form.get_optional_int("rating").map_err(reject)?,
        form.get_optional_str("comment").map_err(reject)?,
        &session,
        state.store(),
    )
    .await;
    let outcome = state.after_review_write(outcome).await?;

    Ok(reply_json(&outcome, StatusCode::OK))
}

async fn delete_review_handler(
    review_id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let outcome = actions::delete_review(review_id, &session, state.store()).await;
    let outcome = state.after_review_write(outcome).await?;

    Ok(reply_json(
        &json!({ "msg": "Review deleted", "recipe_rating": outcome.recipe_rating }),
        StatusCode::OK,
    ))
}

// Favorites

async fn list_favorites_handler(
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let favorites = actions::list_favorites(&session, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&favorites, StatusCode::OK))
}

async fn add_favorite_handler(
    session: SessionData,
    body: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let recipe_id = recipe_id(&Form::from_data(body)).map_err(reject)?;
    let favorite = actions::add_to_favorites(recipe_id, &session, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&favorite, StatusCode::CREATED))
}

async fn remove_favorite_handler(
    favorite_id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    actions::remove_from_favorites(favorite_id, &session, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_msg("Removed from favorites"))
}

// Users

async fn list_users_handler(session: SessionData, state: AppState) -> Result<Response, Rejection> {
    let users = actions::list_users(&session, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&users, StatusCode::OK))
}

async fn delete_user_handler(
    user_id: Id,
    session: SessionData,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = actions::delete_user(user_id, &session, state.store()).await;
    state.rotate_cache().await;
    result.map_err(reject)?;

    Ok(reply_msg("User deleted"))
}

async fn set_role_handler(
    user_id: Id,
    session: SessionData,
    body: FormData,
    state: AppState,
) -> Result<Response, Rejection> {
    let role = Form::from_data(body)
        .get_value::<UserRole>("role")
        .map_err(|_e| reject(HtmlError::InvalidRequest.new("Invalid role")))?;
    let user = actions::set_user_role(user_id, role, &session, state.store())
        .await
        .map_err(reject)?;

    Ok(reply_json(&user, StatusCode::OK))
}

fn auth_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(register_handler);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(login_handler);

    register.or(login).unify().boxed()
}

fn recipe_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(list_recipes_handler);

    let trending = warp::path!("recipes" / "trending")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(trending_handler);

    let calories = warp::path!("recipes" / "calculate-calories")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(calories_handler);

    let get = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_recipe_handler);

    let download = warp::path!("recipes" / Id / "download" / "text")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(download_text_handler);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_recipe_handler);

    let update = warp::path!("recipes" / Id)
        .and(warp::put())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update_recipe_handler);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe_handler);

    list.or(trending)
        .unify()
        .or(calories)
        .unify()
        .or(get)
        .unify()
        .or(download)
        .unify()
        .or(create)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn review_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("reviews" / "recipe" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_reviews_handler);

    let submit = warp::path!("reviews")
        .and(warp::post())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(submit_review_handler);

    let update = warp::path!("reviews" / Id)
        .and(warp::put())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update_review_handler);

    let delete = warp::path!("reviews" / Id)
        .and(warp::delete())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_review_handler);

    list.or(submit)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

fn favorite_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("favorites")
        .and(warp::get())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(with_state(state.clone()))
        .and_then(list_favorites_handler);

    let add = warp::path!("favorites")
        .and(warp::post())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(add_favorite_handler);

    let remove = warp::path!("favorites" / Id)
        .and(warp::delete())
        .and(with_session(state.keys.clone(), state.store.clone()))
        .and(with_state(state.clone()))
        .and_then(remove_favorite_handler);

    list.or(add).unify().or(remove).unify().boxed()
}

fn user_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let list = warp::path!("users")
        .and(warp::get())
        .and(with_admin(state.keys.clone(), state.store.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users_handler);

    let delete = warp::path!("users" / Id)
        .and(warp::delete())
        .and(with_admin(state.keys.clone(), state.store.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_user_handler);

    let set_role = warp::path!("users" / Id / "role")
        .and(warp::patch())
        .and(with_admin(state.keys.clone(), state.store.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(set_role_handler);

    list.or(delete).unify().or(set_role).unify().boxed()
}

/// The full API with errors rendered as JSON.
pub fn api(state: AppState) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    auth_routes(&state)
        .or(recipe_routes(&state))
        .unify()
        .or(review_routes(&state))
        .unify()
        .or(favorite_routes(&state))
        .unify()
        .or(user_routes(&state))
        .unify()
        .recover(handle_rejection)
        .unify()
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, msg) = if let Some(e) = err.find::<Error>() {
        if e.code >= 500 {
            log::error!("> {e}");
        }
        (e.status(), e.message())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, String::from("Invalid query"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, String::from("Payload too large"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, String::from("Method not allowed"))
    } else {
        log::error!("> Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error"),
        )
    };

    Ok(reply_json(&json!({ "msg": msg }), status))
}
