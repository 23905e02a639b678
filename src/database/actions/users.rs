use std::collections::BTreeSet;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, verify_jwt_session, SessionData, SessionKeys},
        permissions::Resource,
    },
    error::{Error, HtmlError},
    schema::{Id, NewUser, User, UserRole},
    scoring::rating::recompute_recipe_rating,
    store::RecipeStore,
};

/// Creates a user with role `user`, storing an argon2 hash of the password.
pub async fn register_user(
    username: &str,
    email: &str,
    password: &str,
    store: &dyn RecipeStore,
) -> Result<User, Error> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(HtmlError::InvalidRequest.new("All fields are required"));
    }
    if !email.contains('@') {
        return Err(HtmlError::InvalidRequest.new("Invalid email"));
    }

    let user = NewUser {
        username: username.to_string(),
        email: email.to_lowercase(),
        password_hash: hash_password(password)?,
        role: UserRole::User,
    };

    match store.insert_user(user).await? {
        Some(user) => {
            log::info!("> Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        None => Err(HtmlError::InvalidRequest.new("User already exists")),
    }
}

/// Returns a signed session token.
pub async fn login_user(
    username: &str,
    password: &str,
    keys: &SessionKeys,
    store: &dyn RecipeStore,
) -> Result<String, Error> {
    let user = match store.get_user_by_username(username.trim()).await? {
        Some(user) => user,
        None => return Err(HtmlError::InvalidRequest.new("Invalid credentials")),
    };

    if !verify_password(password, &user.password)? {
        return Err(HtmlError::InvalidRequest.new("Invalid credentials"));
    }

    generate_jwt_session(&user, keys)
}

/// Session of the user a token names. Identity and role come from the
/// stored user, so role changes and deletions apply to tokens already issued.
pub async fn resolve_session(
    token: &str,
    keys: &SessionKeys,
    store: &dyn RecipeStore,
) -> Result<SessionData, Error> {
    let claims = verify_jwt_session(token, keys)?;

    let user = store
        .get_user(claims.user_id)
        .await?
        .ok_or_else(|| HtmlError::InvalidSession.new("Invalid session; User not found"))?;

    Ok(SessionData::from(&user))
}

pub async fn list_users(session: &SessionData, store: &dyn RecipeStore) -> Result<Vec<User>, Error> {
    session.authorize(Resource::Users)?;

    store.list_users().await
}

pub async fn delete_user(
    user_id: Id,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<(), Error> {
    session.authorize(Resource::Users)?;

    // Reviews on recipes the user wrote disappear with the recipes themselves.
    let reviewed: BTreeSet<Id> = store
        .find_reviews_by_user(user_id)
        .await?
        .into_iter()
        .map(|r| r.recipe_id)
        .collect();
    let reviewed: Vec<Id> = reviewed.into_iter().collect();
    let affected: Vec<Id> = store
        .find_recipes_by_ids(&reviewed)
        .await?
        .into_iter()
        .filter(|r| r.author_id != user_id)
        .map(|r| r.id)
        .collect();

    if !store.delete_user(user_id).await? {
        return Err(HtmlError::NotFound.new("User not found"));
    }

    for recipe_id in affected {
        match recompute_recipe_rating(store, recipe_id).await {
            Ok(_) => {}
            Err(e) if e.kind == HtmlError::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    log::info!("> User {user_id} removed by {}", session.username);
    Ok(())
}

pub async fn set_user_role(
    user_id: Id,
    role: UserRole,
    session: &SessionData,
    store: &dyn RecipeStore,
) -> Result<User, Error> {
    session.authorize(Resource::Users)?;

    store
        .set_user_role(user_id, role)
        .await?
        .ok_or_else(|| HtmlError::NotFound.new("User not found"))
}
