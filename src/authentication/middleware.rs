use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{
    actions::resolve_session, constants::SESSION_COOKIE, error::HtmlError,
    permissions::Resource, store::RecipeStore,
};

use super::jwt::{SessionData, SessionKeys};

fn bearer_token(header: Option<String>) -> Option<String> {
    header.and_then(|value| {
        value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
    })
}

/// Session from the `session` cookie, or from an `Authorization: Bearer`
/// header when the cookie is absent. The token's user is looked up on every
/// request.
pub fn with_session(
    keys: Arc<SessionKeys>,
    store: Arc<dyn RecipeStore>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .and_then(move |cookie: Option<String>, header: Option<String>| {
            let keys = keys.clone();
            let store = store.clone();
            async move {
                let token = cookie.or_else(|| bearer_token(header)).ok_or_else(|| {
                    warp::reject::custom(HtmlError::InvalidSession.new("Not logged in"))
                })?;

                resolve_session(&token, &keys, store.as_ref())
                    .await
                    .map_err(warp::reject::custom)
            }
        })
}

pub fn with_admin(
    keys: Arc<SessionKeys>,
    store: Arc<dyn RecipeStore>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_session(keys, store).and_then(|session: SessionData| async move {
        session
            .authorize(Resource::Users)
            .map_err(|_e| {
                warp::reject::custom(HtmlError::Unauthorized.new("Admin access required"))
            })?;

        Ok::<_, Rejection>(session)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(
            bearer_token(Some(String::from("Bearer abc.def"))),
            Some(String::from("abc.def"))
        );
        assert_eq!(bearer_token(Some(String::from("Basic xyz"))), None);
        assert_eq!(bearer_token(None), None);
    }
}
