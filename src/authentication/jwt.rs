use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    error::{Error, HtmlError},
    schema::{Id, User, UserRole},
};

use super::permissions::{authorize, ActionType, Resource};

/// Signing key and lifetime of session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_e| HtmlError::InternalServerError.new("Invalid session secret"))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(
                HtmlError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }

    pub fn authorize(&self, resource: Resource) -> Result<(), Error> {
        authorize(self, resource)
    }
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        SessionData {
            username: user.username.to_owned(),
            user_id: user.id,
            is_admin: user.role == UserRole::Admin,
            role: user.role,
        }
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, Error> {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role, keys.lifetime);

    claims
        .sign_with_key(&keys.key)
        .map_err(|_e| HtmlError::InternalServerError.new("Failed to sign session"))
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(&keys.key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}
