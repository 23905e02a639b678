use std::{fmt, future::Future};

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CacheError, Error};

const RECIPE_CACHE_BIND: &str = "recipe-cache-key";

// Caching - keys

#[derive(Clone, Debug)]
pub struct CacheKey<T: ToString> {
    value: T,
    r#type: CacheKeyType,
}

impl<T: ToString> fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.r#type {
            CacheKeyType::Recipe => write!(f, "recipe-{}", self.value.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Recipe,
}

impl CacheKeyType {
    pub fn new<T: ToString>(self, key: T) -> CacheKey<T> {
        CacheKey {
            value: key,
            r#type: self,
        }
    }
}

impl<T: ToString> From<&CacheKey<T>> for CacheLifetime {
    fn from(key: &CacheKey<T>) -> Self {
        match &key.r#type {
            CacheKeyType::Recipe => CacheLifetime::BindRecipeCache,
        }
    }
}

// Cache - wrappers

/// What a cached value stays valid against. Bound values are dropped once
/// the bind token they were stored with has been rotated.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheLifetime {
    BindRecipeCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::BindRecipeCache => {
                get_cache_value::<&str, String>(RECIPE_CACHE_BIND, cache).await
            }
        }
    }
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct RedisValue<T: Serialize + Send + Sync + Clone> {
    pub value: T,
    lifetime: CacheLifetime,
    bind: Option<String>,
}

impl<T: Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    /// `bind` has to be read before `value` is loaded. A rotation in
    /// between then leaves the value stale instead of cached as current.
    fn stamped(value: T, lifetime: CacheLifetime, bind: Option<String>) -> Self {
        Self {
            value,
            lifetime,
            bind,
        }
    }

    fn is_current(&self, bind: &Option<String>) -> bool {
        &self.bind == bind
    }

    /// Cached value for `key`, falling back to `callback` on a miss or a
    /// stale bind. Found values are written back to the cache.
    pub async fn get_or_optional<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, Error>
    where
        K: ToString + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, Error>> + Send,
    {
        let lifetime = CacheLifetime::from(&key);
        let bind = lifetime.get_cache_bind(cache).await?;

        let value = get_cache_value::<String, RedisValue<T>>(key.to_string(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        match value {
            Some(value) if value.is_current(&bind) => {
                log::trace!("> Found {}", key);
                return Ok(Some(value));
            }
            Some(_) => log::trace!("> Invalidated {}", key),
            None => {}
        }

        log::trace!("> Fetching {}", key);
        match callback().await? {
            Some(value) => {
                let value = RedisValue::stamped(value, lifetime, bind);

                if let Err(e) =
                    set_cache_value::<String, RedisValue<T>>(key.to_string(), value.clone(), cache)
                        .await
                {
                    log::error!("{e:?}");
                }

                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

/// Invalidates every value bound to the recipe cache.
pub async fn rotate_recipe_cache(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    let bind = Uuid::new_v4().to_string();
    set_cache_value(RECIPE_CACHE_BIND, bind, cache).await?;
    log::debug!("> Rotated recipe cache bind");

    Ok(())
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
