use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::auth::auth::AuthUser;

/// Identity resolved for a token subject, keyed by lowercased email.
/// Short TTL so role changes made elsewhere still show up quickly.
static USER_CACHE: Lazy<Cache<String, AuthUser>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(60))
        .build()
});

#[inline]
fn key(email: &str) -> String {
    email.to_lowercase()
}

pub async fn get(email: &str) -> Option<AuthUser> {
    USER_CACHE.get(&key(email)).await
}

pub async fn insert(user: AuthUser) {
    USER_CACHE.insert(key(&user.email), user).await;
}

/// Drop a cached identity after its role changed or the account was removed.
pub async fn invalidate(email: &str) {
    USER_CACHE.invalidate(&key(email)).await;
}
