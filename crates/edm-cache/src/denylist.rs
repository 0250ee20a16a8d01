use std::time::Duration;

use serde_json::Value;

use crate::keys;
use crate::ttl::TtlCache;

/// Token ids revoked by logout. An entry only needs to outlive the token
/// it names, so callers pass the token's remaining lifetime as TTL.
#[derive(Debug, Clone)]
pub struct TokenDenylist {
    cache: TtlCache,
}

impl TokenDenylist {
    pub fn new(cache: TtlCache) -> Self {
        Self { cache }
    }

    pub async fn revoke(&self, jti: &str, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.cache
            .set(&keys::revoked_token(jti), Value::Bool(true), ttl)
            .await;
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.cache.exists(&keys::revoked_token(jti)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoke_then_check() {
        let d = TokenDenylist::new(TtlCache::new(10));
        assert!(!d.is_revoked("abc").await);
        d.revoke("abc", Duration::from_secs(60)).await;
        assert!(d.is_revoked("abc").await);
        assert!(!d.is_revoked("abd").await);
    }

    #[tokio::test]
    async fn already_expired_token_is_not_stored() {
        let d = TokenDenylist::new(TtlCache::new(10));
        d.revoke("gone", Duration::ZERO).await;
        assert!(!d.is_revoked("gone").await);
    }
}
