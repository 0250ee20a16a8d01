use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use edm_gamify::UserProgress;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::keys;
use crate::ttl::TtlCache;

/// Lock stripes for [`ProgressStore::update`]. A user always maps to the
/// same stripe.
const WRITE_STRIPES: usize = 64;

/// Per-user progress documents.
///
/// The backing cache must be unbounded (see [`TtlCache::unbounded`]): a
/// document may only disappear when its TTL runs out. Every write
/// refreshes that TTL. [`ProgressStore::update`] serializes
/// read-modify-write cycles per user so concurrent requests from the same
/// user cannot drop each other's XP.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    cache: TtlCache,
    ttl: Duration,
    stripes: Arc<[Mutex<()>]>,
}

impl ProgressStore {
    pub fn new(cache: TtlCache, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            stripes: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe(&self, user_id: Uuid) -> &Mutex<()> {
        &self.stripes[(user_id.as_u128() % self.stripes.len() as u128) as usize]
    }

    /// Stored document, or a fresh one joined at `now`.
    pub async fn load(&self, user_id: Uuid, now: DateTime<Utc>) -> UserProgress {
        self.cache
            .get_as(&keys::progress(user_id))
            .await
            .unwrap_or_else(|| UserProgress::new(now))
    }

    pub async fn save(&self, user_id: Uuid, progress: &UserProgress) {
        if let Err(err) = self
            .cache
            .set_as(&keys::progress(user_id), progress, self.ttl)
            .await
        {
            tracing::error!(%user_id, error = %err, "progress document failed to serialize");
        }
    }

    /// Loads, applies `f`, saves, and returns what `f` returned.
    pub async fn update<R>(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut UserProgress) -> R,
    ) -> R {
        let _guard = self.stripe(user_id).lock().await;
        let mut progress = self.load(user_id, now).await;
        let out = f(&mut progress);
        self.save(user_id, &progress).await;
        out
    }

    /// Every stored document that still decodes.
    pub fn all(&self) -> Vec<(Uuid, UserProgress)> {
        self.cache
            .scan_prefix(keys::PROGRESS_PREFIX)
            .into_iter()
            .filter_map(|(k, v)| {
                let id = Uuid::parse_str(k.strip_prefix(keys::PROGRESS_PREFIX)?).ok()?;
                let p = serde_json::from_value(v).ok()?;
                Some((id, p))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProgressStore {
        ProgressStore::new(TtlCache::unbounded(), Duration::from_secs(86_400))
    }

    #[tokio::test]
    async fn load_missing_returns_fresh_document() {
        let s = store();
        let now = Utc::now();
        let p = s.load(Uuid::new_v4(), now).await;
        assert_eq!(p.xp, 0);
        assert_eq!(p.level(), 1);
        assert_eq!(p.joined_at, Some(now));
        assert!(s.all().is_empty(), "load must not persist");
    }

    #[tokio::test]
    async fn update_persists_and_all_lists() {
        let s = store();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();
        let xp = s
            .update(a, now, |p| {
                p.xp += 40;
                p.xp
            })
            .await;
        assert_eq!(xp, 40);
        s.update(b, now, |p| p.xp = 7).await;
        assert_eq!(s.load(a, now).await.xp, 40);

        let mut all = s.all();
        all.sort_by_key(|(_, p)| p.xp);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], (b, s.load(b, now).await));
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_xp() {
        let s = store();
        let id = Uuid::new_v4();
        let mut handles = Vec::new();
        for _ in 0..25 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                s.update(id, Utc::now(), |p| p.xp += 2).await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(s.load(id, Utc::now()).await.xp, 50);
    }

    #[tokio::test]
    async fn a_held_stripe_does_not_block_other_users() {
        let s = store();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let _held = s.stripe(a).lock().await;
        let done = tokio::time::timeout(
            Duration::from_secs(1),
            s.update(b, Utc::now(), |p| p.xp += 5),
        )
        .await;
        assert!(done.is_ok(), "user b waited on user a's lock");
        assert_eq!(s.load(b, Utc::now()).await.xp, 5);
    }

    #[tokio::test]
    async fn many_users_updating_at_once_keep_their_own_xp() {
        let s = store();
        let ids: Vec<Uuid> = (0..40).map(|_| Uuid::new_v4()).collect();
        let mut handles = Vec::new();
        for (n, id) in ids.iter().copied().enumerate() {
            for _ in 0..5 {
                let s = s.clone();
                handles.push(tokio::spawn(async move {
                    s.update(id, Utc::now(), |p| p.xp += n as u64).await
                }));
            }
        }
        for h in handles {
            h.await.unwrap();
        }
        for (n, id) in ids.iter().enumerate() {
            assert_eq!(s.load(*id, Utc::now()).await.xp, 5 * n as u64);
        }
    }
}
