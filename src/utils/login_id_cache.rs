use std::time::Duration;

use moka::future::Cache;

const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Positive cache of login IDs known to be taken.
#[derive(Clone)]
pub struct LoginIdCache {
    inner: Cache<String, bool>,
}

impl Default for LoginIdCache {
    fn default() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }
}

impl LoginIdCache {
    pub async fn mark_taken(&self, login_id: &str) {
        self.inner.insert(login_id.to_lowercase(), true).await;
    }

    pub async fn is_taken(&self, login_id: &str) -> bool {
        self.inner
            .get(&login_id.to_lowercase())
            .await
            .unwrap_or(false)
    }

    pub async fn mark_batch(&self, login_ids: &[String]) {
        let inserts: Vec<_> = login_ids
            .iter()
            .map(|id| self.inner.insert(id.to_lowercase(), true))
            .collect();

        futures::future::join_all(inserts).await;
    }
}
