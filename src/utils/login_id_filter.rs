use std::sync::RwLock;

use autoscale_cuckoo_filter::CuckooFilter;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
fn normalize(login_id: &str) -> String {
    login_id.to_lowercase()
}

/// Probabilistic set of every issued login ID.
///
/// `might_exist == false` is a definite answer; `true` still needs a real lookup.
pub struct LoginIdFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for LoginIdFilter {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }
}

impl LoginIdFilter {
    pub fn might_exist(&self, login_id: &str) -> bool {
        let login_id = normalize(login_id);
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&login_id)
    }

    pub fn insert(&self, login_id: &str) {
        let login_id = normalize(login_id);
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add(&login_id);
    }

    /// Inserts a batch under a single write lock.
    pub fn insert_batch(&self, login_ids: &[String]) -> usize {
        let mut filter = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for login_id in login_ids {
            filter.add(&normalize(login_id));
        }
        login_ids.len()
    }
}
