//! TTL cache for scoring-service results.
//!
//! The cache is an ordinary value handed to the client with
//! [`MlPredictionClient::with_cache`](crate::ml_client::MlPredictionClient::with_cache);
//! tests build a fresh one each time. Only genuine service results are
//! stored, never fallbacks.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::{PredictionRequest, PredictionResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    home_team: String,
    away_team: String,
    /// Bit patterns, so that the key is `Eq + Hash`.
    features: Vec<u64>,
}

impl From<&PredictionRequest> for CacheKey {
    fn from(request: &PredictionRequest) -> Self {
        Self {
            home_team: request.home_team.clone(),
            away_team: request.away_team.clone(),
            features: request.features.iter().map(|f| f.to_bits()).collect(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    result: PredictionResult,
}

/// Bounded map from request to result with a fixed time-to-live.
#[derive(Debug)]
pub struct PredictionCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl PredictionCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh result for `request`, dropping it if it has expired.
    pub fn get(&self, request: &PredictionRequest) -> Option<PredictionResult> {
        let key = CacheKey::from(request);
        let mut entries = self.lock();
        let entry = entries.get(&key)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.result.clone());
        }
        entries.remove(&key);
        None
    }

    pub fn insert(&self, request: &PredictionRequest, result: PredictionResult) {
        let key = CacheKey::from(request);
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                result,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
