use parking_lot::RwLock;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

struct CachedStatus {
    payload: Value,
    fetched_at: Instant,
}

/// Latest upstream status payload, shared by the sensor poll and the API
pub struct StatusCache {
    ttl: Duration,
    slot: RwLock<Option<CachedStatus>>,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        StatusCache {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// The payload, as long as it is younger than the ttl
    pub fn get(&self) -> Option<Value> {
        let slot = self.slot.read();
        slot.as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.payload.clone())
    }

    /// The payload of any age, tagged with `"_stale": true`
    pub fn get_stale(&self) -> Option<Value> {
        let slot = self.slot.read();
        slot.as_ref().map(|cached| match cached.payload.clone() {
            Value::Object(mut map) => {
                map.insert("_stale".to_owned(), Value::Bool(true));
                Value::Object(map)
            }
            other => json!({ "payload": other, "_stale": true }),
        })
    }

    pub fn put(&self, payload: Value) {
        *self.slot.write() = Some(CachedStatus {
            payload,
            fetched_at: Instant::now(),
        });
    }

    pub fn age(&self) -> Option<Duration> {
        self.slot.read().as_ref().map(|cached| cached.fetched_at.elapsed())
    }
}
