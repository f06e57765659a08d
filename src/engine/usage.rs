use dashmap::DashMap;

use crate::model::{UsageSnapshot, UsageStat};

struct Counter {
    first_seen: u64,
    count: u64,
}

/// Accepted-booking count per resource. Each key is updated under its
/// DashMap shard lock, so concurrent increments never lose an update.
pub struct UsageRecorder {
    counts: DashMap<String, Counter>,
}

impl Default for UsageRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageRecorder {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
        }
    }

    /// Bump the count for `resource_id`, starting from 0. Returns the new count.
    ///
    /// `seq` is the acceptance sequence of the booking being counted. A
    /// resource ranks by the lowest `seq` it has seen, so the usage order
    /// matches the schedule even when increments land out of order.
    pub fn increment(&self, resource_id: &str, seq: u64) -> u64 {
        if let Some(mut counter) = self.counts.get_mut(resource_id) {
            counter.first_seen = counter.first_seen.min(seq);
            counter.count += 1;
            return counter.count;
        }
        let mut counter = self
            .counts
            .entry(resource_id.to_string())
            .or_insert(Counter {
                first_seen: seq,
                count: 0,
            });
        counter.first_seen = counter.first_seen.min(seq);
        counter.count += 1;
        counter.count
    }

    pub fn count(&self, resource_id: &str) -> u64 {
        self.counts.get(resource_id).map_or(0, |c| c.count)
    }

    /// Copy of all counters, ordered by when each resource was first booked.
    pub fn snapshot(&self) -> UsageSnapshot {
        let mut ranked: Vec<(u64, UsageStat)> = self
            .counts
            .iter()
            .map(|e| {
                (
                    e.value().first_seen,
                    UsageStat {
                        resource_id: e.key().clone(),
                        count: e.value().count,
                    },
                )
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        UsageSnapshot {
            stats: ranked.into_iter().map(|(_, stat)| stat).collect(),
        }
    }
}
