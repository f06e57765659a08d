use crate::model::*;

use super::Engine;

impl Engine {
    /// All bookings in acceptance order, or `Schedule::Empty`.
    /// Reads never modify the store, so repeated calls agree.
    pub async fn list_schedule(&self) -> Schedule {
        Schedule::from(self.timelines.list_all().await)
    }

    pub fn list_usage_stats(&self) -> UsageSnapshot {
        self.usage.snapshot()
    }

    pub fn usage_count(&self, resource_id: &str) -> u64 {
        self.usage.count(resource_id)
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.catalog().resources().to_vec()
    }

    /// One resource's bookings sorted by start time. Empty for unknown ids.
    pub async fn get_bookings(&self, resource_id: &str) -> Vec<Booking> {
        self.timelines.bookings_for(resource_id).await
    }
}
