use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::check_no_conflict;
use super::{EngineError, SharedTimeline};

/// A booking request that has passed input validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub event_name: String,
    pub resource_id: String,
    pub span: Span,
}

/// All accepted bookings, one lock-protected timeline per resource.
pub struct TimelineStore {
    timelines: DashMap<String, SharedTimeline>,
    next_seq: AtomicU64,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineStore {
    pub fn new() -> Self {
        Self {
            timelines: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn get(&self, resource_id: &str) -> Option<SharedTimeline> {
        self.timelines.get(resource_id).map(|e| e.value().clone())
    }

    fn get_or_create(&self, resource_id: &str) -> SharedTimeline {
        if let Some(tl) = self.get(resource_id) {
            return tl;
        }
        self.timelines
            .entry(resource_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Timeline::new(resource_id))))
            .value()
            .clone()
    }

    /// Admit the candidate unless it overlaps a booking on the same resource.
    ///
    /// The check and the insert run under the resource's write lock, so two
    /// overlapping requests racing on one resource cannot both be accepted.
    /// The timeline is untouched on rejection.
    pub async fn try_insert(&self, candidate: Candidate) -> Result<Booking, EngineError> {
        let tl = self.get_or_create(&candidate.resource_id);
        let mut guard = tl.write().await;
        if guard.len() >= MAX_BOOKINGS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many bookings on resource"));
        }

        check_no_conflict(&guard, &candidate.span)?;

        let booking = Booking {
            id: Ulid::new(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            event_name: candidate.event_name,
            resource_id: candidate.resource_id,
            span: candidate.span,
        };
        guard.insert_booking(booking.clone());
        Ok(booking)
    }

    /// Every accepted booking, in acceptance order.
    ///
    /// Timelines are read one at a time, so a listing taken while writes are
    /// in flight may hold a later `seq` without an earlier one. With no
    /// concurrent writers it is exact and repeatable.
    pub async fn list_all(&self) -> Vec<Booking> {
        // Clone the Arcs first so no DashMap shard is held across an await.
        let timelines: Vec<SharedTimeline> =
            self.timelines.iter().map(|e| e.value().clone()).collect();
        let mut all = Vec::new();
        for tl in timelines {
            let guard = tl.read().await;
            all.extend(guard.bookings.iter().cloned());
        }
        all.sort_by_key(|b| b.seq);
        all
    }

    /// One resource's bookings, sorted by start.
    pub async fn bookings_for(&self, resource_id: &str) -> Vec<Booking> {
        let Some(tl) = self.get(resource_id) else {
            return Vec::new();
        };
        let guard = tl.read().await;
        guard.bookings.clone()
    }

    #[cfg(test)]
    fn resource_count(&self) -> usize {
        self.timelines.len()
    }
}
