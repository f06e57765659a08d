mod conflict;
mod error;
mod mutations;
mod queries;
mod timeline;
mod usage;

pub use error::EngineError;
pub use timeline::{Candidate, TimelineStore};
pub use usage::UsageRecorder;

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::catalog::Catalog;
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedTimeline = Arc<RwLock<Timeline>>;

/// The booking service: the single entry point for booking requests and
/// schedule/usage reads. Owns the timelines and usage counters; the catalog
/// is shared read-only reference data.
pub struct Engine {
    catalog: Arc<Catalog>,
    pub(super) timelines: TimelineStore,
    pub(super) usage: UsageRecorder,
    pub notify: Arc<NotifyHub>,
    /// Reject bookings against ids missing from the catalog.
    strict_resources: bool,
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>, notify: Arc<NotifyHub>) -> Self {
        Self {
            catalog,
            timelines: TimelineStore::new(),
            usage: UsageRecorder::new(),
            notify,
            strict_resources: true,
        }
    }

    /// Engine over the three seed resources with its own notify hub.
    pub fn with_seed_catalog() -> Self {
        Self::new(Arc::new(Catalog::seed()), Arc::new(NotifyHub::new()))
    }

    pub fn with_strict_resources(mut self, strict: bool) -> Self {
        self.strict_resources = strict;
        self
    }

    pub fn strict_resources(&self) -> bool {
        self.strict_resources
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Receive `Event::BookingAccepted` for every booking committed on `resource_id`.
    pub fn subscribe(&self, resource_id: &str) -> broadcast::Receiver<Event> {
        self.notify.subscribe(resource_id)
    }
}
