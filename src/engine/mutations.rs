use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;
use crate::observability::BOOKINGS_TOTAL;

use super::conflict::{validate_event_name, validate_span};
use super::{Candidate, Engine, EngineError};

impl Engine {
    /// Validate and admit a booking.
    ///
    /// On success the booking is on the resource's timeline, the resource's
    /// usage count has been incremented exactly once, and subscribers have
    /// been notified. On any error nothing has changed.
    pub async fn request_booking(
        &self,
        event_name: &str,
        resource_id: &str,
        start: Tick,
        end: Tick,
    ) -> Result<Booking, EngineError> {
        let result = self.admit(event_name, resource_id, start, end).await;
        let outcome = match &result {
            Ok(_) => "accepted",
            Err(e) => e.outcome_label(),
        };
        metrics::counter!(BOOKINGS_TOTAL, "outcome" => outcome).increment(1);
        if let Err(e) = &result {
            debug!("booking rejected on {resource_id} [{start}, {end}): {e}");
        }
        result
    }

    async fn admit(
        &self,
        event_name: &str,
        resource_id: &str,
        start: Tick,
        end: Tick,
    ) -> Result<Booking, EngineError> {
        let event_name = validate_event_name(event_name)?;
        let span = validate_span(start, end)?;
        self.check_resource(resource_id)?;

        let booking = self
            .timelines
            .try_insert(Candidate {
                event_name: event_name.to_string(),
                resource_id: resource_id.to_string(),
                span,
            })
            .await?;

        // Only reached after the insert committed.
        let uses = self.usage.increment(&booking.resource_id, booking.seq);
        self.notify.send(
            &booking.resource_id,
            &Event::BookingAccepted {
                id: booking.id,
                resource_id: booking.resource_id.clone(),
                event_name: booking.event_name.clone(),
                span: booking.span,
            },
        );
        info!(
            "booked {:?} on {} [{}, {}) (use #{uses})",
            booking.event_name, booking.resource_id, booking.span.start, booking.span.end
        );
        Ok(booking)
    }

    fn check_resource(&self, resource_id: &str) -> Result<(), EngineError> {
        if self.strict_resources {
            if !self.catalog().contains(resource_id) {
                return Err(EngineError::UnknownResource(resource_id.to_string()));
            }
        } else if resource_id.is_empty() {
            return Err(EngineError::UnknownResource(String::new()));
        } else if resource_id.len() > MAX_RESOURCE_ID_LEN {
            return Err(EngineError::LimitExceeded("resource id too long"));
        }
        Ok(())
    }
}
