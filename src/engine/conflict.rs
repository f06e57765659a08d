use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn validate_span(start: Tick, end: Tick) -> Result<Span, EngineError> {
    Span::try_new(start, end).ok_or(EngineError::InvalidRange { start, end })
}

/// Returns the trimmed name. Whitespace-only names count as empty.
pub(crate) fn validate_event_name(name: &str) -> Result<&str, EngineError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyEventName);
    }
    if trimmed.len() > MAX_EVENT_NAME_LEN {
        return Err(EngineError::LimitExceeded("event name too long"));
    }
    Ok(trimmed)
}

/// First booking on the timeline that overlaps `span`, as a `Conflict`.
pub(crate) fn check_no_conflict(tl: &Timeline, span: &Span) -> Result<(), EngineError> {
    match tl.overlapping(span).next() {
        Some(existing) => Err(EngineError::Conflict {
            resource_id: tl.resource_id.clone(),
            with: existing.id,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use ulid::Ulid;

    use super::*;

    fn timeline_with(spans: &[(Tick, Tick)]) -> Timeline {
        let mut tl = Timeline::new("R101");
        for (seq, &(start, end)) in spans.iter().enumerate() {
            tl.insert_booking(Booking {
                id: Ulid::new(),
                seq: seq as u64,
                event_name: "Lecture".into(),
                resource_id: "R101".into(),
                span: Span::new(start, end),
            });
        }
        tl
    }

    #[test]
    fn back_to_back_is_not_a_conflict() {
        let tl = timeline_with(&[(9, 10), (11, 12)]);
        assert!(check_no_conflict(&tl, &Span::new(10, 11)).is_ok());
    }

    #[test]
    fn partial_overlap_reports_existing_booking() {
        let tl = timeline_with(&[(9, 11)]);
        let existing = tl.bookings[0].id;
        match check_no_conflict(&tl, &Span::new(10, 12)) {
            Err(EngineError::Conflict { resource_id, with }) => {
                assert_eq!(resource_id, "R101");
                assert_eq!(with, existing);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn containment_both_ways_conflicts() {
        let tl = timeline_with(&[(8, 16)]);
        assert!(check_no_conflict(&tl, &Span::new(10, 11)).is_err());

        let tl = timeline_with(&[(10, 11)]);
        assert!(check_no_conflict(&tl, &Span::new(8, 16)).is_err());
    }

    #[test]
    fn identical_span_conflicts() {
        let tl = timeline_with(&[(9, 10)]);
        assert!(check_no_conflict(&tl, &Span::new(9, 10)).is_err());
    }

    #[test]
    fn validate_span_rejects_zero_and_negative_width() {
        assert_eq!(
            validate_span(10, 10),
            Err(EngineError::InvalidRange { start: 10, end: 10 })
        );
        assert_eq!(
            validate_span(12, 9),
            Err(EngineError::InvalidRange { start: 12, end: 9 })
        );
        assert_eq!(validate_span(9, 12), Ok(Span::new(9, 12)));
    }

    #[test]
    fn validate_event_name_trims_and_limits() {
        assert_eq!(validate_event_name("  Orientation "), Ok("Orientation"));
        assert_eq!(validate_event_name("   "), Err(EngineError::EmptyEventName));
        assert_eq!(validate_event_name(""), Err(EngineError::EmptyEventName));
        let long = "x".repeat(MAX_EVENT_NAME_LEN + 1);
        assert!(matches!(
            validate_event_name(&long),
            Err(EngineError::LimitExceeded(_))
        ));
    }
}
