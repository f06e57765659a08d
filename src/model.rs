use ulid::Ulid;

/// Abstract time unit; hour-of-day in the default deployment.
pub type Tick = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Tick,
    pub end: Tick,
}

impl Span {
    pub fn new(start: Tick, end: Tick) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for untrusted input. `None` when `start >= end`.
    pub fn try_new(start: Tick, end: Tick) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Touching spans (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A bookable asset from the catalog. Capacity is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub kind: String,
    pub capacity: u32,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            capacity,
        }
    }
}

/// An accepted booking. Never mutated after acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: Ulid,
    /// Global acceptance order, used for listing.
    pub seq: u64,
    pub event_name: String,
    pub resource_id: String,
    pub span: Span,
}

/// Per-resource timeline. Bookings are kept sorted by `span.start`.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub resource_id: String,
    pub bookings: Vec<Booking>,
}

impl Timeline {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            bookings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .partition_point(|b| b.span.start <= booking.span.start);
        self.bookings.insert(pos, booking);
    }

    /// Return only bookings whose span overlaps the query window.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self
            .bookings
            .partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }
}

/// Published to subscribers of a resource after a booking commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BookingAccepted {
        id: Ulid,
        resource_id: String,
        event_name: String,
        span: Span,
    },
}

impl Event {
    pub fn resource_id(&self) -> &str {
        match self {
            Event::BookingAccepted { resource_id, .. } => resource_id,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// Result of a schedule listing. `Empty` lets renderers print a
/// "no events" line instead of an empty table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Empty,
    Bookings(Vec<Booking>),
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        matches!(self, Schedule::Empty)
    }

    pub fn bookings(&self) -> &[Booking] {
        match self {
            Schedule::Empty => &[],
            Schedule::Bookings(b) => b,
        }
    }

    pub fn into_bookings(self) -> Vec<Booking> {
        match self {
            Schedule::Empty => Vec::new(),
            Schedule::Bookings(b) => b,
        }
    }
}

impl From<Vec<Booking>> for Schedule {
    fn from(bookings: Vec<Booking>) -> Self {
        if bookings.is_empty() {
            Schedule::Empty
        } else {
            Schedule::Bookings(bookings)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageStat {
    pub resource_id: String,
    pub count: u64,
}

/// Point-in-time copy of the usage counters, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub stats: Vec<UsageStat>,
}

impl UsageSnapshot {
    /// Count for a resource; 0 if it has never been booked.
    pub fn get(&self, resource_id: &str) -> u64 {
        self.stats
            .iter()
            .find(|s| s.resource_id == resource_id)
            .map_or(0, |s| s.count)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UsageStat> {
        self.stats.iter()
    }
}
