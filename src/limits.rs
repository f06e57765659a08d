use crate::model::Tick;

pub const MAX_EVENT_NAME_LEN: usize = 256;
pub const MAX_RESOURCE_ID_LEN: usize = 64;
pub const MAX_RESOURCE_KIND_LEN: usize = 64;
pub const MAX_BOOKINGS_PER_RESOURCE: usize = 10_000;
pub const MAX_CATALOG_SIZE: usize = 1_000;

/// Display domain for booking times accepted by the SQL front end.
/// The engine itself only requires `start < end`.
pub const DAY_START: Tick = 0;
pub const DAY_END: Tick = 24;
